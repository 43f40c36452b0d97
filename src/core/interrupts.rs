// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Priority interrupt arbitration
//!
//! Higher integer = higher priority. Typical priorities:
//! - 10: idle behaviors
//! - 30: distance sensor
//! - 50: proximity sensor
//! - 80: canvas text from the control link
//! - 90: critical battery / error
//!
//! An *episode* starts when the first interrupt is set and ends when the last
//! one clears. The pre-episode context is saved on entry and restored once on
//! exit. Restores travel through the command queue so they land after any
//! transition already queued by the same episode.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Command, CommandCenter, Params, State, StateAccess};

/// A named request to hold a state until cleared
#[derive(Debug, Clone, PartialEq)]
pub struct Interrupt {
    pub name: String,
    pub priority: i32,
    pub target_state: State,
    pub params: Params,
    /// Monotonic deadline in ms; `None` means held until cleared
    pub expires_at: Option<u64>,
}

impl Interrupt {
    fn rank(&self) -> (i32, Reverse<&str>) {
        (self.priority, Reverse(self.name.as_str()))
    }
}

/// How many context levels an episode may stack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptPolicy {
    /// One save on entry, one restore on exit; winners swap in place
    #[default]
    SingleLevel,
    /// Every preemption of a still-active winner saves another context,
    /// unwound one level at a time as winners clear
    Nested,
}

#[derive(Debug, Default)]
struct Arbiter {
    active: HashMap<String, Interrupt>,
    /// Winner names, one per saved context, base first
    levels: Vec<String>,
    /// Last change this manager queued in the current episode
    issued: Option<(State, Params)>,
}

impl Arbiter {
    fn winner(&self) -> Option<&Interrupt> {
        self.active.values().max_by(|a, b| a.rank().cmp(&b.rank()))
    }
}

/// Arbitrates named interrupts into one target state
pub struct InterruptManager {
    state: Arc<dyn StateAccess>,
    commands: CommandCenter,
    policy: InterruptPolicy,
    arbiter: Mutex<Arbiter>,
}

impl InterruptManager {
    pub fn new(state: Arc<dyn StateAccess>, commands: CommandCenter) -> Self {
        Self::with_policy(state, commands, InterruptPolicy::default())
    }

    pub fn with_policy(state: Arc<dyn StateAccess>, commands: CommandCenter, policy: InterruptPolicy) -> Self {
        Self {
            state,
            commands,
            policy,
            arbiter: Mutex::new(Arbiter::default()),
        }
    }

    pub fn policy(&self) -> InterruptPolicy {
        self.policy
    }

    pub fn is_interrupted(&self) -> bool {
        !self.arbiter.lock().levels.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.arbiter.lock().active.len()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.arbiter.lock().active.contains_key(name)
    }

    /// Current winner, if any
    pub fn winner(&self) -> Option<Interrupt> {
        self.arbiter.lock().winner().cloned()
    }

    /// Activate or update an interrupt that holds until cleared
    pub fn set_interrupt(&self, name: &str, priority: i32, target_state: State, params: Params) {
        self.upsert(Interrupt {
            name: name.to_string(),
            priority,
            target_state,
            params,
            expires_at: None,
        });
    }

    /// Activate or update an interrupt that clears itself at `expires_at` ms
    pub fn set_interrupt_until(
        &self,
        name: &str,
        priority: i32,
        target_state: State,
        params: Params,
        expires_at: u64,
    ) {
        self.upsert(Interrupt {
            name: name.to_string(),
            priority,
            target_state,
            params,
            expires_at: Some(expires_at),
        });
    }

    pub fn upsert(&self, interrupt: Interrupt) {
        let mut arbiter = self.arbiter.lock();
        match arbiter.active.get(&interrupt.name) {
            Some(existing) if *existing == interrupt => return,
            Some(_) => info!("Updating interrupt '{}': {:?}", interrupt.name, interrupt),
            None => info!("New interrupt set '{}': {:?}", interrupt.name, interrupt),
        }
        arbiter.active.insert(interrupt.name.clone(), interrupt);
        self.evaluate(&mut arbiter);
    }

    /// Remove an interrupt; unknown names are ignored
    pub fn clear_interrupt(&self, name: &str) {
        let mut arbiter = self.arbiter.lock();
        if arbiter.active.remove(name).is_some() {
            info!("Clearing interrupt '{}'", name);
            self.evaluate(&mut arbiter);
        }
    }

    /// Clear every interrupt whose deadline is at or before `now_ms`
    pub fn expire(&self, now_ms: u64) -> usize {
        let mut arbiter = self.arbiter.lock();
        let before = arbiter.active.len();
        arbiter.active.retain(|name, item| match item.expires_at {
            Some(deadline) if deadline <= now_ms => {
                info!("Interrupt '{}' timed out.", name);
                false
            }
            _ => true,
        });
        let expired = before - arbiter.active.len();
        if expired > 0 {
            self.evaluate(&mut arbiter);
        }
        expired
    }

    fn evaluate(&self, arbiter: &mut Arbiter) {
        let winner = match arbiter.winner() {
            Some(winner) => winner.clone(),
            None => {
                if !arbiter.levels.is_empty() {
                    info!("No active interrupts. Restoring original context.");
                    for _ in arbiter.levels.drain(..) {
                        self.commands.issue(Command::restore_state());
                    }
                }
                arbiter.issued = None;
                return;
            }
        };

        if arbiter.levels.is_empty() {
            self.state.save_context();
            arbiter.levels.push(winner.name.clone());
            info!("Interrupt cycle started. Context saved.");
        } else {
            while let Some(top) = arbiter.levels.last().cloned() {
                if top == winner.name {
                    break;
                }
                let top_active = arbiter.active.contains_key(&top);
                if self.policy == InterruptPolicy::Nested && top_active {
                    self.state.save_context();
                    arbiter.levels.push(winner.name.clone());
                    debug!("'{}' preempted '{}', context depth {}", winner.name, top, arbiter.levels.len());
                    break;
                }
                if self.policy == InterruptPolicy::Nested && arbiter.levels.len() > 1 {
                    arbiter.levels.pop();
                    self.commands.issue(Command::restore_state());
                    // the restored context predates the winner's change
                    arbiter.issued = None;
                    debug!("Unwound '{}', context depth {}", top, arbiter.levels.len());
                    continue;
                }
                if let Some(slot) = arbiter.levels.last_mut() {
                    *slot = winner.name.clone();
                }
                break;
            }
        }

        // compare against what is queued, not what the handler has applied so far
        let pending = arbiter
            .issued
            .as_ref()
            .map_or(false, |(state, params)| *state == winner.target_state && *params == winner.params);
        if !pending {
            info!(
                "Applying interrupt: {} -> {} (P:{})",
                winner.name, winner.target_state, winner.priority
            );
            self.commands.change_state(&winner.target_state, winner.params.clone());
            arbiter.issued = Some((winner.target_state, winner.params));
        }
    }
}
