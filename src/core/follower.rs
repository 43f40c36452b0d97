// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Schedule follower - turns scheduler answers into commands

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{debug, info};

use super::{CommandCenter, InterruptManager, Params, Scheduler, State, StateAccess};

/// Params key tagging a transition with its origin
pub const SOURCE_KEY: &str = "_source";
pub const SCHEDULER_SOURCE: &str = "scheduler";

/// Default boot grace before schedules apply
pub const DEFAULT_BOOT_GRACE_MS: u64 = 2000;

/// What one follower tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowerAction {
    /// Booting, interrupted, chatting or nothing scheduled
    Idle,
    /// Already in the scheduled state
    Hold,
    /// Issued a scheduled transition
    Apply(State),
    /// Scheduled window closed; issued a reversion
    Revert(State),
}

pub struct ScheduleFollower {
    scheduler: Scheduler,
    commands: CommandCenter,
    interrupts: Arc<InterruptManager>,
    state: Arc<dyn StateAccess>,
    started_at: u64,
    grace_ms: u64,
}

impl ScheduleFollower {
    pub fn new(
        scheduler: Scheduler,
        commands: CommandCenter,
        interrupts: Arc<InterruptManager>,
        state: Arc<dyn StateAccess>,
        started_at: u64,
    ) -> Self {
        Self {
            scheduler,
            commands,
            interrupts,
            state,
            started_at,
            grace_ms: DEFAULT_BOOT_GRACE_MS,
        }
    }

    pub fn with_grace(mut self, grace_ms: u64) -> Self {
        self.grace_ms = grace_ms;
        self
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn tick(&self, now_ms: u64, wall: NaiveDateTime) -> FollowerAction {
        if now_ms.saturating_sub(self.started_at) < self.grace_ms {
            return FollowerAction::Idle;
        }
        if self.interrupts.is_interrupted() {
            return FollowerAction::Idle;
        }

        let current = self.state.current_state();
        if current == State::CHAT {
            return FollowerAction::Idle;
        }

        match self.scheduler.get_target_state(wall, &current) {
            Some((target, _)) if target == current => FollowerAction::Hold,
            Some((target, mut params)) => {
                info!("Schedule triggered: {} -> {}", current, target);
                params.insert(SOURCE_KEY.to_string(), Value::String(SCHEDULER_SOURCE.to_string()));
                self.commands.change_state(&target, params);
                FollowerAction::Apply(target)
            }
            None if self.entered_by_schedule() => {
                let target = if current == State::SLEEPING { State::WAKING } else { State::ACTIVE };
                info!("Schedule ended for {}, reverting to {}", current, target);
                self.commands.change_state(&target, Params::new());
                FollowerAction::Revert(target)
            }
            None => {
                debug!("No scheduled state for {}", current);
                FollowerAction::Idle
            }
        }
    }

    fn entered_by_schedule(&self) -> bool {
        self.state
            .current_params()
            .and_then(|params| params.get(SOURCE_KEY).cloned())
            .map_or(false, |source| source == SCHEDULER_SOURCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        CommandQueue, ManualClock, RuleWindow, ScheduleRule, StateHandle, StateHandler, StateRegistry,
    };
    use chrono::{NaiveDate, NaiveTime};

    struct Rig {
        follower: ScheduleFollower,
        queue: CommandQueue,
        state: StateHandle,
        interrupts: Arc<InterruptManager>,
    }

    fn rig(rules: Vec<ScheduleRule>) -> Rig {
        let clock = ManualClock::new(0);
        let state = StateHandle::new(StateHandler::new(
            Arc::new(StateRegistry::new()),
            State::ACTIVE,
            Arc::new(clock),
        ));
        let (commands, queue) = CommandCenter::channel();
        let interrupts = Arc::new(InterruptManager::new(Arc::new(state.clone()), commands.clone()));
        let follower = ScheduleFollower::new(
            Scheduler::new(rules),
            commands,
            interrupts.clone(),
            Arc::new(state.clone()),
            0,
        );
        Rig { follower, queue, state, interrupts }
    }

    fn night() -> ScheduleRule {
        ScheduleRule::new(
            RuleWindow::Daily {
                start: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            },
            State::SLEEPING,
        )
        .interrupting([State::ACTIVE, State::SQUINTING])
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 2).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_boot_grace() {
        let rig = rig(vec![night()]);
        assert_eq!(rig.follower.tick(1_999, at(22, 0)), FollowerAction::Idle);
        assert_eq!(rig.queue.pending(), 0);
        assert_eq!(rig.follower.tick(2_000, at(22, 0)), FollowerAction::Apply(State::SLEEPING));
    }

    #[test]
    fn test_scheduled_sleep_then_wake() {
        let rig = rig(vec![night()]);

        assert_eq!(rig.follower.tick(5_000, at(22, 0)), FollowerAction::Apply(State::SLEEPING));
        rig.queue.drain(&rig.state);
        assert_eq!(rig.state.current_state(), State::SLEEPING);
        assert_eq!(
            rig.state.current_params().unwrap()[SOURCE_KEY],
            Value::String(SCHEDULER_SOURCE.into())
        );

        assert_eq!(rig.follower.tick(6_000, at(23, 0)), FollowerAction::Hold);
        assert_eq!(rig.follower.tick(7_000, at(7, 30)), FollowerAction::Revert(State::WAKING));
        rig.queue.drain(&rig.state);
        assert_eq!(rig.state.current_state(), State::WAKING);

        // reversion carries no source tag, so nothing repeats
        assert_eq!(rig.follower.tick(8_000, at(7, 31)), FollowerAction::Idle);
    }

    #[test]
    fn test_manual_state_is_not_reverted() {
        let rig = rig(vec![night()]);
        rig.state.lock().set_state(State::HAPPY, None).unwrap();
        assert_eq!(rig.follower.tick(5_000, at(12, 0)), FollowerAction::Idle);
        assert_eq!(rig.queue.pending(), 0);
    }

    #[test]
    fn test_skips_chat_and_interrupts() {
        let rig = rig(vec![night()]);

        rig.state.lock().set_state(State::CHAT, None).unwrap();
        assert_eq!(rig.follower.tick(5_000, at(22, 0)), FollowerAction::Idle);

        rig.state.lock().set_state(State::ACTIVE, None).unwrap();
        rig.interrupts.set_interrupt("sensor", 50, State::UWU, Params::new());
        assert_eq!(rig.follower.tick(5_000, at(22, 0)), FollowerAction::Idle);

        rig.interrupts.clear_interrupt("sensor");
        rig.queue.drain(&rig.state);
        assert_eq!(rig.follower.tick(5_000, at(22, 0)), FollowerAction::Apply(State::SLEEPING));
    }
}
