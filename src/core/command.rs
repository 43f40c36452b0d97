// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Command queue - the single path by which state is mutated
//!
//! Any number of producers hold a cloned [`CommandCenter`]; exactly one
//! [`CommandQueue`] drains them in enqueue order on the tick thread.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;

use crossbeam::channel::{self, Receiver, Sender};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{BehaviorError, Params, State, StateHandle, StateHandler};

/// Key holding the requested state inside command params
pub const TARGET_STATE: &str = "target_state";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    ChangeState,
    RestoreState,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::ChangeState => "CHANGE_STATE",
            CommandKind::RestoreState => "RESTORE_STATE",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = BehaviorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CHANGE_STATE" => Ok(CommandKind::ChangeState),
            "RESTORE_STATE" => Ok(CommandKind::RestoreState),
            other => Err(BehaviorError::UnknownCommand(other.to_string())),
        }
    }
}

/// Queued state request, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    kind: CommandKind,
    params: Params,
}

impl Command {
    pub fn new(kind: CommandKind, params: Params) -> Self {
        Self { kind, params }
    }

    /// `CHANGE_STATE` to `target` with extra `params`
    pub fn change_state(target: &State, mut params: Params) -> Self {
        params.insert(TARGET_STATE.to_string(), Value::String(target.to_string()));
        Self::new(CommandKind::ChangeState, params)
    }

    pub fn restore_state() -> Self {
        Self::new(CommandKind::RestoreState, Params::new())
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn target_state(&self) -> Option<State> {
        self.params.get(TARGET_STATE).and_then(Value::as_str).map(State::new)
    }

    /// Apply this command to the handler
    pub fn execute(&self, handler: &mut StateHandler) -> Result<(), BehaviorError> {
        match self.kind {
            CommandKind::ChangeState => {
                let target = self
                    .target_state()
                    .ok_or(BehaviorError::MissingTarget(CommandKind::ChangeState.as_str()))?;
                handler.set_state(target, Some(self.params.clone()))?;
            }
            CommandKind::RestoreState => {
                if handler.restore_state_ctx().is_none() {
                    debug!("Restore requested with empty history");
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, Value::Object(self.params.clone()))
    }
}

/// Producer side of the command queue; cheap to clone, safe from any thread
#[derive(Debug, Clone)]
pub struct CommandCenter {
    tx: Sender<Command>,
}

impl CommandCenter {
    /// Create a connected producer/consumer pair
    pub fn channel() -> (CommandCenter, CommandQueue) {
        let (tx, rx) = channel::unbounded();
        (CommandCenter { tx }, CommandQueue { rx })
    }

    pub fn issue_command(&self, kind: CommandKind, params: Params) {
        self.issue(Command::new(kind, params));
    }

    /// Issue a command whose kind arrived as text
    pub fn issue_named(&self, kind: &str, params: Params) -> Result<(), BehaviorError> {
        match kind.parse::<CommandKind>() {
            Ok(kind) => {
                self.issue_command(kind, params);
                Ok(())
            }
            Err(e) => {
                warn!("Unknown command: {}", kind);
                Err(e)
            }
        }
    }

    pub fn change_state(&self, target: &State, params: Params) {
        self.issue(Command::change_state(target, params));
    }

    pub fn issue(&self, command: Command) {
        info!("Issuing command: {}", command);
        // the queue only disconnects once the engine is gone
        if self.tx.send(command).is_err() {
            debug!("Command dropped, queue consumer has shut down");
        }
    }
}

/// Consumer side of the command queue, owned by the tick loop
#[derive(Debug)]
pub struct CommandQueue {
    rx: Receiver<Command>,
}

impl CommandQueue {
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    pub fn try_next(&self) -> Option<Command> {
        self.rx.try_recv().ok()
    }

    /// Execute every queued command in FIFO order. Returns how many applied.
    ///
    /// A failing or panicking command is logged and dropped; the rest of the
    /// queue still runs.
    pub fn drain(&self, state: &StateHandle) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.rx.try_recv() {
            debug!("Processing command: {}", command);
            let outcome = {
                let mut handler = state.lock();
                catch_unwind(AssertUnwindSafe(|| command.execute(&mut handler)))
            };
            match outcome {
                Ok(Ok(())) => applied += 1,
                Ok(Err(e)) => warn!("Dropped command {}: {}", command.kind(), e),
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!("{}", BehaviorError::CommandPanicked(reason));
                }
            }
        }
        applied
    }
}
