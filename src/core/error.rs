// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Errors raised inside the arbitration core

use thiserror::Error;

/// Recoverable failures of a single request; none of them stop the tick loop
#[derive(Debug, Error)]
pub enum BehaviorError {
    #[error("unknown state '{0}'")]
    UnknownState(String),

    #[error("unknown command kind '{0}'")]
    UnknownCommand(String),

    #[error("command {0} is missing a target_state")]
    MissingTarget(&'static str),

    #[error("command execution panicked: {0}")]
    CommandPanicked(String),

    #[error("invalid schedule: {0}")]
    Schedule(String),
}
