// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Producer services - the blocking edges that feed the tick loop

mod console;
#[cfg(all(unix, feature = "gesture-ipc"))]
mod gesture_ipc;

pub use console::ConsoleComms;
#[cfg(all(unix, feature = "gesture-ipc"))]
pub use gesture_ipc::{write_frame, GestureListener, MAX_FRAME_LEN};

use thiserror::Error;

/// Failures of producer services; never fatal to the engine
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}
