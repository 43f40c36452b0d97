// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Ekko - behavior arbitration core for a small companion robot
//!
//! Owns the robot's single authoritative state and changes it safely while
//! several producers compete for it:
//! - time-of-day schedules (sleep at night, hourly clock)
//! - proximity and distance sensors
//! - a wireless control link with a tiny text protocol
//! - gesture recognition over local IPC
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Behavior Engine                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐  ┌──────────┐  ┌──────────┐  ┌──────────────┐   │
//! │  │ Sensor  │  │ Console/ │  │ Gesture  │  │  Scheduler   │   │
//! │  │ Poller  │  │ Comms    │  │ IPC      │  │  Follower    │   │
//! │  └─────────┘  └──────────┘  └──────────┘  └──────────────┘   │
//! │       ↓  snapshot slots ↓        ↓               ↓           │
//! │  ┌───────────────┐  ┌────────────────────┐       ↓           │
//! │  │ Event Manager │→ │ Interrupt Manager  │       ↓           │
//! │  └───────────────┘  └────────────────────┘       ↓           │
//! │          ↓                   ↓                   ↓           │
//! │  ┌─────────────────────────────────────────────────────┐     │
//! │  │              Command Queue (FIFO)                    │     │
//! │  └─────────────────────────────────────────────────────┘     │
//! │                          ↓  drained once per tick            │
//! │  ┌─────────────────────────────────────────────────────┐     │
//! │  │   State Handler (state, params, context history)     │     │
//! │  └─────────────────────────────────────────────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod comms;
pub mod config;
pub mod core;
pub mod sensors;
pub mod services;

// Re-exports for convenience
pub use config::Config;
pub use core::{
    BehaviorEngine, BehaviorError, Collaborators, CommandCenter, EngineOptions, InterruptManager, Scheduler,
    State, StateHandle,
};
pub use services::ServiceError;

/// Ekko version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Ekko name
pub const NAME: &str = "Ekko";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
        features: enabled_features(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version string
    pub version: String,
    /// Target architecture
    pub target: String,
    /// Operating system
    pub os: String,
    /// Enabled features
    pub features: Vec<String>,
}

fn enabled_features() -> Vec<String> {
    let mut features = vec![];

    #[cfg(feature = "gesture-ipc")]
    features.push("gesture-ipc".to_string());

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_reports_package() {
        let info = build_info();
        assert_eq!(info.version, VERSION);
        assert_eq!(info.os, std::env::consts::OS);
        assert_eq!(info.features.contains(&"gesture-ipc".to_string()), cfg!(feature = "gesture-ipc"));
    }
}
