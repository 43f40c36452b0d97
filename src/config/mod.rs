// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Configuration module

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::{InterruptPolicy, State, StateRegistry};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Application version
    pub version: String,

    /// Log level
    pub log_level: String,

    /// Engine configuration
    pub engine: EngineConfig,

    /// Sensor configuration
    pub sensors: SensorConfig,

    /// Interrupt priorities and timings
    pub interrupts: InterruptConfig,

    /// Schedule configuration
    pub schedule: ScheduleConfig,

    /// Gesture IPC configuration
    pub gesture: GestureConfig,

    /// Control link configuration
    pub comms: CommsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Ekko".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            engine: EngineConfig::default(),
            sensors: SensorConfig::default(),
            interrupts: InterruptConfig::default(),
            schedule: ScheduleConfig::default(),
            gesture: GestureConfig::default(),
            comms: CommsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.engine.tick_hz == 0 {
            bail!("engine.tick_hz must be at least 1");
        }
        if self.engine.history_capacity == 0 {
            bail!("engine.history_capacity must be at least 1");
        }
        let registry = StateRegistry::new();
        let initial = State::new(&self.engine.initial_state);
        if !registry.contains(&initial) {
            bail!("engine.initial_state '{}' is not a known state", initial);
        }
        self.gesture.state_mapping().map(|_| ())
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("ekko"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tick rate in Hz
    pub tick_hz: u32,

    /// State at boot
    pub initial_state: String,

    /// Saved contexts kept for restore
    pub history_capacity: usize,

    /// Time after boot before schedules apply
    pub boot_grace_ms: u64,

    /// Time spent WAKING before returning to ACTIVE
    pub wake_duration_ms: u64,

    /// Single-level or nested context save per interrupt episode
    pub interrupt_policy: InterruptPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            initial_state: State::ACTIVE.to_string(),
            history_capacity: 5,
            boot_grace_ms: 2000,
            wake_duration_ms: 4000,
            interrupt_policy: InterruptPolicy::SingleLevel,
        }
    }
}

/// Sensor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Proximity trigger threshold in mm
    pub proximity_mm: i64,

    /// Distance trigger threshold in mm, disabled when unset
    pub distance_mm: Option<i64>,

    /// Minimum time in a state before a sensor may interrupt it
    pub entry_time_ms: u64,

    /// Serial device of the sensor board
    pub device: Option<PathBuf>,

    /// Poll interval in milliseconds
    pub poll_interval_ms: u64,

    /// Use the simulated sensor when no device is set
    pub demo: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            proximity_mm: 50,
            distance_mm: None,
            entry_time_ms: 500,
            device: None,
            poll_interval_ms: 100,
            demo: true,
        }
    }
}

/// Interrupt configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterruptConfig {
    pub proximity_priority: i32,
    pub distance_priority: i32,
    pub canvas_priority: i32,

    /// How long canvas text stays up
    pub canvas_duration_ms: u64,
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            proximity_priority: 50,
            distance_priority: 30,
            canvas_priority: 80,
            canvas_duration_ms: 10_000,
        }
    }
}

/// Schedule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// JSON rule file
    pub path: PathBuf,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            path: Config::config_dir().join("schedule.json"),
        }
    }
}

/// Gesture IPC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Enable the gesture socket
    pub enabled: bool,

    /// Unix socket path
    pub socket_path: PathBuf,

    /// Gesture name to state name
    pub mapping: HashMap<String, String>,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            socket_path: PathBuf::from("/tmp/ekko_ipc.sock"),
            mapping: crate::comms::default_gesture_mapping()
                .into_iter()
                .map(|(gesture, state)| (gesture, state.to_string()))
                .collect(),
        }
    }
}

impl GestureConfig {
    /// Mapping with every state checked against the built-in set
    pub fn state_mapping(&self) -> Result<HashMap<String, State>> {
        let registry = StateRegistry::new();
        self.mapping
            .iter()
            .map(|(gesture, name)| {
                let state = State::new(name);
                if registry.contains(&state) {
                    Ok((gesture.clone(), state))
                } else {
                    Err(anyhow!("gesture '{}' maps to unknown state '{}'", gesture, name))
                }
            })
            .collect()
    }
}

/// Control link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommsConfig {
    /// Read control-link messages from stdin
    pub console: bool,

    /// Directory searched for GIF lookups
    pub gif_dir: Option<PathBuf>,

    /// GIF shown when a lookup finds nothing
    pub default_gif: Option<PathBuf>,
}

impl Default for CommsConfig {
    fn default() -> Self {
        Self {
            console: true,
            gif_dir: None,
            default_gif: None,
        }
    }
}
