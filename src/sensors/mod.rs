// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor module - snapshots, triggers and the producers that feed them

mod manager;
mod serial;
mod simulator;
mod traits;
mod triggers;

pub use manager::SensorPoller;
pub use serial::LineSensor;
pub use simulator::TofSimulator;
pub use traits::{SensorSource, SensorStatus};
pub use triggers::{SensorTrigger, SensorTriggers, DEFAULT_PROXIMITY_MM};

use serde::{Deserialize, Serialize};

/// Status string the TOF sensor reports for a valid range
pub const STATUS_OK: &str = "ok";

fn not_available() -> String {
    "NA".to_string()
}

/// Time-of-flight range reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TofReading {
    pub mm: i64,
    #[serde(default = "not_available")]
    pub status: String,
}

impl TofReading {
    pub fn ok(mm: i64) -> Self {
        Self { mm, status: STATUS_OK.to_string() }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Accelerometer reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImuReading {
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
    #[serde(default = "not_available")]
    pub status: String,
}

impl Default for ImuReading {
    fn default() -> Self {
        Self { ax: 0.0, ay: 0.0, az: 0.0, status: not_available() }
    }
}

/// Latest combined sensor state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub tof: TofReading,
    pub imu: ImuReading,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct SerialFrame {
    sensor_vlox: Envelope<TofReading>,
    #[serde(default)]
    sensor_imu: Option<Envelope<ImuReading>>,
}

impl SensorSnapshot {
    pub fn from_tof(tof: TofReading) -> Self {
        Self { tof, imu: ImuReading::default() }
    }

    /// Parse one line of the sensor board's serial output, e.g.
    /// `{"sensor_vlox":{"data":{"mm":170,"status":"ok"}},"sensor_imu":{"data":{"ax":0,"ay":0,"az":0}}}`
    pub fn from_serial_line(line: &str) -> Result<Self, serde_json::Error> {
        let frame: SerialFrame = serde_json::from_str(line.trim())?;
        Ok(Self {
            tof: frame.sensor_vlox.data,
            imu: frame.sensor_imu.map(|e| e.data).unwrap_or_default(),
        })
    }
}
