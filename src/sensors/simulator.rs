// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor simulator for demo/testing

use async_trait::async_trait;
use rand::prelude::*;
use rand_distr::StandardNormal;

use super::{ImuReading, SensorSnapshot, SensorSource, SensorStatus, TofReading, STATUS_OK};
use crate::services::ServiceError;

const RESTING_MM: f64 = 800.0;
const CLOSEST_MM: f64 = 15.0;
const MAX_RANGE_MM: f64 = 2000.0;
const RANGE_NOISE_MM: f64 = 4.0;
const GRAVITY: f64 = 9.81;

/// Simulates a time-of-flight sensor with someone occasionally leaning in
pub struct TofSimulator {
    id: String,
    status: SensorStatus,
    rng: StdRng,

    // Simulation state
    distance: f64,
    approaching: bool,
    approach_probability: f64,
    dropout_probability: f64,
}

impl TofSimulator {
    pub fn new(id: &str) -> Self {
        Self::with_rng(id, StdRng::from_entropy())
    }

    /// Reproducible sequence for tests
    pub fn seeded(id: &str, seed: u64) -> Self {
        Self::with_rng(id, StdRng::seed_from_u64(seed))
    }

    fn with_rng(id: &str, rng: StdRng) -> Self {
        Self {
            id: id.to_string(),
            status: SensorStatus::Disconnected,
            rng,
            distance: RESTING_MM,
            approaching: false,
            approach_probability: 0.01,
            dropout_probability: 0.005,
        }
    }

    pub fn with_approach_probability(mut self, probability: f64) -> Self {
        self.approach_probability = probability.clamp(0.0, 1.0);
        self
    }

    fn gauss(&mut self) -> f64 {
        self.rng.sample::<f64, _>(StandardNormal)
    }

    fn step(&mut self) -> SensorSnapshot {
        if !self.approaching && self.rng.gen::<f64>() < self.approach_probability {
            self.approaching = true;
        }

        if self.approaching {
            self.distance -= self.rng.gen_range(20.0..60.0);
            if self.distance <= CLOSEST_MM {
                self.distance = CLOSEST_MM;
                // linger for a moment, then back off
                if self.rng.gen::<f64>() < 0.05 {
                    self.approaching = false;
                }
            }
        } else {
            self.distance += (RESTING_MM - self.distance) * 0.05;
        }

        let mm = (self.distance + self.gauss() * RANGE_NOISE_MM).clamp(0.0, MAX_RANGE_MM);
        let status = if self.rng.gen::<f64>() < self.dropout_probability {
            "timeout"
        } else {
            STATUS_OK
        };

        SensorSnapshot {
            tof: TofReading { mm: mm.round() as i64, status: status.to_string() },
            imu: ImuReading {
                ax: self.gauss() * 0.04,
                ay: self.gauss() * 0.04,
                az: GRAVITY + self.gauss() * 0.05,
                status: STATUS_OK.to_string(),
            },
        }
    }
}

#[async_trait]
impl SensorSource for TofSimulator {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> SensorStatus {
        self.status
    }

    async fn connect(&mut self) -> Result<(), ServiceError> {
        self.status = SensorStatus::Active;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ServiceError> {
        self.status = SensorStatus::Disconnected;
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<SensorSnapshot>, ServiceError> {
        if self.status != SensorStatus::Active {
            return Err(ServiceError::Unavailable(format!("{} is not connected", self.id)));
        }
        Ok(Some(self.step()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_requires_connect() {
        let mut sim = TofSimulator::seeded("tof-1", 7);
        assert!(sim.read().await.is_err());
        sim.connect().await.unwrap();
        assert_eq!(sim.status(), SensorStatus::Active);
        assert!(sim.read().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_approach_reaches_proximity() {
        let mut sim = TofSimulator::seeded("tof-1", 42).with_approach_probability(1.0);
        sim.connect().await.unwrap();

        let mut closest = i64::MAX;
        for _ in 0..100 {
            let snapshot = sim.read().await.unwrap().unwrap();
            assert!((0..=MAX_RANGE_MM as i64).contains(&snapshot.tof.mm));
            closest = closest.min(snapshot.tof.mm);
        }
        assert!(closest < 50, "closest was {}", closest);
    }
}
