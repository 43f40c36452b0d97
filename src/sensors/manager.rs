// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor poller - drives one source and publishes its snapshots

use tokio::sync::broadcast;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{SensorSnapshot, SensorSource, SensorStatus};
use crate::core::SnapshotSlot;
use crate::services::ServiceError;

/// Default poll period
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

pub struct SensorPoller {
    source: Box<dyn SensorSource>,
    slot: SnapshotSlot<SensorSnapshot>,
    poll_interval: Duration,
    readings: u64,
    errors: u64,
}

impl SensorPoller {
    pub fn new(source: Box<dyn SensorSource>, slot: SnapshotSlot<SensorSnapshot>) -> Self {
        Self {
            source,
            slot,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            readings: 0,
            errors: 0,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn readings(&self) -> u64 {
        self.readings
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Poll once and publish anything new
    pub async fn poll(&mut self) -> Result<(), ServiceError> {
        match self.source.read().await {
            Ok(Some(snapshot)) => {
                self.readings += 1;
                self.slot.publish(snapshot);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                self.errors += 1;
                Err(e)
            }
        }
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServiceError> {
        info!("Starting sensor poller for {}...", self.source.id());
        self.source.connect().await?;

        let mut poll_interval = interval(self.poll_interval);
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    if let Err(e) = self.poll().await {
                        if self.source.status() == SensorStatus::Active {
                            debug!("Read error for {}: {}", self.source.id(), e);
                        } else {
                            error!("Sensor {} lost: {}", self.source.id(), e);
                            // stale readings must not keep triggering
                            self.slot.clear();
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Sensor poller shutting down...");
                    break;
                }
            }
        }

        if let Err(e) = self.source.disconnect().await {
            warn!("Error disconnecting {}: {}", self.source.id(), e);
        }
        info!(
            "Sensor {} stopped after {} readings ({} errors)",
            self.source.id(),
            self.readings,
            self.errors
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{LineSensor, TofSimulator};
    use std::io::Cursor;

    #[tokio::test]
    async fn test_poll_publishes_latest() {
        let slot = SnapshotSlot::new();
        let mut source = TofSimulator::seeded("tof-1", 3);
        source.connect().await.unwrap();
        let mut poller = SensorPoller::new(Box::new(source), slot.clone());

        poller.poll().await.unwrap();
        poller.poll().await.unwrap();
        assert_eq!(poller.readings(), 2);
        assert!(slot.latest().is_some());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let slot = SnapshotSlot::new();
        let poller = SensorPoller::new(Box::new(TofSimulator::seeded("tof-1", 9)), slot.clone())
            .with_poll_interval(Duration::from_millis(5));
        let (tx, rx) = broadcast::channel(1);

        let task = tokio::spawn(poller.run(rx));
        tokio::time::sleep(Duration::from_millis(40)).await;
        tx.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert!(slot.latest().is_some());
    }

    #[tokio::test]
    async fn test_lost_source_clears_slot() {
        let slot = SnapshotSlot::new();
        let line = r#"{"sensor_vlox":{"data":{"mm":30,"status":"ok"}}}"#;
        let source = LineSensor::from_reader("serial", Cursor::new(format!("{}\n", line).into_bytes()));
        let poller = SensorPoller::new(Box::new(source), slot.clone())
            .with_poll_interval(Duration::from_millis(1));
        let (_tx, rx) = broadcast::channel(1);

        poller.run(rx).await.unwrap();
        assert_eq!(slot.latest(), None);
    }
}
