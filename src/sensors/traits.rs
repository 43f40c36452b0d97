// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor traits and common types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::SensorSnapshot;
use crate::services::ServiceError;

/// Sensor operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorStatus {
    Disconnected,
    Connected,
    Active,
    Error,
}

/// Anything that can produce sensor snapshots
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Get sensor unique identifier
    fn id(&self) -> &str;

    /// Get current status
    fn status(&self) -> SensorStatus;

    /// Open the underlying device
    async fn connect(&mut self) -> Result<(), ServiceError>;

    /// Release the underlying device
    async fn disconnect(&mut self) -> Result<(), ServiceError>;

    /// Next snapshot, or `None` when nothing new is available yet
    async fn read(&mut self) -> Result<Option<SensorSnapshot>, ServiceError>;
}
