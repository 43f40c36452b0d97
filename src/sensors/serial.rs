// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Line-oriented sensor board reader
//!
//! The board prints one JSON frame per line. The device must already be
//! configured (baud rate etc.) so it can be opened as a plain file.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::{debug, info};

use super::{SensorSnapshot, SensorSource, SensorStatus};
use crate::services::ServiceError;

type LineStream = Lines<BufReader<Box<dyn AsyncRead + Send + Sync + Unpin>>>;

pub struct LineSensor {
    id: String,
    device: Option<PathBuf>,
    lines: Option<LineStream>,
    status: SensorStatus,
}

impl LineSensor {
    /// Reader for a device node, opened on `connect`
    pub fn open(id: &str, device: PathBuf) -> Self {
        Self {
            id: id.to_string(),
            device: Some(device),
            lines: None,
            status: SensorStatus::Disconnected,
        }
    }

    /// Reader over an already-open stream
    pub fn from_reader<R>(id: &str, reader: R) -> Self
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        let boxed: Box<dyn AsyncRead + Send + Sync + Unpin> = Box::new(reader);
        Self {
            id: id.to_string(),
            device: None,
            lines: Some(BufReader::new(boxed).lines()),
            status: SensorStatus::Connected,
        }
    }
}

#[async_trait]
impl SensorSource for LineSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> SensorStatus {
        self.status
    }

    async fn connect(&mut self) -> Result<(), ServiceError> {
        if self.lines.is_none() {
            let device = self
                .device
                .clone()
                .ok_or_else(|| ServiceError::Config(format!("{} has no device", self.id)))?;
            let file = tokio::fs::File::open(&device).await.map_err(|e| {
                self.status = SensorStatus::Error;
                ServiceError::Unavailable(format!("{}: {}", device.display(), e))
            })?;
            let boxed: Box<dyn AsyncRead + Send + Sync + Unpin> = Box::new(file);
            self.lines = Some(BufReader::new(boxed).lines());
            info!("Opened sensor device {:?}", device);
        }
        self.status = SensorStatus::Active;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ServiceError> {
        self.lines = None;
        self.status = SensorStatus::Disconnected;
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<SensorSnapshot>, ServiceError> {
        let lines = self
            .lines
            .as_mut()
            .ok_or_else(|| ServiceError::Unavailable(format!("{} is not connected", self.id)))?;

        match lines.next_line().await? {
            Some(line) => match SensorSnapshot::from_serial_line(&line) {
                Ok(snapshot) => Ok(Some(snapshot)),
                Err(e) => {
                    // partial lines and boot noise are expected
                    debug!("Skipping sensor line: {}", e);
                    Ok(None)
                }
            },
            None => {
                self.status = SensorStatus::Disconnected;
                Err(ServiceError::Unavailable(format!("{} reached end of stream", self.id)))
            }
        }
    }
}
