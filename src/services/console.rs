// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Console stand-in for the wireless control link

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::ServiceError;
use crate::comms::CommsSnapshot;
use crate::core::SnapshotSlot;

/// Publishes every input line as a connected comms message
pub struct ConsoleComms {
    slot: SnapshotSlot<CommsSnapshot>,
}

impl ConsoleComms {
    pub fn new(slot: SnapshotSlot<CommsSnapshot>) -> Self {
        Self { slot }
    }

    pub async fn run_stdin(self, shutdown: broadcast::Receiver<()>) -> Result<(), ServiceError> {
        info!("Console comms ready - type STATE;<name>, GIF;<query>, CHAT;<text> or any text");
        self.run(BufReader::new(tokio::io::stdin()), shutdown).await
    }

    pub async fn run<R>(self, reader: R, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServiceError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) if line.trim().is_empty() => continue,
                        Some(line) => {
                            debug!("Console message: {}", line);
                            self.slot.publish(CommsSnapshot::connected(line));
                        }
                        None => {
                            info!("Console input closed");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        Ok(())
    }
}
