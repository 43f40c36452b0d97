// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Gesture IPC server
//!
//! The recognizer process connects over a Unix socket and sends frames of a
//! 4-byte big-endian length followed by a UTF-8 JSON payload.

use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::ServiceError;
use crate::comms::GestureTranslator;

/// Largest payload accepted; bigger frames close the connection
pub const MAX_FRAME_LEN: u32 = 64 * 1024;

pub struct GestureListener {
    socket_path: PathBuf,
    listener: UnixListener,
    translator: GestureTranslator,
}

impl GestureListener {
    /// Bind the socket, replacing a stale one left by a previous run
    pub fn bind(socket_path: &Path, translator: GestureTranslator) -> Result<Self, ServiceError> {
        if let Ok(meta) = std::fs::symlink_metadata(socket_path) {
            if !meta.file_type().is_socket() {
                return Err(ServiceError::Config(format!(
                    "{:?} exists and is not a socket",
                    socket_path
                )));
            }
            std::fs::remove_file(socket_path)?;
        }
        let listener = UnixListener::bind(socket_path)?;
        info!("Gesture IPC listening on {:?}", socket_path);
        Ok(Self {
            socket_path: socket_path.to_path_buf(),
            listener,
            translator,
        })
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServiceError> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            debug!("Gesture client connected");
                            // one recognizer at a time; frames feed the translator in order
                            tokio::select! {
                                result = serve(stream, &mut self.translator) => {
                                    if let Err(e) = result {
                                        warn!("Gesture client error: {}", e);
                                    }
                                }
                                _ = shutdown.recv() => break,
                            }
                            debug!("Gesture client disconnected");
                        }
                        Err(e) => error!("Gesture accept failed: {}", e),
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        info!("Gesture IPC shutting down...");
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            debug!("Could not remove {:?}: {}", self.socket_path, e);
        }
        Ok(())
    }
}

async fn serve(mut stream: UnixStream, translator: &mut GestureTranslator) -> Result<(), ServiceError> {
    loop {
        let len = match stream.read_u32().await {
            Ok(len) => len,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if len > MAX_FRAME_LEN {
            return Err(ServiceError::Unavailable(format!("frame of {} bytes exceeds limit", len)));
        }

        let mut payload = vec![0u8; len as usize];
        stream.read_exact(&mut payload).await?;

        if let Err(e) = translator.handle_json(&payload) {
            debug!("Undecodable gesture frame: {}", e);
        }
    }
}

/// Write one frame; used by recognizer clients and tests
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ServiceError>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| ServiceError::Config(format!("payload of {} bytes is too large", payload.len())))?;
    writer.write_u32(len).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CommandCenter, State};
    use std::time::Duration;

    #[tokio::test]
    async fn test_frames_become_commands() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("ekko_ipc.sock");
        let (commands, queue) = CommandCenter::channel();
        let listener = GestureListener::bind(&socket, GestureTranslator::new(commands)).unwrap();
        let (tx, rx) = broadcast::channel(1);
        let server = tokio::spawn(listener.run(rx));

        let mut client = UnixStream::connect(&socket).await.unwrap();
        write_frame(&mut client, br#"{"gesture": "thumb_up", "score": 0.97}"#).await.unwrap();
        write_frame(&mut client, b"garbage").await.unwrap();
        write_frame(&mut client, br#"{"gesture": "closed_fist", "score": 0.8}"#).await.unwrap();
        drop(client);

        let mut issued = Vec::new();
        for _ in 0..100 {
            while let Some(command) = queue.try_next() {
                issued.push(command.target_state());
            }
            if issued.len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(issued, vec![Some(State::HAPPY), Some(State::ACTIVE)]);

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert!(!socket.exists());
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket_only() {
        let dir = tempfile::tempdir().unwrap();
        let (commands, _queue) = CommandCenter::channel();

        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, b"keep me").unwrap();
        let err = GestureListener::bind(&notes, GestureTranslator::new(commands.clone()));
        assert!(matches!(err, Err(ServiceError::Config(_))));
        assert_eq!(std::fs::read(&notes).unwrap(), b"keep me");

        let socket = dir.path().join("ekko_ipc.sock");
        let stale = std::os::unix::net::UnixListener::bind(&socket).unwrap();
        drop(stale);
        assert!(GestureListener::bind(&socket, GestureTranslator::new(commands)).is_ok());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let mut sink = Vec::new();
        let big = vec![b' '; MAX_FRAME_LEN as usize + 1];
        assert!(matches!(write_frame(&mut sink, &big).await, Err(ServiceError::Config(_))));
        assert!(sink.is_empty());
    }
}
