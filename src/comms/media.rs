// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Media and chat lookups used by control-link commands
//!
//! Lookups may block; callers run them off the tick thread.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::services::ServiceError;

pub trait MediaLookup: Send + Sync {
    /// Path of a GIF matching `query`
    fn find_gif(&self, query: &str) -> Result<Option<PathBuf>, ServiceError>;

    /// Reply to a chat message
    fn ask_chat(&self, query: &str) -> Result<Option<String>, ServiceError>;
}

/// Lookups served from the local disk only
#[derive(Debug, Clone, Default)]
pub struct OfflineMedia {
    gif_dir: Option<PathBuf>,
    default_gif: Option<PathBuf>,
}

impl OfflineMedia {
    pub fn new(gif_dir: Option<PathBuf>, default_gif: Option<PathBuf>) -> Self {
        Self { gif_dir, default_gif }
    }

    fn search(dir: &Path, query: &str) -> Result<Option<PathBuf>, ServiceError> {
        let needle = query.to_lowercase();
        let mut matches: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                let is_gif = path
                    .extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("gif"));
                let stem_matches = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map_or(false, |stem| stem.to_lowercase().contains(&needle));
                is_gif && stem_matches
            })
            .collect();
        matches.sort();
        Ok(matches.into_iter().next())
    }
}

impl MediaLookup for OfflineMedia {
    fn find_gif(&self, query: &str) -> Result<Option<PathBuf>, ServiceError> {
        if let Some(dir) = &self.gif_dir {
            if let Some(path) = Self::search(dir, query)? {
                return Ok(Some(path));
            }
            debug!("No local GIF for '{}'", query);
        }
        Ok(self.default_gif.clone())
    }

    fn ask_chat(&self, _query: &str) -> Result<Option<String>, ServiceError> {
        Err(ServiceError::Unavailable("no chat backend configured".to_string()))
    }
}
