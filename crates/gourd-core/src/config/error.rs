use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The change is live in memory but could not be written to disk.
    #[error("failed to persist config file {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config document: {0}")]
    InvalidDocument(String),

    #[error("invalid update payload: {0}")]
    InvalidPayload(String),
}

impl ConfigError {
    /// True when the in-memory document was updated and only durability failed.
    pub fn is_persist(&self) -> bool {
        matches!(self, ConfigError::Persist { .. })
    }
}
