use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("object store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("object store rejected {key}: HTTP {status}")]
    Rejected { key: String, status: u16 },
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("message channel request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("message endpoint rejected request: HTTP {0}")]
    Rejected(u16),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}")]
    NonZeroExit { program: String, status: String },
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to list {dir}: {source}")]
    List {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unusable companion sidecar {path}: {reason}")]
    Companion { path: PathBuf, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
