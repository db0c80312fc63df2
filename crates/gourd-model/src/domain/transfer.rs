use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use crate::FileKind;

/// Everything the upload pipeline knows about one selected artifact.
///
/// Created when the oldest candidate of a class is picked and dropped once the
/// source file is cleaned up or the attempt is abandoned.
#[derive(Clone, Debug)]
pub struct TransferContext {
    pub started_at: Instant,
    pub file_kind: FileKind,
    pub source_path: PathBuf,
    pub byte_size: u64,
    /// Destination key inside the container, `{device}/{folder}/{file_name}`.
    pub destination_key: String,
    pub content_type: String,
    /// Sidecar carrying the message to send once the artifact is stored.
    pub companion_path: Option<PathBuf>,
}

impl TransferContext {
    /// Bytes per second since the context was created.
    pub fn throughput(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.byte_size as f64 / secs
        } else {
            self.byte_size as f64
        }
    }
}
