use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Data carried from send time to the delivery callback.
///
/// Names the files to remove once delivery is confirmed and whether the video
/// in-flight flag is released at that point.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationToken {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_to_remove: Vec<PathBuf>,
    #[serde(default, rename = "clearIsVideoUploading")]
    pub clear_video_uploading: bool,
}

impl CorrelationToken {
    /// Token for a companion message sent after `artifact` was stored.
    pub fn for_companion(artifact: PathBuf, sidecar: PathBuf, clear_video_uploading: bool) -> Self {
        Self {
            files_to_remove: vec![artifact, sidecar],
            clear_video_uploading,
        }
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}
