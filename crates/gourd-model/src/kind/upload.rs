use std::fmt;

use serde::{Deserialize, Serialize};

/// Upload class: the unit of single-flight exclusion.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadClass {
    Video,
    Log,
}

impl UploadClass {
    /// Folder segment of the destination key, also the local directory name.
    pub fn folder(&self) -> &'static str {
        match self {
            UploadClass::Video => "videos",
            UploadClass::Log => "logs",
        }
    }

    /// Extension of candidate artifacts (matched case-insensitively).
    pub fn extension(&self) -> &'static str {
        match self {
            UploadClass::Video => "mp4",
            UploadClass::Log => "log",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            UploadClass::Video => "video/mp4",
            UploadClass::Log => "text/plain",
        }
    }

    pub fn file_kind(&self) -> FileKind {
        match self {
            UploadClass::Video => FileKind::Video,
            UploadClass::Log => FileKind::Log,
        }
    }

    /// Whether artifacts of this class may carry a `.json` companion sidecar.
    pub fn has_companion(&self) -> bool {
        matches!(self, UploadClass::Video)
    }
}

impl fmt::Display for UploadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_kind().as_str())
    }
}

/// Kind of file carried by a transfer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileKind {
    Video,
    Log,
    Image,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Video => "video",
            FileKind::Log => "log",
            FileKind::Image => "image",
        }
    }
}
