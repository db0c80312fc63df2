use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Unit of scheduling.
///
/// Each kind owns at most one running periodic task at a time; instances are never shared across kinds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Sensor sample capture.
    Sensor,
    /// Still image capture.
    Image,
    /// Video clip capture.
    Video,
    /// Oldest-first video artifact upload.
    VideoUpload,
    /// Oldest-first log file upload.
    LogUpload,
    /// Liveness check that restarts the device after prolonged silence.
    Watchdog,
}

impl TaskKind {
    /// Every kind, in reconciliation order.
    pub const ALL: [TaskKind; 6] = [
        TaskKind::Sensor,
        TaskKind::Image,
        TaskKind::Video,
        TaskKind::VideoUpload,
        TaskKind::LogUpload,
        TaskKind::Watchdog,
    ];

    /// Returns a short symbolic identifier, used in logs and the local API.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskKind::Sensor => "sensor",
            TaskKind::Image => "image",
            TaskKind::Video => "video",
            TaskKind::VideoUpload => "video-upload",
            TaskKind::LogUpload => "log-upload",
            TaskKind::Watchdog => "watchdog",
        }
    }

    /// Kinds that survive a partial stop (`stop_all(false)`).
    ///
    /// The master "schedulers enabled" switch gates only the capture kinds;
    /// uploads and the watchdog keep running until a full stop.
    pub fn is_always_on(&self) -> bool {
        matches!(
            self,
            TaskKind::VideoUpload | TaskKind::LogUpload | TaskKind::Watchdog
        )
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

impl FromStr for TaskKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('_', "-");
        TaskKind::ALL
            .into_iter()
            .find(|k| k.kind() == norm)
            .ok_or_else(|| ModelError::UnknownTaskKind(s.to_string()))
    }
}
