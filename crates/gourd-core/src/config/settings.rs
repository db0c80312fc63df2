use std::time::Duration;

use gourd_model::{ScheduleParams, TaskKind};

use crate::config::ConfigDocument;

pub const TWIN: &str = "Twin";
pub const DESIRED: &str = "Twin|desired";
pub const REPORTED: &str = "Twin|reported";
pub const DEFAULT_DEVICE_ID: &str = "unknown_device";

const DEFAULT_CONTAINER: &str = "deviceuploads";

/// Storage account credentials from the desired configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageSettings {
    pub account_name: String,
    pub account_key: String,
    pub container: String,
}

impl StorageSettings {
    /// Uploads stay disabled until both the account name and key are present.
    pub fn is_configured(&self) -> bool {
        !self.account_name.trim().is_empty() && !self.account_key.trim().is_empty()
    }
}

/// Every value the agent derives from one configuration snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub device_id: String,
    pub sensor: ScheduleParams,
    pub image: ScheduleParams,
    pub video: ScheduleParams,
    pub video_upload: ScheduleParams,
    pub log_upload: ScheduleParams,
    pub watchdog: ScheduleParams,
    pub watchdog_min_reboot: Duration,
    pub video_frame_rate: u32,
    /// Level directive for the tracing filter (`debug`, `info`, `warn`, `error`).
    pub log_level: &'static str,
    pub log_when: String,
    pub storage: StorageSettings,
    /// `None` keeps the video in-flight flag until delivery is acknowledged.
    pub video_upload_lease: Option<Duration>,
}

impl AgentSettings {
    pub fn from_document(doc: &ConfigDocument) -> Self {
        let desired = |key: &str| format!("{DESIRED}|{key}");
        let schedule = |freq_key: &str, start_key: &str, default_freq: f64| {
            let period = doc.get_or(&desired(freq_key), default_freq);
            let start = doc.get_or(&desired(start_key), period);
            ScheduleParams::from_secs(start, period)
        };

        let lease = doc.get_or(&desired("VideoUploadLeaseSeconds"), 0.0f64);

        Self {
            device_id: doc.get_or("DeviceId", DEFAULT_DEVICE_ID.to_string()),
            sensor: schedule("SensorCaptureFrequency", "SensorCaptureStartInterval", 60.0),
            image: schedule("ImageCaptureFrequency", "ImageCaptureStartInterval", 0.0),
            video: schedule("VideoCaptureFrequency", "VideoCaptureStartInterval", 0.0),
            video_upload: schedule(
                "VideoUploadSchedulerFrequency",
                "VideoUploadStartInterval",
                5.0,
            ),
            log_upload: schedule("LogUploadSchedulerFrequency", "LogUploadStartInterval", 5.0),
            watchdog: schedule("WatchdogFrequency", "WatchdogStartInterval", 15.0),
            watchdog_min_reboot: secs(doc.get_or(&desired("WatchdogMinRebootTime"), 900.0)),
            video_frame_rate: doc
                .get::<u64>(&desired("VideoCaptureFrameRate"))
                .and_then(|r| u32::try_from(r).ok())
                .filter(|r| *r > 0)
                .unwrap_or(24),
            log_level: level_directive(&doc.get_or(&desired("LogLevel"), "DEBUG".to_string())),
            log_when: doc
                .get_or(&desired("LogWhen"), "h".to_string())
                .trim()
                .to_lowercase(),
            storage: StorageSettings {
                account_name: doc.get_or(&desired("StorageAccountName"), String::new()),
                account_key: doc.get_or(&desired("StorageAccountKey"), String::new()),
                container: doc.get_or(&desired("StorageAccountContainer"), DEFAULT_CONTAINER.to_string()),
            },
            video_upload_lease: (lease > 0.0).then(|| secs(lease)),
        }
    }

    pub fn schedule(&self, kind: TaskKind) -> ScheduleParams {
        match kind {
            TaskKind::Sensor => self.sensor,
            TaskKind::Image => self.image,
            TaskKind::Video => self.video,
            TaskKind::VideoUpload => self.video_upload,
            TaskKind::LogUpload => self.log_upload,
            TaskKind::Watchdog => self.watchdog,
        }
    }
}

impl AgentSettings {
    /// Keys read once at process start whose value differs from `boot`.
    ///
    /// The telemetry channel address embeds `DeviceId` and the log file
    /// appender is built with `LogWhen`; both need an agent restart.
    pub fn restart_required_since(&self, boot: &AgentSettings) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.device_id != boot.device_id {
            keys.push("DeviceId");
        }
        if self.log_when != boot.log_when {
            keys.push("LogWhen");
        }
        keys
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_document(&ConfigDocument::new())
    }
}

fn secs(v: f64) -> Duration {
    ScheduleParams::from_secs(0.0, v).period
}

/// Map a logging level name to a filter directive; unknown names fall back to debug.
fn level_directive(name: &str) -> &'static str {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "INFO" => "info",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" | "FATAL" => "error",
        _ => "debug",
    }
}
