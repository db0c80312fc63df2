use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};

use gourd_core::{AgentSettings, ConfigStore, TaskError, resolve_device_id};
use gourd_model::{CorrelationToken, OutboundMessage, Properties, TaskKind};
use gourd_upload::{CodecTool, MessageChannel};
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

/// Capture command lines per kind, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CaptureCommands {
    pub sensor: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
}

impl CaptureCommands {
    pub fn get(&self, kind: TaskKind) -> Option<&str> {
        match kind {
            TaskKind::Sensor => self.sensor.as_deref(),
            TaskKind::Image => self.image.as_deref(),
            TaskKind::Video => self.video.as_deref(),
            _ => None,
        }
    }
}

/// One capture kind bound to its shell command.
///
/// The command runs under `sh -c` with `GOURD_KIND`, `GOURD_DEVICE_ID` and
/// `GOURD_OUTPUT_DIR` set. Sensor output on stdout becomes a telemetry message.
/// Raw video left by the recorder is repackaged once the command has exited.
pub struct Capture {
    kind: TaskKind,
    command: Option<String>,
    output_dir: PathBuf,
    config: Arc<ConfigStore>,
    channel: Arc<dyn MessageChannel>,
    codec: Option<Arc<CodecTool>>,
}

impl Capture {
    pub fn new(
        kind: TaskKind,
        command: Option<String>,
        data_dir: &Path,
        config: Arc<ConfigStore>,
        channel: Arc<dyn MessageChannel>,
    ) -> Self {
        let output_dir = match kind {
            TaskKind::Image => data_dir.join("images"),
            TaskKind::Video => data_dir.join("videos"),
            _ => data_dir.to_path_buf(),
        };
        Self {
            kind,
            command,
            output_dir,
            config,
            channel,
            codec: None,
        }
    }

    pub fn with_codec(mut self, codec: Arc<CodecTool>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub async fn fire(&self) -> Result<(), TaskError> {
        let Some(command) = &self.command else {
            debug!(kind = %self.kind, "no capture command configured; skipping");
            return Ok(());
        };
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let device_id = resolve_device_id(&self.config.get_or("DeviceId", String::new()));

        let out = Command::new("sh")
            .arg("-c")
            .arg(command)
            .env("GOURD_KIND", self.kind.kind())
            .env("GOURD_DEVICE_ID", &device_id)
            .env("GOURD_OUTPUT_DIR", &self.output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(TaskError::fail(format!(
                "{} capture exited with {}: {}",
                self.kind,
                out.status,
                stderr.trim()
            )));
        }

        if self.kind == TaskKind::Video
            && let Some(codec) = &self.codec
        {
            let frame_rate = AgentSettings::from_document(&self.config.snapshot()).video_frame_rate;
            codec.prepare_raw_videos(&self.output_dir, frame_rate).await;
        }

        if self.kind == TaskKind::Sensor {
            let reading = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if !reading.is_empty() {
                let properties = Properties::from([("type".to_string(), "sensor".to_string())]);
                let message =
                    OutboundMessage::new(Uuid::new_v4().to_string(), reading.into_bytes(), properties);
                info!(message_id = %message.message_id, bytes = message.payload.len(), "sending sensor reading");
                self.channel.send(message, CorrelationToken::default());
            }
        }
        Ok(())
    }
}
