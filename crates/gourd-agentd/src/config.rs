use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Process configuration of the agent daemon.
///
/// Device behavior (schedules, storage credentials, log level) lives in the
/// persisted configuration document; only wiring is configured here.
#[derive(Debug, Clone, Parser)]
#[command(name = "gourd-agentd", version, about = "Edge device agent")]
pub struct AgentArgs {
    /// Directory holding `config.json` and the `videos/`, `images/` and `logs/` folders.
    #[arg(long, env = "GOURD_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Address of the local control API.
    #[arg(long, env = "GOURD_BIND", default_value = "127.0.0.1:8085")]
    pub bind: SocketAddr,

    /// Base URL of the telemetry service receiving messages and reported properties.
    #[arg(long, env = "GOURD_TELEMETRY_ENDPOINT", default_value = "http://127.0.0.1:8080")]
    pub telemetry_endpoint: String,

    /// Base URL of the object store; uploads stay disabled without it.
    #[arg(long, env = "GOURD_STORAGE_ENDPOINT")]
    pub storage_endpoint: Option<String>,

    /// Console log format: text, json or journald.
    #[arg(long, env = "GOURD_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Initial log filter; replaced by `LogLevel` once the configuration is applied.
    #[arg(long, env = "GOURD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Also write rolling log files into `<data-dir>/logs` for upload.
    #[arg(long, env = "GOURD_LOG_TO_FILE", default_value_t = false)]
    pub log_to_file: bool,

    /// Command line of the raw video repackager.
    #[arg(long, env = "GOURD_CODEC_PROGRAM", default_value = "MP4Box")]
    pub codec_program: String,

    /// Shell command that restarts the device.
    #[arg(
        long,
        env = "GOURD_RESTART_CMD",
        default_value = "(sleep 5; sudo shutdown -r now) &"
    )]
    pub restart_cmd: String,

    #[arg(long, env = "GOURD_SENSOR_CMD")]
    pub sensor_cmd: Option<String>,

    #[arg(long, env = "GOURD_IMAGE_CMD")]
    pub image_cmd: Option<String>,

    #[arg(long, env = "GOURD_VIDEO_CMD")]
    pub video_cmd: Option<String>,
}

impl AgentArgs {
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = AgentArgs::try_parse_from(["gourd-agentd"]).unwrap();
        assert_eq!(args.bind.port(), 8085);
        assert_eq!(args.codec_program, "MP4Box");
        assert!(args.storage_endpoint.is_none());
        assert!(!args.log_to_file);
        assert_eq!(args.config_path(), PathBuf::from("./data/config.json"));
    }

    #[test]
    fn flags_override() {
        let args = AgentArgs::try_parse_from([
            "gourd-agentd",
            "--data-dir",
            "/var/lib/gourd",
            "--storage-endpoint",
            "http://store:9000",
            "--sensor-cmd",
            "read-sensors --json",
            "--log-to-file",
        ])
        .unwrap();
        assert_eq!(args.logs_dir(), PathBuf::from("/var/lib/gourd/logs"));
        assert_eq!(args.storage_endpoint.as_deref(), Some("http://store:9000"));
        assert_eq!(args.sensor_cmd.as_deref(), Some("read-sensors --json"));
        assert!(args.log_to_file);
    }
}
