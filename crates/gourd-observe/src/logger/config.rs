use std::{io::IsTerminal, path::PathBuf};

use crate::logger::format::{LogRotation, LoggerFormat};

/// Rolling log file output.
#[derive(Debug, Clone)]
pub struct FileOutput {
    pub dir: PathBuf,
    /// File names are `<prefix>.<timestamp>.log`, so they sort chronologically.
    pub prefix: String,
    pub rotation: LogRotation,
}

impl FileOutput {
    pub fn new(dir: impl Into<PathBuf>, rotation: LogRotation) -> Self {
        Self {
            dir: dir.into(),
            prefix: "gourd-agent".to_string(),
            rotation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
    pub file: Option<FileOutput>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stdout().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color,
            file: None,
        }
    }
}
