use std::str::FromStr;

use tracing_appender::rolling::Rotation;

use crate::logger::error::LoggerError;

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerFormat {
    Text,
    Json,
    Journald,
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "text" => Ok(LoggerFormat::Text),
            "json" => Ok(LoggerFormat::Json),
            "journald" | "journal" => {
                #[cfg(all(target_os = "linux", feature = "journald"))]
                {
                    Ok(LoggerFormat::Journald)
                }

                #[cfg(not(all(target_os = "linux", feature = "journald")))]
                {
                    Err(LoggerError::JournaldNotSupported)
                }
            }
            _ => Err(LoggerError::InvalidFormat(s.to_string())),
        }
    }
}

/// How often the log file rolls over.
///
/// Parsed from the `LogWhen` setting: `s`/`m` roll every minute, `h` every
/// hour, `d`, `midnight` and weekly (`w0`..`w6`) once a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogRotation {
    Minutely,
    #[default]
    Hourly,
    Daily,
    Never,
}

impl LogRotation {
    pub(crate) fn as_rotation(self) -> Rotation {
        match self {
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

impl FromStr for LogRotation {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "s" | "m" => Ok(LogRotation::Minutely),
            "h" => Ok(LogRotation::Hourly),
            "d" | "midnight" => Ok(LogRotation::Daily),
            "never" => Ok(LogRotation::Never),
            w if w.len() == 2 && w.starts_with('w') && matches!(w.as_bytes()[1], b'0'..=b'6') => {
                Ok(LogRotation::Daily)
            }
            _ => Err(LoggerError::InvalidRotation(s.to_string())),
        }
    }
}
