mod config;
mod error;
mod format;
mod handle;
mod log;

pub use config::{FileOutput, LoggerConfig};
pub use error::LoggerError;
pub use format::{LogRotation, LoggerFormat};
pub use handle::LoggerHandle;

use tracing_subscriber::util::SubscriberInitExt;

/// Install the global subscriber described by `cfg`.
///
/// The returned handle adjusts the level at runtime and must outlive all
/// logging when file output is enabled.
pub fn logger_init(cfg: &LoggerConfig) -> Result<LoggerHandle, LoggerError> {
    let (subscriber, handle) = log::build(cfg)?;
    subscriber.try_init().map_err(log::as_error)?;
    Ok(handle)
}
