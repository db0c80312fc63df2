use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Invalid logger format: {0} (expected: text|json|journald)")]
    InvalidFormat(String),
    #[error("Invalid log rotation: {0} (expected: m|h|d|midnight|never)")]
    InvalidRotation(String),
    #[error("Journald is not supported on this platform or feature disabled")]
    JournaldNotSupported,
    #[error("Logger has been already initialized")]
    AlreadyInitialized,
    #[error("Failed to initialize logger: {0}")]
    InitializationFailed(String),
    #[error("Failed to open log directory {dir}: {reason}")]
    FileOutput { dir: String, reason: String },
    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("Failed to reload log filter: {0}")]
    Reload(String),
}
