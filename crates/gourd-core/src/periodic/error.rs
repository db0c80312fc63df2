use thiserror::Error;

/// Failure reported by one firing of a periodic callback.
///
/// Errors are logged by the owning task and never cancel later firings.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task failed: {reason}")]
    Fail { reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskError {
    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail {
            reason: reason.into(),
        }
    }
}
