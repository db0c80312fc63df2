use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, reload};

use crate::logger::{error::LoggerError, log::mk_filter};

/// Live handle to the installed logger.
///
/// Keeps the file writer flushing for as long as it is alive; drop it last.
pub struct LoggerHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    level: Mutex<String>,
    log_dir: Option<PathBuf>,
    _guard: Option<WorkerGuard>,
}

impl LoggerHandle {
    pub(crate) fn new(
        filter: reload::Handle<EnvFilter, Registry>,
        level: String,
        log_dir: Option<PathBuf>,
        guard: Option<WorkerGuard>,
    ) -> Self {
        Self {
            filter,
            level: Mutex::new(level),
            log_dir,
            _guard: guard,
        }
    }

    /// Swap the filter directive; a no-op when it is unchanged.
    pub fn set_level(&self, level: &str) -> Result<(), LoggerError> {
        let mut current = self.level.lock().unwrap();
        if *current == level {
            return Ok(());
        }
        let filter = mk_filter(level)?;
        self.filter
            .reload(filter)
            .map_err(|e| LoggerError::Reload(e.to_string()))?;

        info!(from = %*current, to = %level, "log level changed");
        *current = level.to_string();
        Ok(())
    }

    pub fn level(&self) -> String {
        self.level.lock().unwrap().clone()
    }

    /// Directory receiving rolled log files, when file output is enabled.
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

impl std::fmt::Debug for LoggerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerHandle")
            .field("level", &self.level())
            .field("log_dir", &self.log_dir)
            .finish()
    }
}
