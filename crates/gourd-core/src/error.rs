use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("agent is shutting down")]
    ShuttingDown,
}
