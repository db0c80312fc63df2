//! Scheduling core of the gourd edge agent.
//!
//! Holds the desired configuration, the periodic tasks derived from it and
//! the liveness watchdog. Upload and capture logic plug in as callbacks.

pub mod error;
pub use error::CoreError;

pub mod config;
pub use config::{AgentSettings, ConfigDocument, ConfigError, ConfigStore, StorageSettings};

pub mod periodic;
pub use periodic::{PeriodicTask, TaskCallback, TaskError, TaskFuture, callback};

pub mod registry;
pub use registry::{ReconcileReport, TaskRegistry};

pub mod watchdog;
pub use watchdog::{RestartAction, WATCHDOG_REASON, Watchdog};

mod system;
pub use system::{arch, host_name, init_uptime, os_info, platform, resolve_device_id, uptime_seconds};
