//! Desired configuration: document model, durable store and derived settings.
//!
//! The document is a JSON tree addressed by `|`- or `.`-separated paths
//! (`Twin|desired|SensorCaptureFrequency`). Reads never fail: absent or
//! incompatible values fall back to the caller's default.

mod document;
pub use document::{ConfigDocument, FromConfigValue};

mod error;
pub use error::ConfigError;

mod settings;
pub use settings::{AgentSettings, DEFAULT_DEVICE_ID, DESIRED, REPORTED, StorageSettings, TWIN};

mod store;
pub use store::ConfigStore;
