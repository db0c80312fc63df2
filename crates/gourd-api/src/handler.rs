use async_trait::async_trait;
use gourd_core::ReconcileReport;
use gourd_model::{TaskInfo, UpdateKind};
use serde_json::Value;

use crate::error::ApiError;

/// Agent control API handler.
///
/// Implemented by the daemon; transports (HTTP) only translate requests.
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Current configuration document.
    async fn config(&self) -> Result<Value, ApiError>;

    /// Apply a configuration update, then reconcile the periodic tasks.
    async fn update_config(
        &self,
        kind: UpdateKind,
        payload: Value,
    ) -> Result<ReconcileReport, ApiError>;

    /// Snapshot of the running periodic tasks.
    async fn tasks(&self) -> Result<Vec<TaskInfo>, ApiError>;

    /// Restart the device.
    async fn reboot(&self, reason: String) -> Result<(), ApiError>;
}
