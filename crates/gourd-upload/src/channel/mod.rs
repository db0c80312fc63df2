use std::collections::BTreeMap;

use async_trait::async_trait;
use gourd_model::{CorrelationToken, OutboundMessage};
use serde_json::Value;

use crate::ChannelError;

mod http;
pub use http::{HttpMessageChannel, MESSAGE_TIMEOUT};

/// Outbound telemetry link.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Dispatch `message` without waiting.
    ///
    /// Exactly one [`gourd_model::Delivery`] carrying `token` is later posted
    /// to the delivery tracker, whatever the outcome.
    fn send(&self, message: OutboundMessage, token: CorrelationToken);

    /// Publish reported properties (best effort).
    async fn report(&self, properties: BTreeMap<String, Value>) -> Result<(), ChannelError>;
}
