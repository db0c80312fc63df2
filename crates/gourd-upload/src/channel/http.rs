use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use gourd_model::{CorrelationToken, Delivery, DeliveryOutcome, OutboundMessage, Properties};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::{ChannelError, MessageChannel};

/// How long one message may take before it counts as undelivered.
pub const MESSAGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    message_id: &'a str,
    properties: &'a Properties,
    body: String,
}

/// Message channel over HTTP.
///
/// Messages go to `POST {endpoint}/v1/devices/{id}/messages`, reported
/// properties to `PATCH {endpoint}/v1/devices/{id}/twin/reported`. Each send
/// runs on its own tokio task and posts its [`Delivery`] when it settles.
#[derive(Debug, Clone)]
pub struct HttpMessageChannel {
    client: Client,
    base: String,
    deliveries: UnboundedSender<Delivery>,
}

impl HttpMessageChannel {
    pub fn new(
        endpoint: &str,
        device_id: &str,
        deliveries: UnboundedSender<Delivery>,
    ) -> Result<Self, ChannelError> {
        let client = Client::builder().timeout(MESSAGE_TIMEOUT).build()?;
        Ok(Self {
            client,
            base: format!("{}/v1/devices/{}", endpoint.trim_end_matches('/'), device_id),
            deliveries,
        })
    }
}

async fn post_message(
    client: &Client,
    url: &str,
    message: &OutboundMessage,
) -> Result<(), ChannelError> {
    let envelope = Envelope {
        message_id: &message.message_id,
        properties: &message.properties,
        body: String::from_utf8_lossy(&message.payload).into_owned(),
    };
    let response = client.post(url).json(&envelope).send().await?;
    if !response.status().is_success() {
        return Err(ChannelError::Rejected(response.status().as_u16()));
    }
    Ok(())
}

#[async_trait]
impl MessageChannel for HttpMessageChannel {
    fn send(&self, message: OutboundMessage, token: CorrelationToken) {
        let client = self.client.clone();
        let url = format!("{}/messages", self.base);
        let deliveries = self.deliveries.clone();

        tokio::spawn(async move {
            let outcome = match post_message(&client, &url, &message).await {
                Ok(()) => DeliveryOutcome::Ok,
                Err(e) => DeliveryOutcome::Error(e.to_string()),
            };
            debug!(message_id = %message.message_id, ?outcome, "message settled");

            let delivery = Delivery {
                message_id: message.message_id,
                token,
                outcome,
            };
            if deliveries.send(delivery).is_err() {
                warn!("delivery tracker is gone; acknowledgment dropped");
            }
        });
    }

    async fn report(&self, properties: BTreeMap<String, Value>) -> Result<(), ChannelError> {
        let response = self
            .client
            .patch(format!("{}/twin/reported", self.base))
            .json(&properties)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ChannelError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}
