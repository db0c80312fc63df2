//! Test doubles for the agent tests.

use std::{collections::BTreeMap, sync::Mutex};

use async_trait::async_trait;
use gourd_model::{CorrelationToken, OutboundMessage};
use gourd_upload::{ChannelError, MessageChannel, ObjectStore, PutRequest, StoreError};
use serde_json::Value;

/// Records sends and reports; deliveries are driven by the test.
#[derive(Default)]
pub(crate) struct RecordingChannel {
    pub sent: Mutex<Vec<(OutboundMessage, CorrelationToken)>>,
    pub reported: Mutex<Vec<BTreeMap<String, Value>>>,
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    fn send(&self, message: OutboundMessage, token: CorrelationToken) {
        self.sent.lock().unwrap().push((message, token));
    }

    async fn report(&self, properties: BTreeMap<String, Value>) -> Result<(), ChannelError> {
        self.reported.lock().unwrap().push(properties);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeStore {
    pub puts: Mutex<Vec<PutRequest>>,
}

impl FakeStore {
    pub fn keys(&self) -> Vec<String> {
        self.puts.lock().unwrap().iter().map(|p| p.key.clone()).collect()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put(&self, req: PutRequest) -> Result<(), StoreError> {
        self.puts.lock().unwrap().push(req);
        Ok(())
    }
}
