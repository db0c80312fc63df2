//! Test doubles shared by the upload tests.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use gourd_model::{CorrelationToken, OutboundMessage};
use serde_json::Value;
use std::collections::BTreeMap;
use wiremock::{MockServer, Request};

use crate::{ChannelError, MessageChannel, ObjectStore, PutRequest, StoreError};

/// Records every put; fails them all while `fail` is set.
#[derive(Default)]
pub(crate) struct FakeStore {
    pub puts: Mutex<Vec<PutRequest>>,
    pub fail: AtomicBool,
}

impl FakeStore {
    pub fn keys(&self) -> Vec<String> {
        self.puts.lock().unwrap().iter().map(|p| p.key.clone()).collect()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put(&self, req: PutRequest) -> Result<(), StoreError> {
        let key = req.key.clone();
        self.puts.lock().unwrap().push(req);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected { key, status: 503 });
        }
        Ok(())
    }
}

/// Records sends; deliveries are driven by the test.
#[derive(Default)]
pub(crate) struct FakeChannel {
    pub sent: Mutex<Vec<(OutboundMessage, CorrelationToken)>>,
    pub reported: Mutex<Vec<BTreeMap<String, Value>>>,
}

#[async_trait]
impl MessageChannel for FakeChannel {
    fn send(&self, message: OutboundMessage, token: CorrelationToken) {
        self.sent.lock().unwrap().push((message, token));
    }

    async fn report(&self, properties: BTreeMap<String, Value>) -> Result<(), ChannelError> {
        self.reported.lock().unwrap().push(properties);
        Ok(())
    }
}

/// The only request `server` has seen so far.
pub(crate) async fn single_request(server: &MockServer) -> Request {
    let mut received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1, "expected exactly one request");
    received.remove(0)
}
