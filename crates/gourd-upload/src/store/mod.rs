use std::{collections::BTreeMap, path::PathBuf};

use async_trait::async_trait;

use crate::StoreError;

mod http;
pub use http::HttpObjectStore;

/// One object to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRequest {
    pub container: String,
    pub key: String,
    pub local_path: PathBuf,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
}

/// Destination for uploaded artifacts.
///
/// `put` returns only once the object is durably stored (or has failed); the
/// coordinator treats any error as transient and retries on a later tick.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, req: PutRequest) -> Result<(), StoreError>;
}
