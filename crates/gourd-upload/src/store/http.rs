use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Body, Client,
    header::{CONTENT_LENGTH, CONTENT_TYPE},
};
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument};

use crate::{ObjectStore, PutRequest, StoreError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Object store speaking plain HTTP `PUT {endpoint}/{container}/{key}`.
///
/// The file is streamed from disk; metadata travels as `x-amz-meta-*`
/// headers and the storage account name/key as basic auth.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
    account_name: String,
    account_key: String,
}

impl HttpObjectStore {
    pub fn new(
        endpoint: impl Into<String>,
        account_name: impl Into<String>,
        account_key: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            account_name: account_name.into(),
            account_key: account_key.into(),
        })
    }

    fn url(&self, container: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, container, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    #[instrument(skip_all, fields(key = %req.key, container = %req.container))]
    async fn put(&self, req: PutRequest) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: req.local_path.clone(),
            source,
        };
        let file = tokio::fs::File::open(&req.local_path).await.map_err(io_err)?;
        let len = file.metadata().await.map_err(io_err)?.len();

        let mut request = self
            .client
            .put(self.url(&req.container, &req.key))
            .basic_auth(&self.account_name, Some(&self.account_key))
            .header(CONTENT_TYPE, &req.content_type)
            .header(CONTENT_LENGTH, len)
            .body(Body::wrap_stream(ReaderStream::new(file)));
        for (name, value) in &req.metadata {
            request = request.header(format!("x-amz-meta-{name}"), value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected {
                key: req.key,
                status: status.as_u16(),
            });
        }
        debug!(bytes = len, "object stored");
        Ok(())
    }
}
