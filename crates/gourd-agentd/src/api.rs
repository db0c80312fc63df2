use std::sync::Arc;

use async_trait::async_trait;
use gourd_api::{ApiError, ApiHandler};
use gourd_core::ReconcileReport;
use gourd_model::{TaskInfo, UpdateKind};
use serde_json::Value;

use crate::agent::EdgeAgent;

/// Bridges the local API to the running agent.
pub struct AgentApi {
    agent: Arc<EdgeAgent>,
}

impl AgentApi {
    pub fn new(agent: Arc<EdgeAgent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl ApiHandler for AgentApi {
    async fn config(&self) -> Result<Value, ApiError> {
        Ok(self.agent.config().snapshot().to_value())
    }

    async fn update_config(
        &self,
        kind: UpdateKind,
        payload: Value,
    ) -> Result<ReconcileReport, ApiError> {
        Ok(self.agent.apply_update(kind, payload)?)
    }

    async fn tasks(&self) -> Result<Vec<TaskInfo>, ApiError> {
        Ok(self.agent.tasks())
    }

    /// Runs in the background; the request returns before the device goes down.
    async fn reboot(&self, reason: String) -> Result<(), ApiError> {
        let agent = self.agent.clone();
        tokio::spawn(async move { agent.restart(&reason).await });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::AgentParts,
        capture::CaptureCommands,
        testing::RecordingChannel,
    };
    use gourd_api::{
        HttpApi,
        axum::{
            body::{Body, to_bytes},
            http::{Request, StatusCode},
        },
    };
    use gourd_core::{ConfigDocument, ConfigStore, StorageSettings};
    use gourd_upload::ObjectStore;
    use serde_json::json;
    use tower::ServiceExt;

    fn agent() -> Arc<EdgeAgent> {
        let (_tx, rx) = tokio::sync::mpsc::unbounded_channel();
        EdgeAgent::new(AgentParts {
            data_dir: std::env::temp_dir().join("gourd-api-test"),
            config: ConfigStore::in_memory(ConfigDocument::new()),
            channel: Arc::new(RecordingChannel::default()),
            deliveries: rx,
            stores: Arc::new(|_: &StorageSettings| None::<Arc<dyn ObjectStore>>),
            codec: None,
            captures: CaptureCommands::default(),
            restart_cmd: "true".into(),
            logger: None,
        })
    }

    #[tokio::test]
    async fn patch_reaches_agent_and_reconciles() {
        let agent = agent();
        agent.start();

        let resp = HttpApi::new(Arc::new(AgentApi::new(agent.clone())))
            .router()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/api/v1/config")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({"VideoCaptureFrequency": 30}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value =
            serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["started"], json!(["video"]));

        let tasks = AgentApi::new(agent.clone()).tasks().await.unwrap();
        assert!(tasks.iter().any(|t| t.kind == gourd_model::TaskKind::Video));
        agent.stop();
    }

    #[tokio::test]
    async fn config_returns_live_document() {
        let agent = agent();
        agent.config().set("DeviceId", "nest-9").unwrap();
        let doc = AgentApi::new(agent).config().await.unwrap();
        assert_eq!(doc["DeviceId"], "nest-9");
    }
}
