use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use gourd_core::ReconcileReport;
use gourd_model::{TaskInfo, UpdateKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{error::ApiError, handler::ApiHandler};

/// Reason recorded when a reboot request carries none.
const DEFAULT_REBOOT_REASON: &str = "Reboot requested via local API";

/// HTTP API service builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - GET /api/v1/config - Current configuration document
    /// - PUT /api/v1/config - Complete update (replaces the twin)
    /// - PATCH /api/v1/config - Partial update (merged into desired)
    /// - GET /api/v1/tasks - Running periodic tasks
    /// - POST /api/v1/reboot - Restart the device
    pub fn router(self) -> Router {
        Router::new()
            .route(
                "/api/v1/config",
                get(get_config::<H>)
                    .put(replace_config::<H>)
                    .patch(merge_config::<H>),
            )
            .route("/api/v1/tasks", get(list_tasks::<H>))
            .route("/api/v1/reboot", post(reboot::<H>))
            .with_state(self.handler)
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct ListTasksResponse {
    tasks: Vec<TaskInfo>,
    total: usize,
}

#[derive(Debug, Default, Deserialize)]
struct RebootRequest {
    #[serde(default)]
    reason: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/config
async fn get_config<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    Ok(Json(handler.config().await?))
}

/// PUT /api/v1/config
async fn replace_config<H>(
    State(handler): State<Arc<H>>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    update::<H>(&handler, UpdateKind::Complete, payload).await
}

/// PATCH /api/v1/config
async fn merge_config<H>(
    State(handler): State<Arc<H>>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    update::<H>(&handler, UpdateKind::Partial, payload).await
}

async fn update<H>(
    handler: &H,
    kind: UpdateKind,
    payload: Value,
) -> Result<Json<ReconcileReport>, ApiError>
where
    H: ApiHandler,
{
    if !payload.is_object() {
        return Err(ApiError::InvalidRequest(
            "configuration payload must be a JSON object".into(),
        ));
    }
    debug!(?kind, "applying configuration update");
    let report = handler.update_config(kind, payload).await?;
    Ok(Json(report))
}

/// GET /api/v1/tasks
async fn list_tasks<H>(State(handler): State<Arc<H>>) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let tasks = handler.tasks().await?;
    let response = ListTasksResponse {
        total: tasks.len(),
        tasks,
    };
    Ok(Json(response))
}

/// POST /api/v1/reboot
///
/// Body is optional: `{"reason": "..."}`.
async fn reboot<H>(State(handler): State<Arc<H>>, body: Bytes) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let req: RebootRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RebootRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?
    };
    let reason = req
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REBOOT_REASON.to_string());

    info!(%reason, "reboot requested");
    handler.reboot(reason).await?;
    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request},
    };
    use gourd_core::CoreError;
    use gourd_model::{ScheduleParams, TaskKind};
    use serde_json::json;
    use std::{sync::Mutex, time::SystemTime};
    use tower::ServiceExt;

    #[derive(Default)]
    struct FakeHandler {
        updates: Mutex<Vec<(UpdateKind, Value)>>,
        reboots: Mutex<Vec<String>>,
        shutting_down: bool,
    }

    #[async_trait]
    impl ApiHandler for FakeHandler {
        async fn config(&self) -> Result<Value, ApiError> {
            Ok(json!({"Twin": {"desired": {"SensorCaptureFrequency": 60}}}))
        }

        async fn update_config(
            &self,
            kind: UpdateKind,
            payload: Value,
        ) -> Result<ReconcileReport, ApiError> {
            if self.shutting_down {
                return Err(CoreError::ShuttingDown.into());
            }
            self.updates.lock().unwrap().push((kind, payload));
            Ok(ReconcileReport {
                stopped: vec![TaskKind::Sensor],
                started: vec![TaskKind::Sensor],
            })
        }

        async fn tasks(&self) -> Result<Vec<TaskInfo>, ApiError> {
            Ok(vec![TaskInfo::new(
                "t-1".into(),
                TaskKind::Watchdog,
                ScheduleParams::from_secs(15.0, 15.0),
                SystemTime::UNIX_EPOCH,
            )])
        }

        async fn reboot(&self, reason: String) -> Result<(), ApiError> {
            self.reboots.lock().unwrap().push(reason);
            Ok(())
        }
    }

    async fn call(
        handler: Arc<FakeHandler>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = HttpApi::new(handler)
            .router()
            .oneshot(req.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn get_config_returns_document() {
        let (status, body) = call(Arc::default(), Method::GET, "/api/v1/config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["Twin"]["desired"]["SensorCaptureFrequency"], 60);
    }

    #[tokio::test]
    async fn patch_is_partial_and_put_is_complete() {
        let handler = Arc::new(FakeHandler::default());
        let patch = json!({"SensorCaptureFrequency": 30});
        let (status, body) = call(
            handler.clone(),
            Method::PATCH,
            "/api/v1/config",
            Some(patch.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["started"], json!(["sensor"]));

        let put = json!({"desired": {}, "reported": {}});
        call(handler.clone(), Method::PUT, "/api/v1/config", Some(put.clone())).await;

        let updates = handler.updates.lock().unwrap();
        assert_eq!(updates[0], (UpdateKind::Partial, patch));
        assert_eq!(updates[1], (UpdateKind::Complete, put));
    }

    #[tokio::test]
    async fn non_object_payload_is_rejected() {
        let handler = Arc::new(FakeHandler::default());
        let (status, body) = call(
            handler.clone(),
            Method::PATCH,
            "/api/v1/config",
            Some(json!([1, 2])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(handler.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_while_shutting_down_is_unavailable() {
        let handler = Arc::new(FakeHandler {
            shutting_down: true,
            ..FakeHandler::default()
        });
        let (status, _) = call(handler, Method::PATCH, "/api/v1/config", Some(json!({}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn tasks_are_listed() {
        let (status, body) = call(Arc::default(), Method::GET, "/api/v1/tasks", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["tasks"][0]["kind"], "watchdog");
        assert_eq!(body["tasks"][0]["periodSecs"], 15.0);
    }

    #[tokio::test]
    async fn reboot_with_and_without_reason() {
        let handler = Arc::new(FakeHandler::default());
        let (status, _) = call(handler.clone(), Method::POST, "/api/v1/reboot", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        call(
            handler.clone(),
            Method::POST,
            "/api/v1/reboot",
            Some(json!({"reason": "maintenance"})),
        )
        .await;

        let reboots = handler.reboots.lock().unwrap();
        assert_eq!(*reboots, vec![DEFAULT_REBOOT_REASON.to_string(), "maintenance".into()]);
    }
}
