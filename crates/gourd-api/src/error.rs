use gourd_core::{ConfigError, CoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidPayload(msg) => ApiError::InvalidRequest(msg),
            other => ApiError::Core(other.into()),
        }
    }
}

#[cfg(feature = "http")]
mod response {
    use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use gourd_core::{ConfigError, CoreError};
    use serde::Serialize;
    use tracing::error;

    use super::ApiError;

    #[derive(Serialize)]
    struct ErrorBody {
        code: &'static str,
        message: String,
    }

    impl ApiError {
        fn status(&self) -> (StatusCode, &'static str) {
            match self {
                ApiError::InvalidRequest(_)
                | ApiError::Core(CoreError::Config(ConfigError::InvalidPayload(_))) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST")
                }
                ApiError::Core(CoreError::ShuttingDown) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "SHUTTING_DOWN")
                }
                ApiError::Core(_) | ApiError::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            }
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            let (status, code) = self.status();
            if status.is_server_error() {
                error!(error = %self, "api request failed");
            }
            let body = ErrorBody {
                code,
                message: self.to_string(),
            };
            (status, Json(body)).into_response()
        }
    }

}
