//! Error types for biblio-gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use biblio_common::Error as ServiceError;
use serde::Serialize;

/// Gateway errors. The pipeline itself never fails; these cover request
/// validation and the session store.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl GatewayError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::Service(ServiceError::InvalidInput(message.into()))
    }

    /// Wrap a session store failure with what the gateway was doing.
    pub fn storage(context: &str, err: anyhow::Error) -> Self {
        Self::Service(ServiceError::Storage(format!("{err:#}")).with_context(context))
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Service(e) => service_code(e),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Service(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

fn service_code(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::WithContext { source, .. } => service_code(source),
        ServiceError::Storage(_) => "STORE_UNAVAILABLE",
        ServiceError::InvalidInput(_) => "INVALID_REQUEST",
    }
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "success": false,
            "error": ApiError {
                code: self.code().to_string(),
                message: self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
