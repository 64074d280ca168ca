use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Preflight conflict: duplicate tenant code or admin email. Raised
    /// before any resource exists, so there is nothing to compensate.
    #[error("conflict: {0}")]
    Conflict(String),
    /// A provisioning step failed after the catalog rows were written. By
    /// the time this surfaces the tenant is already `suspended` and its job
    /// `failed`; the message carries the step's error chain.
    #[error("provisioning failed: {0}")]
    Provisioning(String),
    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Provisioning(msg) => {
                tracing::error!("provisioning error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("provisioning failed: {msg}"),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".into(),
                )
            }
        };
        (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
    }
}
