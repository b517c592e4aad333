use http::StatusCode;
use spin_sdk::http::Response;
use thiserror::Error;

use crate::core::helpers::json_response;

pub const UNAUTHORIZED_MESSAGE: &str = "You are not authorized to access this route";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message exposed to clients. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::InternalError(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Central error formatter: every failure leaves the service as
/// `{"success": false, "message": ...}`.
impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %err, "request rejected");
        }

        json_response(
            status.as_u16(),
            &serde_json::json!({
                "success": false,
                "message": err.public_message(),
            }),
        )
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
