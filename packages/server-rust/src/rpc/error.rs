use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use zedex_core::CodecError;

use crate::network::connection::SendError;

/// Rejection of an RPC upgrade request. No connection is created.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpgradeError {
    #[error("missing authorization header")]
    MissingAuthorization,

    #[error("authorization header must be \"<identity> <token>\"")]
    MalformedAuthorization,

    #[error("identity is not an integer: {0}")]
    InvalidIdentity(String),

    #[error("server is shutting down")]
    ShuttingDown,
}

impl IntoResponse for UpgradeError {
    fn into_response(self) -> Response {
        let status = match self {
            UpgradeError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::UNAUTHORIZED,
        };
        let body = serde_json::json!({
            "error": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Failure of one outbound send on an established session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("outbound queue stayed full past the send timeout")]
    Timeout,

    #[error("connection closed")]
    Disconnected,
}

impl From<SendError> for SessionError {
    fn from(err: SendError) -> Self {
        match err {
            SendError::Timeout => SessionError::Timeout,
            SendError::Disconnected => SessionError::Disconnected,
        }
    }
}
