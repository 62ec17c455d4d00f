//! RPC entry points: the `/rpc` redirect and the `/handle-rpc` upgrade.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, info};

use super::AppState;
use crate::rpc::{parse_identity, run_session, SessionContext, UpgradeError};

/// Path the editor is redirected to for the actual upgrade.
pub const UPGRADE_PATH: &str = "/handle-rpc";

/// Location the `/rpc` lookup points at: absolute under the public URL when
/// one is configured, otherwise relative.
#[must_use]
pub fn upgrade_location(public_url: Option<&str>) -> String {
    match public_url {
        Some(base) => format!("{}{UPGRADE_PATH}", base.trim_end_matches('/')),
        None => UPGRADE_PATH.to_string(),
    }
}

/// `GET /rpc`: the editor resolves its RPC URL here before connecting.
pub async fn rpc_redirect_handler(State(state): State<AppState>) -> Response {
    let location = upgrade_location(state.services.public_url.as_deref());
    (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response()
}

/// `GET /handle-rpc`: validates the caller identity, then upgrades.
///
/// # Errors
///
/// Rejects with [`UpgradeError`] before any connection is registered.
pub async fn rpc_upgrade_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, UpgradeError> {
    if !state.shutdown.is_accepting() {
        return Err(UpgradeError::ShuttingDown);
    }
    let identity = parse_identity(&headers).inspect_err(|e| {
        debug!(error = %e, "rejecting rpc upgrade");
    })?;

    let connection = state.config.connection.clone();
    let ctx = SessionContext {
        registry: Arc::clone(&state.registry),
        dispatcher: Arc::clone(&state.services.dispatcher),
        shutdown: Arc::clone(&state.shutdown),
        config: connection.clone(),
    };

    info!(identity, "accepting rpc upgrade");
    Ok(ws
        .max_message_size(connection.max_frame_size)
        .max_frame_size(connection.max_frame_size)
        .write_buffer_size(connection.ws_write_buffer_size)
        .max_write_buffer_size(connection.ws_max_write_buffer_size)
        .on_upgrade(move |socket| run_session(socket, identity, ctx)))
}
