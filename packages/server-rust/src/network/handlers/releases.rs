//! `/api/*` routes: release lookups served locally, everything else sent
//! upstream.

use axum::extract::State;
use axum::http::header::LOCATION;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::debug;

use super::AppState;
use crate::mirror::MirrorError;

const LATEST_RELEASE_PATH: &str = "/api/releases/latest";
const RELEASE_NOTES_PREFIX: &str = "/api/release_notes/v2/stable/";

/// Upstream location for `uri`, keeping path and query.
#[must_use]
pub fn upstream_location(site_host: &str, uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str());
    format!("{}{path_and_query}", site_host.trim_end_matches('/'))
}

/// `GET /api/{*path}`
pub async fn api_handler(State(state): State<AppState>, uri: Uri) -> Result<Response, MirrorError> {
    let mirror = &state.services.mirror;
    let config = &state.services.mirror_config;

    if config.local_mode {
        let path = uri.path();
        if path == LATEST_RELEASE_PATH {
            return Ok(Json(mirror.latest_release().await?).into_response());
        }
        if path.starts_with(RELEASE_NOTES_PREFIX) {
            return Ok(Json(mirror.latest_release_notes().await?).into_response());
        }
    }

    let location = upstream_location(&config.site_host, &uri);
    debug!(%location, "redirecting api request upstream");
    Ok((StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response())
}
