//! Extension registry mirror routes.

use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use super::AppState;
use crate::mirror::{Extensions, MirrorError, Wrapped, DEFAULT_MAX_SCHEMA_VERSION};

#[derive(Debug, Default, Deserialize)]
pub struct ExtensionsQuery {
    pub max_schema_version: Option<String>,
    pub filter: Option<String>,
    pub provides: Option<String>,
}

impl ExtensionsQuery {
    /// Applies the query's filters to `extensions`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::BadRequest`] if `max_schema_version` is not an
    /// integer.
    pub fn apply(&self, extensions: Extensions) -> Result<Extensions, MirrorError> {
        let max_schema_version = match self.max_schema_version.as_deref() {
            None => DEFAULT_MAX_SCHEMA_VERSION,
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                MirrorError::BadRequest("max_schema_version must be an integer".to_string())
            })?,
        };

        let mut extensions = extensions.filter_max_schema_version(max_schema_version);
        if let Some(text) = self.filter.as_deref().filter(|s| !s.is_empty()) {
            extensions = extensions.filter_text(text);
        }
        if let Some(kind) = self.provides.as_deref().filter(|s| !s.is_empty()) {
            extensions = extensions.filter_provides(kind);
        }
        Ok(extensions)
    }
}

/// `GET /extensions`
pub async fn list_extensions_handler(
    State(state): State<AppState>,
    Query(query): Query<ExtensionsQuery>,
) -> Result<Json<Wrapped<Extensions>>, MirrorError> {
    let index = state.services.mirror.extension_index().await?;
    let filtered = query.apply(index)?;
    debug!(count = filtered.len(), "serving extension index");
    Ok(Json(filtered.wrapped()))
}

async fn archive_response(state: &AppState, id: &str) -> Result<Response, MirrorError> {
    let archive = state.services.mirror.extension_archive(id).await?;
    debug!(id, bytes = archive.len(), "serving extension archive");
    Ok(([(CONTENT_TYPE, "application/octet-stream")], archive).into_response())
}

/// `GET /extensions/{id}/download`
pub async fn download_extension_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, MirrorError> {
    archive_response(&state, &id).await
}

/// `GET /extensions/{id}/{version}/download`. The version is ignored; the
/// mirror holds one archive per extension.
pub async fn download_extension_version_handler(
    State(state): State<AppState>,
    Path((id, _version)): Path<(String, String)>,
) -> Result<Response, MirrorError> {
    archive_response(&state, &id).await
}
