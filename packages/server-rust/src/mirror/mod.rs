//! Extension registry and release mirrors.
//!
//! A [`MirrorSource`] answers index, archive, and release lookups either from
//! the upstream HTTP API ([`RemoteMirror`]) or from a directory populated
//! ahead of time ([`LocalMirror`]).

pub mod extension;
pub mod local;
pub mod release;
pub mod remote;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use thiserror::Error;

pub use extension::{Extension, Extensions, Wrapped};
pub use local::LocalMirror;
pub use release::{ReleaseNotes, Version};
pub use remote::RemoteMirror;

/// Schema version ceiling applied when a client does not send one.
pub const DEFAULT_MAX_SCHEMA_VERSION: i64 = 100;

/// Mirror configuration.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Upstream registry API, e.g. `https://api.zed.dev`.
    pub api_host: String,
    /// Upstream website, target of `/api/*` redirects and release lookups.
    pub site_host: String,
    /// Serve index, archives and releases from `cache_dir`.
    pub local_mode: bool,
    pub cache_dir: PathBuf,
    /// Schema version requested from the upstream index.
    pub max_schema_version: i64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            api_host: "https://api.zed.dev".to_string(),
            site_host: "https://zed.dev".to_string(),
            local_mode: false,
            cache_dir: PathBuf::from(".zedex-cache"),
            max_schema_version: 1,
        }
    }
}

impl MirrorConfig {
    /// Source selected by `local_mode`.
    #[must_use]
    pub fn source(&self, client: reqwest::Client) -> Arc<dyn MirrorSource> {
        if self.local_mode {
            Arc::new(LocalMirror::new(self.cache_dir.clone()))
        } else {
            Arc::new(RemoteMirror::new(self, client))
        }
    }
}

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream {url} responded with {status}")]
    Upstream { url: String, status: u16 },
}

impl IntoResponse for MirrorError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            MirrorError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad Request"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        };
        let body = serde_json::json!({
            "error": error,
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Where mirrored artifacts come from.
#[async_trait]
pub trait MirrorSource: Send + Sync {
    /// Full extension index, unfiltered.
    async fn extension_index(&self) -> Result<Extensions, MirrorError>;

    /// Archive (`.tar.gz`) of the extension `id`.
    async fn extension_archive(&self, id: &str) -> Result<Bytes, MirrorError>;

    async fn latest_release(&self) -> Result<Version, MirrorError>;

    async fn latest_release_notes(&self) -> Result<ReleaseNotes, MirrorError>;
}

/// Rejects ids that could escape a directory or a URL path segment.
///
/// # Errors
///
/// Returns [`MirrorError::BadRequest`] for empty ids or ids containing
/// anything other than ASCII alphanumerics, `-`, `_` and `.` (but not `..`).
pub fn validate_extension_id(id: &str) -> Result<(), MirrorError> {
    let valid = !id.is_empty()
        && !id.contains("..")
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(MirrorError::BadRequest(format!("invalid extension id: {id}")))
    }
}
