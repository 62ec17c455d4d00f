//! Upstream-backed mirror.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    validate_extension_id, Extensions, MirrorConfig, MirrorError, MirrorSource, ReleaseNotes,
    Version, Wrapped,
};

const MIN_WASM_API_VERSION: &str = "0.0.0";
const MAX_WASM_API_VERSION: &str = "100.0.0";

#[derive(Debug, Clone)]
pub struct RemoteMirror {
    client: reqwest::Client,
    api_host: String,
    site_host: String,
    max_schema_version: i64,
}

impl RemoteMirror {
    #[must_use]
    pub fn new(config: &MirrorConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            api_host: config.api_host.trim_end_matches('/').to_string(),
            site_host: config.site_host.trim_end_matches('/').to_string(),
            max_schema_version: config.max_schema_version,
        }
    }

    #[must_use]
    pub fn index_url(&self) -> String {
        format!(
            "{}/extensions?max_schema_version={}&include_native=true",
            self.api_host, self.max_schema_version
        )
    }

    #[must_use]
    pub fn archive_url(&self, id: &str) -> String {
        format!(
            "{}/extensions/{id}/download?min_schema_version=0&max_schema_version={}\
             &min_wasm_api_version={MIN_WASM_API_VERSION}&max_wasm_api_version={MAX_WASM_API_VERSION}",
            self.api_host, self.max_schema_version
        )
    }

    #[must_use]
    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/api/releases/latest?asset=zed&os={}&arch={}",
            self.site_host,
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }

    #[must_use]
    pub fn release_notes_url(&self, version: &str) -> String {
        format!("{}/api/release_notes/v2/stable/{version}", self.site_host)
    }

    async fn get(&self, url: String) -> Result<reqwest::Response, MirrorError> {
        debug!(%url, "fetching from upstream");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Upstream {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, MirrorError> {
        let bytes = self.get(url).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl MirrorSource for RemoteMirror {
    async fn extension_index(&self) -> Result<Extensions, MirrorError> {
        let wrapped: Wrapped<Extensions> = self.get_json(self.index_url()).await?;
        Ok(wrapped.data)
    }

    async fn extension_archive(&self, id: &str) -> Result<Bytes, MirrorError> {
        validate_extension_id(id)?;
        Ok(self.get(self.archive_url(id)).await?.bytes().await?)
    }

    async fn latest_release(&self) -> Result<Version, MirrorError> {
        self.get_json(self.latest_release_url()).await
    }

    async fn latest_release_notes(&self) -> Result<ReleaseNotes, MirrorError> {
        self.get_json(self.release_notes_url("")).await
    }
}
