//! Directory-backed mirror.
//!
//! Layout of the cache directory:
//!
//! ```text
//! extensions.json             {"data": [Extension, ...]}
//! <id>.tar.gz                 one archive per extension
//! latest_release.json         Version
//! latest_release_notes.json   ReleaseNotes
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{
    validate_extension_id, Extensions, MirrorError, MirrorSource, ReleaseNotes, Version, Wrapped,
};

const INDEX_FILE: &str = "extensions.json";
const RELEASE_FILE: &str = "latest_release.json";
const RELEASE_NOTES_FILE: &str = "latest_release_notes.json";

#[derive(Debug, Clone)]
pub struct LocalMirror {
    dir: PathBuf,
}

impl LocalMirror {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn archive_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.tar.gz"))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, MirrorError> {
        debug!(path = %path.display(), "reading mirror file");
        tokio::fs::read(path).await.map_err(|source| MirrorError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn read_json<T: DeserializeOwned>(&self, file: &str) -> Result<T, MirrorError> {
        let bytes = self.read(&self.dir.join(file)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write(&self, file: &str, bytes: &[u8]) -> Result<(), MirrorError> {
        let io_err = |source| MirrorError::Io {
            path: self.dir.join(file),
            source,
        };
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        tokio::fs::write(self.dir.join(file), bytes)
            .await
            .map_err(io_err)
    }

    async fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), MirrorError> {
        let json = serde_json::to_vec_pretty(value)?;
        self.write(file, &json).await
    }

    /// Stores the index as `extensions.json`, wrapped as the API serves it.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Io`] if the directory or file cannot be written.
    pub async fn store_extension_index(&self, extensions: &Extensions) -> Result<(), MirrorError> {
        self.write_json(INDEX_FILE, &Wrapped { data: extensions })
            .await
    }

    /// Stores the archive of extension `id`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::BadRequest`] for an unusable id, or
    /// [`MirrorError::Io`] if the file cannot be written.
    pub async fn store_extension_archive(
        &self,
        id: &str,
        archive: &[u8],
    ) -> Result<(), MirrorError> {
        validate_extension_id(id)?;
        self.write(&format!("{id}.tar.gz"), archive).await
    }

    /// Stores `latest_release.json`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Io`] if the file cannot be written.
    pub async fn store_latest_release(&self, version: &Version) -> Result<(), MirrorError> {
        self.write_json(RELEASE_FILE, version).await
    }

    /// Stores `latest_release_notes.json`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Io`] if the file cannot be written.
    pub async fn store_latest_release_notes(
        &self,
        notes: &ReleaseNotes,
    ) -> Result<(), MirrorError> {
        self.write_json(RELEASE_NOTES_FILE, notes).await
    }
}

#[async_trait]
impl MirrorSource for LocalMirror {
    async fn extension_index(&self) -> Result<Extensions, MirrorError> {
        let wrapped: Wrapped<Extensions> = self.read_json(INDEX_FILE).await?;
        Ok(wrapped.data)
    }

    async fn extension_archive(&self, id: &str) -> Result<Bytes, MirrorError> {
        validate_extension_id(id)?;
        Ok(Bytes::from(self.read(&self.archive_path(id)).await?))
    }

    async fn latest_release(&self) -> Result<Version, MirrorError> {
        self.read_json(RELEASE_FILE).await
    }

    async fn latest_release_notes(&self) -> Result<ReleaseNotes, MirrorError> {
        self.read_json(RELEASE_NOTES_FILE).await
    }
}
