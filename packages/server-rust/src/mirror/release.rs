//! Editor release metadata, passed through without interpretation beyond the
//! version string.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Latest-release record as served by `/api/releases/latest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub Value);

impl Version {
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.0.get("version").and_then(Value::as_str)
    }
}

/// Release notes as served by `/api/release_notes/v2/stable/...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseNotes(pub Value);

impl ReleaseNotes {
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.0.get("title").and_then(Value::as_str)
    }
}
