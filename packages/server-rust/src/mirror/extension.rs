//! Extension registry records and index filtering.

use serde::{Deserialize, Serialize};

/// One entry of the extension registry index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Extension {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub authors: Vec<String>,
    pub repository: String,
    pub provides: Vec<String>,
    pub schema_version: i64,
    pub wasm_api_version: String,
    pub published_at: String,
    pub download_count: u64,
}

/// The `{"data": [...]}` wrapper the registry API puts around lists.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Wrapped<T> {
    pub data: T,
}

/// An extension index. Filters consume and return the index so they chain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions(pub Vec<Extension>);

impl Extensions {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn filter(self, keep: impl Fn(&Extension) -> bool) -> Self {
        Self(self.0.into_iter().filter(|e| keep(e)).collect())
    }

    /// Keeps extensions whose schema version is at most `max`.
    #[must_use]
    pub fn filter_max_schema_version(self, max: i64) -> Self {
        self.filter(|e| e.schema_version <= max)
    }

    /// Case-insensitive substring match against the extension's JSON form,
    /// so a query hits ids, names, descriptions, authors and so on.
    #[must_use]
    pub fn filter_text(self, query: &str) -> Self {
        let needle = query.to_lowercase();
        self.filter(|e| {
            serde_json::to_string(e)
                .map(|json| json.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
    }

    /// Keeps extensions that provide `kind` (e.g. `languages`, `themes`).
    #[must_use]
    pub fn filter_provides(self, kind: &str) -> Self {
        self.filter(|e| e.provides.iter().any(|p| p == kind))
    }

    /// Sorts in place by download count. Ties keep their relative order.
    pub fn sort_by_download_count(&mut self, ascending: bool) {
        if ascending {
            self.0.sort_by_key(|e| e.download_count);
        } else {
            self.0
                .sort_by(|a, b| b.download_count.cmp(&a.download_count));
        }
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<&Extension> {
        self.0.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn wrapped(self) -> Wrapped<Extensions> {
        Wrapped { data: self }
    }
}

impl From<Vec<Extension>> for Extensions {
    fn from(v: Vec<Extension>) -> Self {
        Self(v)
    }
}
