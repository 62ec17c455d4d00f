//! Edit-prediction proxy.
//!
//! The editor posts an excerpt with an editable region delimited by
//! [`EDITABLE_REGION_START`] and [`EDITABLE_REGION_END`]. Only the region is
//! sent to the completion backend; its rewritten region is spliced back into
//! the original excerpt. Results are cached by excerpt.

pub mod llm;

use std::fmt;
use std::sync::{Arc, LazyLock};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quick_cache::sync::Cache;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

pub use llm::{CompletionBackend, OpenAiCompatible};

pub const EDITABLE_REGION_START: &str = "<|editable_region_start|>";
pub const EDITABLE_REGION_END: &str = "<|editable_region_end|>";

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a code autocomplete engine.

RULES:
* Only respond with code (nothing else).
* YOU MUST INCLUDE ALL PLACEHOLDERS "<|editable_region_start|>" AND "<|editable_region_end|>" IN YOUR RESPONSE.
* YOU MAY ALTER ALL CODE CONTAINED WITHIN "<|editable_region_start|>" AND "<|editable_region_end|>".
* ALWAYS AUTO COMPLETE AS LITTLE AS POSSIBLE"#;

static REASONING_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)^<think>.*?</think>\s").ok());

#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub system_prompt: String,
    /// Upstream requests allowed in flight at once.
    pub max_concurrent_requests: usize,
    /// Cached predictions kept, keyed by excerpt.
    pub cache_capacity: usize,
    /// Answer every request with an empty prediction.
    pub disabled: bool,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_concurrent_requests: 1,
            cache_capacity: 1024,
            disabled: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("no API key configured for the completion endpoint")]
    MissingApiKey,

    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid completion response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server responded with {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("predictor is shutting down")]
    Closed,
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": "Internal Server Error",
            "message": self.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictEditsRequest {
    pub outline: String,
    pub input_events: String,
    pub input_excerpt: String,
    pub speculated_output: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictEditsResponse {
    pub request_id: String,
    pub output_excerpt: String,
}

impl PredictEditsResponse {
    fn new(output_excerpt: String) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            output_excerpt,
        }
    }
}

/// Editable region of `s` including both markers, or empty if either marker
/// is missing.
#[must_use]
pub fn extract_editable_region(s: &str) -> &str {
    match (s.find(EDITABLE_REGION_START), s.find(EDITABLE_REGION_END)) {
        (Some(start), Some(end)) if start <= end => &s[start..end + EDITABLE_REGION_END.len()],
        _ => "",
    }
}

/// Replaces the editable region of `original` (markers included) with
/// `replacement`. `original` is returned unchanged if a marker is missing.
#[must_use]
pub fn replace_editable_region(original: &str, replacement: &str) -> String {
    match (
        original.find(EDITABLE_REGION_START),
        original.find(EDITABLE_REGION_END),
    ) {
        (Some(start), Some(end)) if start <= end => {
            let tail = &original[end + EDITABLE_REGION_END.len()..];
            let mut out = String::with_capacity(start + replacement.len() + tail.len());
            out.push_str(&original[..start]);
            out.push_str(replacement);
            out.push_str(tail);
            out
        }
        _ => original.to_string(),
    }
}

/// Drops a leading `<think>...</think>` block and the whitespace after it.
#[must_use]
pub fn strip_reasoning_block(s: &str) -> String {
    match REASONING_BLOCK.as_ref() {
        Some(re) => re.replace(s, "").into_owned(),
        None => s.to_string(),
    }
}

/// Drops a Markdown fence around the completion and one leading space.
#[must_use]
pub fn strip_code_fence(s: &str) -> &str {
    let mut s = s;
    if let Some((first, rest)) = s.split_once('\n') {
        if first.starts_with("```") {
            s = rest;
        }
    }
    if let Some(body) = s.strip_suffix("```") {
        s = body.strip_suffix('\n').unwrap_or(body);
    }
    s.strip_prefix(' ').unwrap_or(s)
}

/// Cached, concurrency-limited front of a [`CompletionBackend`].
pub struct Predictor {
    backend: Arc<dyn CompletionBackend>,
    cache: Cache<String, String>,
    permits: Semaphore,
    disabled: bool,
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor")
            .field("cached", &self.cache.len())
            .field("available_permits", &self.permits.available_permits())
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

impl Predictor {
    #[must_use]
    pub fn new(backend: Arc<dyn CompletionBackend>, config: &PredictConfig) -> Self {
        Self {
            backend,
            cache: Cache::new(config.cache_capacity.max(1)),
            permits: Semaphore::new(config.max_concurrent_requests.max(1)),
            disabled: config.disabled,
        }
    }

    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Predicts the rewritten excerpt for `request`.
    ///
    /// The permit is held across the cache lookup, so a burst of identical
    /// requests reaches the backend once.
    ///
    /// # Errors
    ///
    /// Propagates backend failures. Failed predictions are not cached.
    pub async fn predict(
        &self,
        request: &PredictEditsRequest,
    ) -> Result<PredictEditsResponse, PredictError> {
        if self.disabled {
            return Ok(PredictEditsResponse::new(String::new()));
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| PredictError::Closed)?;

        if let Some(hit) = self.cache.get(&request.input_excerpt) {
            debug!("edit prediction cache hit");
            return Ok(PredictEditsResponse::new(hit));
        }

        let region = extract_editable_region(&request.input_excerpt);
        let completion = self.backend.complete(region).await?;

        let predicted = extract_editable_region(&completion);
        let spliced = replace_editable_region(&request.input_excerpt, predicted);
        let output = strip_code_fence(&strip_reasoning_block(&spliced)).to_string();
        debug!(output_len = output.len(), "edit prediction completed");

        self.cache
            .insert(request.input_excerpt.clone(), output.clone());
        Ok(PredictEditsResponse::new(output))
    }
}
