//! Chat-completion backends for edit prediction.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::PredictError;

/// Produces a completion for one user message.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, PredictError>;
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatResponseMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    /// Content of the last choice, or empty when there are none.
    #[must_use]
    pub fn last_content(&self) -> &str {
        self.choices
            .last()
            .map_or("", |choice| choice.message.content.as_str())
    }
}

/// Any endpoint speaking the OpenAI chat-completions dialect.
#[derive(Debug, Clone)]
pub struct OpenAiCompatible {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    system_prompt: String,
}

impl OpenAiCompatible {
    #[must_use]
    pub fn new(client: reqwest::Client, config: &super::PredictConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            system_prompt: config.system_prompt.clone(),
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatible {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, PredictError> {
        let api_key = self.api_key.as_deref().ok_or(PredictError::MissingApiKey)?;
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        };

        debug!(endpoint = %self.endpoint, prompt_len = prompt.len(), "sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != reqwest::StatusCode::OK {
            return Err(PredictError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        Ok(parsed.last_content().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_content_picks_final_choice() {
        let raw = r#"{
            "id": "c1",
            "object": "chat.completion",
            "model": "m",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "first"}},
                {"index": 1, "message": {"role": "assistant", "content": "second"}}
            ]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.last_content(), "second");
    }

    #[test]
    fn no_choices_is_empty() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(parsed.last_content(), "");
    }

    #[test]
    fn request_shape() {
        let request = ChatRequest {
            model: "llama",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
            temperature: 0.5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["temperature"], 0.5);
    }

    #[tokio::test]
    async fn missing_key_fails_before_sending() {
        let config = super::super::PredictConfig {
            api_key: None,
            ..super::super::PredictConfig::default()
        };
        let backend = OpenAiCompatible::new(reqwest::Client::new(), &config);
        assert!(matches!(
            backend.complete("x").await,
            Err(PredictError::MissingApiKey)
        ));
    }
}
