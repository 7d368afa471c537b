//! Generation backends: chat-completion style text generation.
//!
//! Callers receive free text and are responsible for locating any embedded
//! JSON; backends never interpret the reply.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopmate_core::config::BackendConfig;

use crate::error::ProviderError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// One role-tagged message in a completion request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A completion request: the message sequence plus optional sampling limits.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// The common system-instruction + user-prompt pair.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Content of the last user message, if any.
    pub fn user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
    }
}

/// A text generation backend bound to one model.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Human-readable label, used to tag merged recommendations.
    fn label(&self) -> &str;

    /// Run one completion and return the reply text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any backend exposing `POST {base_url}/chat/completions`.
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    label: String,
}

impl OpenAiCompatibleClient {
    pub fn new(config: &BackendConfig, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: api_key.into(),
            label: config.label.clone(),
        })
    }

    /// Build a client reading the API key from the configured environment variable.
    pub fn from_env(config: &BackendConfig) -> Result<Self, ProviderError> {
        let key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, key)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl GenerationBackend for OpenAiCompatibleClient {
    fn label(&self) -> &str {
        &self.label
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        tracing::debug!(
            backend = %self.label,
            model = %self.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status(status.as_u16(), truncate(&text, 200)));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Parse("reply has no message content".to_string()))
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = CompletionRequest::new("sys", "hello")
            .with_temperature(0.1)
            .with_max_tokens(100);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "system");
        assert_eq!(req.user_prompt(), Some("hello"));
        assert_eq!(req.temperature, Some(0.1));
        assert_eq!(req.max_tokens, Some(100));
    }

    #[test]
    fn test_body_omits_unset_options() {
        let messages = vec![ChatMessage::user("hi")];
        let body = ChatCompletionBody {
            model: "m",
            messages: &messages,
            temperature: None,
            max_tokens: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "m");
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let mut config = BackendConfig::default_primary();
        config.base_url = "http://localhost:9000/v1/".to_string();
        let client = OpenAiCompatibleClient::new(&config, "k").unwrap();
        assert_eq!(client.endpoint, "http://localhost:9000/v1/chat/completions");
        assert_eq!(client.label(), "OpenAI");
    }

    #[test]
    fn test_from_env_missing_key() {
        let mut config = BackendConfig::default_primary();
        config.api_key_env = "SHOPMATE_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        let err = OpenAiCompatibleClient::from_env(&config).err().unwrap();
        assert!(matches!(err, ProviderError::MissingApiKey(_)));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
