//! Commerce and web search backends.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopmate_core::config::SearchConfig;

use crate::error::ProviderError;
use crate::generation::truncate;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One commerce listing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShoppingResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub price: String,
    #[serde(default, rename = "imageUrl")]
    pub image_url: String,
}

/// One organic web search hit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// Text query to ordered purchase listings.
#[async_trait]
pub trait ShoppingSearch: Send + Sync {
    async fn shopping(&self, query: &str) -> Result<Vec<ShoppingResult>, ProviderError>;
}

/// Text query to ordered organic results.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn organic(&self, query: &str) -> Result<Vec<OrganicResult>, ProviderError>;
}

#[derive(Deserialize)]
struct ShoppingEnvelope {
    #[serde(default)]
    shopping: Vec<ShoppingResult>,
}

#[derive(Deserialize)]
struct OrganicEnvelope {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

/// Serper-style JSON search API (`/shopping` and `/search`).
pub struct SerperClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    organic_results: u32,
}

impl SerperClient {
    pub fn new(config: &SearchConfig, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            organic_results: config.organic_results,
        })
    }

    pub fn from_env(config: &SearchConfig) -> Result<Self, ProviderError> {
        let key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, key)
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("X-API-KEY", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status(status.as_u16(), truncate(&text, 200)));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ShoppingSearch for SerperClient {
    async fn shopping(&self, query: &str) -> Result<Vec<ShoppingResult>, ProviderError> {
        let envelope: ShoppingEnvelope =
            self.post("/shopping", serde_json::json!({ "q": query })).await?;
        tracing::debug!(query = %query, count = envelope.shopping.len(), "Shopping search");
        Ok(envelope.shopping)
    }
}

#[async_trait]
impl WebSearch for SerperClient {
    async fn organic(&self, query: &str) -> Result<Vec<OrganicResult>, ProviderError> {
        let envelope: OrganicEnvelope = self
            .post(
                "/search",
                serde_json::json!({ "q": query, "num": self.organic_results }),
            )
            .await?;
        tracing::debug!(query = %query, count = envelope.organic.len(), "Web search");
        Ok(envelope.organic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shopping_envelope_tolerates_missing_fields() {
        let envelope: ShoppingEnvelope = serde_json::from_str(
            r#"{"searchParameters": {}, "shopping": [{"title": "Shoe", "price": "$80.00"}]}"#,
        )
        .unwrap();
        assert_eq!(envelope.shopping.len(), 1);
        assert_eq!(envelope.shopping[0].price, "$80.00");
        assert_eq!(envelope.shopping[0].image_url, "");
    }

    #[test]
    fn test_organic_envelope_missing_key_is_empty() {
        let envelope: OrganicEnvelope = serde_json::from_str(r#"{"knowledgeGraph": {}}"#).unwrap();
        assert!(envelope.organic.is_empty());
    }
}
