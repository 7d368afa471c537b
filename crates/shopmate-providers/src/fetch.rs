//! Review page fetching and visible-text extraction.

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use shopmate_core::config::FetchConfig;

use crate::error::ProviderError;

/// Elements whose text is never visible.
const HIDDEN_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

/// Fetches the visible text of a web page.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Returns an empty string on any failure; never errors.
    async fn fetch_text(&self, url: &str) -> String;
}

/// Plain GET fetcher with a browser User-Agent.
pub struct HttpContentFetcher {
    http: reqwest::Client,
    overall_timeout: Duration,
}

impl HttpContentFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(Self {
            http,
            overall_timeout: Duration::from_secs(config.overall_timeout_secs),
        })
    }

    async fn fetch_html(&self, url: &str) -> Result<String, ProviderError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("").to_string(),
            ));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch_text(&self, url: &str) -> String {
        match tokio::time::timeout(self.overall_timeout, self.fetch_html(url)).await {
            Ok(Ok(html)) => {
                let text = html_to_text(&html);
                tracing::debug!(url = %url, chars = text.len(), "Fetched review page");
                text
            }
            Ok(Err(e)) => {
                tracing::warn!(url = %url, error = %e, "Review page fetch failed");
                String::new()
            }
            Err(_) => {
                tracing::warn!(url = %url, "Review page fetch timed out");
                String::new()
            }
        }
    }
}

/// Visible text of an HTML document: every text node outside
/// script/style/noscript, trimmed, empties dropped, joined by single spaces.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();

    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_strips_hidden_elements() {
        let html = r#"<html><head><title>Review</title><style>.a { color: red; }</style>
            <script>var tracking = 1;</script></head>
            <body><h1>  Pegasus 41  </h1><noscript>Enable JS</noscript>
            <p>Great cushioning.</p>
            <div>   </div><p>Runs small.</p></body></html>"#;
        assert_eq!(
            html_to_text(html),
            "Review Pegasus 41 Great cushioning. Runs small."
        );
    }

    #[test]
    fn test_html_to_text_nested_inline_elements() {
        let html = "<body><p>Battery <b>lasts</b> all day</p></body>";
        assert_eq!(html_to_text(html), "Battery lasts all day");
    }

    #[test]
    fn test_html_to_text_empty_document() {
        assert_eq!(html_to_text(""), "");
        assert_eq!(html_to_text("<script>only()</script>"), "");
    }
}
