//! In-process fakes for every collaborator trait.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use shopmate_providers::{
    CompletionRequest, ContentFetcher, GenerationBackend, OrganicResult, ProviderError,
    ShoppingResult, ShoppingSearch, WebSearch,
};

use crate::backends::Collaborators;

type Handler = dyn Fn(&CompletionRequest) -> Result<String, ProviderError> + Send + Sync;

/// Generation backend answering through a closure and recording every request.
pub struct ScriptedBackend {
    label: String,
    handler: Box<Handler>,
    calls: Mutex<Vec<CompletionRequest>>,
    stall_on: Mutex<Option<String>>,
}

impl ScriptedBackend {
    pub fn new(
        label: &str,
        handler: impl Fn(&CompletionRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.to_string(),
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            stall_on: Mutex::new(None),
        }
    }

    /// Always replies with `text`.
    pub fn replying(label: &str, text: &str) -> Self {
        let text = text.to_string();
        Self::new(label, move |_| Ok(text.clone()))
    }

    /// Always fails with a 500 status.
    pub fn failing(label: &str) -> Self {
        Self::new(label, |_| {
            Err(ProviderError::Status(500, "scripted failure".to_string()))
        })
    }

    /// Never answer the next request whose system instruction is `system`.
    pub fn stall_once_on(&self, system: &str) {
        if let Ok(mut stall) = self.stall_on.lock() {
            *stall = Some(system.to_string());
        }
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Requests whose system instruction equals `system`.
    pub fn calls_with_system(&self, system: &str) -> Vec<CompletionRequest> {
        self.calls()
            .into_iter()
            .filter(|r| system_prompt(r) == Some(system))
            .collect()
    }
}

/// System instruction of a request, if it has one.
pub fn system_prompt(request: &CompletionRequest) -> Option<&str> {
    request
        .messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.as_str())
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn label(&self) -> &str {
        &self.label
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        let stalls = match self.stall_on.lock() {
            Ok(mut stall) if stall.as_deref().is_some() && stall.as_deref() == system_prompt(request) => {
                stall.take().is_some()
            }
            _ => false,
        };
        if stalls {
            std::future::pending::<()>().await;
        }
        (self.handler)(request)
    }
}

/// Commerce search returning a fixed list, or failing.
#[derive(Default)]
pub struct FakeShopping {
    pub results: Vec<ShoppingResult>,
    pub fail: bool,
    queries: Mutex<Vec<String>>,
}

impl FakeShopping {
    pub fn with_results(results: Vec<ShoppingResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ShoppingSearch for FakeShopping {
    async fn shopping(&self, query: &str) -> Result<Vec<ShoppingResult>, ProviderError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        if self.fail {
            return Err(ProviderError::Http("shopping unavailable".to_string()));
        }
        Ok(self.results.clone())
    }
}

/// Web search returning a fixed list, or failing.
#[derive(Default)]
pub struct FakeWebSearch {
    pub results: Vec<OrganicResult>,
    pub fail: bool,
    queries: Mutex<Vec<String>>,
}

impl FakeWebSearch {
    pub fn with_results(results: Vec<OrganicResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl WebSearch for FakeWebSearch {
    async fn organic(&self, query: &str) -> Result<Vec<OrganicResult>, ProviderError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        if self.fail {
            return Err(ProviderError::Http("search unavailable".to_string()));
        }
        Ok(self.results.clone())
    }
}

/// Content fetcher serving pages from a map; unknown URLs yield "".
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
}

impl FakeFetcher {
    pub fn with_pages<K: Into<String>, V: Into<String>>(
        pages: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch_text(&self, url: &str) -> String {
        self.pages.get(url).cloned().unwrap_or_default()
    }
}

pub fn shopping_result(title: &str, price: &str) -> ShoppingResult {
    ShoppingResult {
        title: title.to_string(),
        link: format!("https://shop.example/{}", title.replace(' ', "-").to_lowercase()),
        price: price.to_string(),
        image_url: format!("https://img.example/{}.png", title.len()),
    }
}

pub fn organic_result(title: &str, link: &str) -> OrganicResult {
    OrganicResult {
        title: title.to_string(),
        link: link.to_string(),
        snippet: format!("{} snippet", title),
    }
}

/// Collaborators built from fakes; search and fetch are empty unless replaced.
pub fn collaborators(
    primary: Arc<dyn GenerationBackend>,
    secondary: Arc<dyn GenerationBackend>,
) -> Collaborators {
    Collaborators {
        primary,
        secondary,
        shopping: Arc::new(FakeShopping::default()),
        web: Arc::new(FakeWebSearch::default()),
        fetcher: Arc::new(FakeFetcher::default()),
    }
}
