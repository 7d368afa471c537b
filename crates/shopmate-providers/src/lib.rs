//! Clients for the external collaborators Shopmate talks to.
//!
//! Each collaborator is reached through a trait so the assistant can be
//! driven by in-process fakes in tests:
//!
//! - [`GenerationBackend`]: chat-completion style text generation.
//! - [`ShoppingSearch`] / [`WebSearch`]: commerce listings and organic web results.
//! - [`ContentFetcher`]: visible text of arbitrary web pages.

pub mod error;
pub mod fetch;
pub mod generation;
pub mod search;

pub use error::ProviderError;
pub use fetch::{html_to_text, ContentFetcher, HttpContentFetcher};
pub use generation::{ChatMessage, CompletionRequest, GenerationBackend, OpenAiCompatibleClient};
pub use search::{OrganicResult, SerperClient, ShoppingResult, ShoppingSearch, WebSearch};
