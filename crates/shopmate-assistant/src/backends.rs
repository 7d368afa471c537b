//! The external collaborators a turn can reach, bundled for sharing.

use std::sync::Arc;

use shopmate_core::ModelChoice;
use shopmate_providers::{ContentFetcher, GenerationBackend, ShoppingSearch, WebSearch};

/// Trait objects for every collaborator, cheap to clone into background jobs.
#[derive(Clone)]
pub struct Collaborators {
    /// Classification, preference extraction, keywords and summaries.
    pub primary: Arc<dyn GenerationBackend>,
    pub secondary: Arc<dyn GenerationBackend>,
    pub shopping: Arc<dyn ShoppingSearch>,
    pub web: Arc<dyn WebSearch>,
    pub fetcher: Arc<dyn ContentFetcher>,
}

impl Collaborators {
    /// Backend that writes clarification questions for a model choice.
    pub fn question_backend(&self, choice: ModelChoice) -> &Arc<dyn GenerationBackend> {
        match choice {
            ModelChoice::Primary => &self.primary,
            ModelChoice::Secondary | ModelChoice::Hybrid => &self.secondary,
        }
    }
}
