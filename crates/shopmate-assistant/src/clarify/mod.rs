//! Clarification: questions for missing categories, and preference
//! extraction from the user's answers.

pub mod patterns;
pub mod questions;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use shopmate_core::Preferences;
use shopmate_providers::{CompletionRequest, GenerationBackend};

use crate::extract::parse_structured;
use patterns::PreferencePatterns;

pub use questions::{clarification_reply, default_questions, generate_questions, QuestionSet};

pub const PREFERENCE_SYSTEM: &str = "You extract product preferences from user messages";

/// Extracts preferences from clarification answers.
pub struct ClarificationEngine {
    patterns: PreferencePatterns,
    extractor: Arc<dyn GenerationBackend>,
}

impl ClarificationEngine {
    pub fn new(extractor: Arc<dyn GenerationBackend>) -> Self {
        Self {
            patterns: PreferencePatterns::new(),
            extractor,
        }
    }

    /// Pattern match first; ask the extractor backend only when the
    /// patterns find nothing.
    pub async fn extract_preferences(&self, message: &str, missing_info: &[String]) -> Preferences {
        let found = self.patterns.extract(message, missing_info);
        if !found.is_empty() {
            return found;
        }
        self.extract_with_backend(message, missing_info).await
    }

    /// Generative extraction. Any category name is accepted; failures yield
    /// an empty map.
    pub async fn extract_with_backend(&self, message: &str, missing_info: &[String]) -> Preferences {
        let prompt = format!(
            r#"Extract product preferences from this user message.

The user is shopping for products and was asked about these details: {asked}

User message: "{message}"

Extract ONLY clearly expressed preferences in the user message.
Return a JSON object with category-value pairs. Use standard category names like Color, Size, Brand, Budget, etc.
If no preferences are found, return an empty object.

Example response format:
{{
  "Color": "White",
  "Brand": "Nike"
}}"#,
            asked = missing_info.join(", "),
        );
        let request = CompletionRequest::new(PREFERENCE_SYSTEM, prompt).with_temperature(0.1);

        match self.extractor.complete(&request).await {
            Ok(raw) => match parse_structured::<BTreeMap<String, Value>>(&raw) {
                Ok(map) => {
                    let prefs = Preferences::from(map);
                    tracing::debug!(count = prefs.len(), "Backend-extracted preferences");
                    prefs
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Preference reply unusable");
                    Preferences::new()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Preference extraction failed");
                Preferences::new()
            }
        }
    }
}
