//! Query classification: is the query specific enough to recommend on?

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use shopmate_core::{Preferences, SessionState};
use shopmate_providers::{CompletionRequest, GenerationBackend};

use crate::extract::parse_structured;

pub const CLASSIFIER_SYSTEM: &str =
    "You are an AI that determines if shopping queries need clarification.";
pub const SPECIFICITY_SYSTEM: &str = "You determine if shopping queries are specific enough";

/// Outcome of analyzing a query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryVerdict {
    pub is_specific: bool,
    #[serde(default)]
    pub missing_info: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

impl QueryVerdict {
    /// Used whenever the backend reply cannot be understood.
    pub fn fallback(confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            is_specific: false,
            missing_info: vec!["details".to_string()],
            confidence,
            reasoning: reasoning.into(),
        }
    }

    pub fn next_state(&self) -> SessionState {
        if self.is_specific {
            SessionState::Querying
        } else {
            SessionState::Clarifying
        }
    }
}

/// `query` with accumulated preferences appended as JSON, if any.
pub fn enhanced_query(query: &str, preferences: &Preferences) -> String {
    if preferences.is_empty() {
        query.to_string()
    } else {
        format!("{} with preferences: {}", query, preferences.to_json())
    }
}

/// Judges query specificity with the primary backend.
pub struct QueryClassifier {
    backend: Arc<dyn GenerationBackend>,
}

impl QueryClassifier {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Full analysis. Never fails: unusable replies yield [`QueryVerdict::fallback`].
    pub async fn classify(&self, query: &str, preferences: &Preferences) -> QueryVerdict {
        let enhanced = enhanced_query(query, preferences);
        let prompt = format!(
            r#"Analyze this shopping query: "{enhanced}"

Determine:
1. Is this query specific enough to recommend products? (yes/no)
2. What crucial information is missing? (list specific missing details)
3. Your confidence in understanding the user's needs (0.0-1.0)

Format response as JSON:
{{
  "is_specific": true/false,
  "missing_info": ["budget", "use case", etc],
  "confidence": 0.75,
  "reasoning": "brief explanation of your analysis"
}}"#
        );
        let request = CompletionRequest::new(CLASSIFIER_SYSTEM, prompt).with_temperature(0.1);

        let verdict = match self.backend.complete(&request).await {
            Ok(raw) => match parse_structured::<QueryVerdict>(&raw) {
                Ok(verdict) => verdict,
                Err(e) => {
                    tracing::warn!(error = %e, "Classifier reply unusable, asking for details");
                    QueryVerdict::fallback(0.5, "Could not extract specific information needs")
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Classifier call failed, asking for details");
                QueryVerdict::fallback(0.0, format!("Query analysis failed: {}", e))
            }
        };

        tracing::info!(
            query = %enhanced,
            is_specific = verdict.is_specific,
            confidence = verdict.confidence,
            "Query analyzed"
        );
        verdict
    }

    /// Cheap YES/NO check used to stop clarifying early.
    ///
    /// A failed call counts as specific so the conversation is never stuck.
    pub async fn is_specific_enough(&self, query: &str, preferences: &Preferences) -> bool {
        let enhanced = enhanced_query(query, preferences);
        let prompt = format!(
            "Is this shopping query specific enough to provide good product recommendations?\nQuery: \"{}\"\n\nAnswer only with YES or NO.",
            enhanced
        );
        let request = CompletionRequest::new(SPECIFICITY_SYSTEM, prompt)
            .with_temperature(0.1)
            .with_max_tokens(5);

        match self.backend.complete(&request).await {
            Ok(answer) => {
                let specific = answer.to_lowercase().contains("yes");
                tracing::debug!(query = %enhanced, specific, "Specificity check");
                specific
            }
            Err(e) => {
                tracing::warn!(error = %e, "Specificity check failed, treating as specific");
                true
            }
        }
    }
}
