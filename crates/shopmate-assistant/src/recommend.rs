//! Recommendation generation across one or two generation backends.

use std::sync::Arc;

use shopmate_core::{ModelChoice, Preferences, RecommendationSet};
use shopmate_providers::{CompletionRequest, GenerationBackend, ProviderError};

use crate::extract::parse_structured;

pub const RECOMMENDATION_SYSTEM: &str = "You are a knowledgeable and engaging shopping assistant, acting as a personal researcher and advisor. Your goal is to analyze and present product recommendations in a clear, insightful, and conversational manner, like a helpful shopping guide reporting findings.";

/// Appended to every recommendation query.
pub const STRUCTURE_INSTRUCTION: &str = r#"
Structure your response as follows:

Overview: Give a first-person narrative of your analysis and findings of the products, focusing on their features, descriptions and rationales why this product is recommended. For example, you could begin with something like: "Great news! I've found several products that satisfy your requirements..."
{
    "overview": string,
    "recommendations": [
        {
            "name": string,
            "price": number,
            "features": string[],
            "pros": string[],
            "cons": string[],
            "description": "string explaining why this product is recommended"
        }
    ]
}"#;

const HYBRID_PREFIX: &str = "Based on recommendations from multiple AI models: ";
const HYBRID_DEFAULT_OVERVIEW: &str = "I've found several products that match your requirements.";

/// `<original>[ with preferences: <json>][. Additional requests: <f1>. <f2>]`
pub fn compose_query(original: &str, preferences: &Preferences, followups: &[String]) -> String {
    let mut query = original.to_string();
    if !preferences.is_empty() {
        query.push_str(" with preferences: ");
        query.push_str(&preferences.to_json());
    }
    if !followups.is_empty() {
        query.push_str(". Additional requests: ");
        query.push_str(&followups.join(". "));
    }
    query
}

/// Produces raw recommendation text from the configured backends.
pub struct RecommendationGenerator {
    primary: Arc<dyn GenerationBackend>,
    secondary: Arc<dyn GenerationBackend>,
}

impl RecommendationGenerator {
    pub fn new(primary: Arc<dyn GenerationBackend>, secondary: Arc<dyn GenerationBackend>) -> Self {
        Self { primary, secondary }
    }

    /// Raw reply text for `composed_query`. Backend call failures propagate.
    pub async fn generate(
        &self,
        composed_query: &str,
        choice: ModelChoice,
    ) -> Result<String, ProviderError> {
        let request = CompletionRequest::new(
            RECOMMENDATION_SYSTEM,
            format!("{}{}", composed_query, STRUCTURE_INSTRUCTION),
        );
        tracing::info!(model_choice = %choice, query = %composed_query, "Generating recommendations");

        match choice {
            ModelChoice::Primary => self.primary.complete(&request).await,
            ModelChoice::Secondary => self.secondary.complete(&request).await,
            ModelChoice::Hybrid => {
                let (primary, secondary) = tokio::join!(
                    self.primary.complete(&request),
                    self.secondary.complete(&request)
                );
                Ok(merge_hybrid(
                    &primary?,
                    self.primary.label(),
                    &secondary?,
                    self.secondary.label(),
                ))
            }
        }
    }
}

/// Merge two raw replies into one recommendation payload.
///
/// Primary-sourced items come first, each tagged with its backend label.
/// When one side cannot be parsed the other side's raw text is returned
/// untouched.
pub fn merge_hybrid(
    primary_raw: &str,
    primary_label: &str,
    secondary_raw: &str,
    secondary_label: &str,
) -> String {
    let primary = match parse_structured::<RecommendationSet>(primary_raw) {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!(backend = %primary_label, error = %e, "Hybrid: unusable reply, using the other backend");
            return secondary_raw.to_string();
        }
    };
    let secondary = match parse_structured::<RecommendationSet>(secondary_raw) {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!(backend = %secondary_label, error = %e, "Hybrid: unusable reply, using the other backend");
            return primary_raw.to_string();
        }
    };

    let overview = combined_overview(&primary.overview, &secondary.overview);
    let mut recommendations = Vec::new();
    for (set, label) in [(primary, primary_label), (secondary, secondary_label)] {
        recommendations.extend(set.recommendations.into_iter().map(|mut rec| {
            rec.source = Some(label.to_string());
            rec
        }));
    }

    let merged = RecommendationSet {
        overview,
        recommendations,
    };
    match serde_json::to_string(&merged) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "Hybrid merge failed, using secondary reply");
            secondary_raw.to_string()
        }
    }
}

/// Overview for merged output, built from whichever side has one.
pub fn combined_overview(primary: &str, secondary: &str) -> String {
    let base = [primary, secondary]
        .into_iter()
        .find(|o| !o.trim().is_empty());
    match base {
        Some(overview) => {
            let cleaned = overview
                .replace("Great news!", "")
                .replace("I've found", "I found");
            format!("{}{}", HYBRID_PREFIX, cleaned.trim_start())
        }
        None => format!("{}{}", HYBRID_PREFIX, HYBRID_DEFAULT_OVERVIEW),
    }
}
