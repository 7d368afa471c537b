//! Search phrases for a product's shopping and review lookups.

use shopmate_core::Preferences;
use shopmate_providers::{CompletionRequest, GenerationBackend};

pub const KEYWORD_SYSTEM: &str = "You are a keyword extraction specialist who maintains context continuity across multiple follow-up questions. You avoid extracting brand names and price information.";

/// Preference categories never used as search keywords.
const EXCLUDED_CATEGORIES: [&str; 3] = ["brand", "price", "budget"];

/// Everything known about the conversation when a follow-up arrives.
#[derive(Clone, Copy, Debug)]
pub struct FollowUpContext<'a> {
    pub original_query: &'a str,
    pub preferences: &'a Preferences,
    pub prior_followups: &'a [String],
    pub current: &'a str,
}

/// Distill search keywords from the whole conversation, excluding brand and
/// price terms. Falls back to a plain concatenation when the backend fails.
pub async fn extract_keywords(backend: &dyn GenerationBackend, ctx: &FollowUpContext<'_>) -> String {
    let mut context = format!("Original product search: \"{}\"\n", ctx.original_query);
    if !ctx.preferences.is_empty() {
        let prefs: Vec<String> = ctx
            .preferences
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        context.push_str(&format!("User preferences: {}\n", prefs.join(", ")));
    }
    if !ctx.prior_followups.is_empty() {
        let prior: Vec<String> = ctx
            .prior_followups
            .iter()
            .map(|f| format!("\"{}\"", f))
            .collect();
        context.push_str(&format!("Previous follow-up questions: {}\n", prior.join(", ")));
    }
    context.push_str(&format!("Current follow-up question: \"{}\"\n", ctx.current));

    let prompt = format!(
        r#"Extract the most important product-related keywords from this follow-up question.
Consider ALL context provided below, including the original query, existing preferences, and all previous follow-up questions.
Only include terms that would help refine a product search.

IMPORTANT: DO NOT include brand names or price/budget information in your extracted keywords.

Focus on attributes like color, size, features, use case, material, style, purpose, etc.
Keywords must comprehensively reflect relevant user requirements, including both current and previously mentioned attributes.
Format as a comma-separated list of 3-5 key terms.

{context}
Complete keywords (excluding brands and price/budget terms):"#
    );
    let request = CompletionRequest::new(KEYWORD_SYSTEM, prompt).with_max_tokens(100);

    match backend.complete(&request).await {
        Ok(reply) if !reply.trim().is_empty() => {
            let keywords = reply.trim().to_string();
            tracing::debug!(keywords = %keywords, "Extracted follow-up keywords");
            keywords
        }
        Ok(_) => {
            tracing::warn!("Keyword extraction returned nothing, using raw context");
            fallback_keywords(ctx)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Keyword extraction failed, using raw context");
            fallback_keywords(ctx)
        }
    }
}

/// Original query, non-brand/non-price preference values, then the follow-up.
pub fn fallback_keywords(ctx: &FollowUpContext<'_>) -> String {
    let mut parts = vec![ctx.original_query.to_string()];
    let values: Vec<&str> = ctx
        .preferences
        .iter()
        .filter(|(k, _)| !EXCLUDED_CATEGORIES.contains(k))
        .map(|(_, v)| v)
        .collect();
    if !values.is_empty() {
        parts.push(values.join(" "));
    }
    parts.push(ctx.current.to_string());
    parts.join(" ")
}

/// `"<name> <keywords>"` for follow-ups, `"<name> (<original query>)"` otherwise.
pub fn search_phrase(product_name: &str, keywords: Option<&str>, original_query: &str) -> String {
    match keywords {
        Some(k) if !k.trim().is_empty() => format!("{} {}", product_name, k.trim()),
        _ => format!("{} ({})", product_name, original_query),
    }
}
