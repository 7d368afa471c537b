//! Review summaries, requested in bounded concurrent batches.

use futures::future::join_all;

use shopmate_providers::{CompletionRequest, GenerationBackend};

pub const SUMMARY_SYSTEM: &str = "You are a product review summarizer. Create a concise, balanced summary that combines the review content with the pros and cons.";
pub const SUMMARY_FALLBACK: &str = "Unable to generate summary.";

/// What one product's summary is built from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SummaryInput {
    pub review_content: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// One paragraph of at most 100 words, or [`SUMMARY_FALLBACK`] on failure.
pub async fn summarize(backend: &dyn GenerationBackend, input: &SummaryInput) -> String {
    let prompt = format!(
        "Please summarize the following product information into a single paragraph (max 100 words), Don't include any citation number annotations:\n\nReview Content: {}\n\nPros: {}\nCons: {}\n\nFocus on the most important points and maintain a balanced perspective.",
        input.review_content,
        input.pros.join(", "),
        input.cons.join(", ")
    );
    let request = CompletionRequest::new(SUMMARY_SYSTEM, prompt).with_temperature(0.1);

    match backend.complete(&request).await {
        Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
        Ok(_) => SUMMARY_FALLBACK.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Summary generation failed");
            SUMMARY_FALLBACK.to_string()
        }
    }
}

/// Summaries for every input, index-aligned with `inputs`.
///
/// At most `batch_width` requests are outstanding at once; one failure never
/// affects its siblings.
pub async fn summarize_all(
    backend: &dyn GenerationBackend,
    inputs: &[SummaryInput],
    batch_width: usize,
) -> Vec<String> {
    let width = batch_width.max(1);
    let mut summaries = Vec::with_capacity(inputs.len());
    for (batch_index, batch) in inputs.chunks(width).enumerate() {
        tracing::debug!(batch = batch_index, size = batch.len(), "Summarizing batch");
        summaries.extend(join_all(batch.iter().map(|input| summarize(backend, input))).await);
    }
    summaries
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::testing::ScriptedBackend;
    use shopmate_providers::ProviderError;

    fn input(content: &str) -> SummaryInput {
        SummaryInput {
            review_content: content.to_string(),
            pros: vec!["light".to_string()],
            cons: vec!["narrow".to_string()],
        }
    }

    #[tokio::test]
    async fn test_summary_prompt_and_temperature() {
        let backend = ScriptedBackend::replying("primary", "  A balanced take.  ");
        let summary = summarize(&backend, &input("Great shoe")).await;
        assert_eq!(summary, "A balanced take.");

        let request = &backend.calls()[0];
        assert_eq!(request.temperature, Some(0.1));
        let prompt = request.user_prompt().unwrap();
        assert!(prompt.contains("Review Content: Great shoe"));
        assert!(prompt.contains("Pros: light\nCons: narrow"));
    }

    #[tokio::test]
    async fn test_failure_yields_fallback_without_affecting_siblings() {
        let backend = ScriptedBackend::new("primary", |req| {
            let prompt = req.user_prompt().unwrap_or("");
            if prompt.contains("Review Content: bad") {
                Err(ProviderError::Timeout)
            } else {
                Ok("ok".to_string())
            }
        });
        let inputs = vec![input("good"), input("bad"), input("good")];
        let summaries = summarize_all(&backend, &inputs, 5).await;
        assert_eq!(summaries, vec!["ok", SUMMARY_FALLBACK, "ok"]);
    }

    #[tokio::test]
    async fn test_results_stay_index_aligned_across_batches() {
        let backend = ScriptedBackend::new("primary", |req| {
            let prompt = req.user_prompt().unwrap_or("");
            let start = prompt.find("Review Content: ").map(|i| i + 16).unwrap_or(0);
            let tag: String = prompt[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
            Ok(format!("summary {}", tag))
        });
        let inputs: Vec<SummaryInput> = (0..12).map(|i| input(&i.to_string())).collect();
        let summaries = summarize_all(&backend, &inputs, 5).await;
        let expected: Vec<String> = (0..12).map(|i| format!("summary {}", i)).collect();
        assert_eq!(summaries, expected);
        assert_eq!(backend.calls().len(), 12);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();
        let backend = ScriptedBackend::new("primary", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok("x".to_string())
        });
        assert!(summarize_all(&backend, &[], 5).await.is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
