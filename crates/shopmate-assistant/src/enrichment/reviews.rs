//! Review sources and their consolidation into one review record.

use futures::future::join_all;

use shopmate_core::{ConsolidatedReview, SourceReview};
use shopmate_providers::{ContentFetcher, WebSearch};

pub const CONSOLIDATED_TITLE: &str = "Consolidated Product Review";
pub const CONSOLIDATED_SNIPPET: &str = "Consolidated from multiple sources";

/// Search `"<phrase> expert review"`, fetch the first `max` linked pages
/// concurrently, and keep each result paired with its own page text.
/// Pages that fetch empty are dropped. A failed search yields no sources.
pub async fn gather_reviews(
    web: &dyn WebSearch,
    fetcher: &dyn ContentFetcher,
    phrase: &str,
    max: usize,
) -> Vec<SourceReview> {
    let query = format!("{} expert review", phrase);
    let results = match web.organic(&query).await {
        Ok(results) => results,
        Err(e) => {
            tracing::warn!(query = %query, error = %e, "Review search failed");
            return Vec::new();
        }
    };

    let candidates: Vec<_> = results
        .into_iter()
        .take(max)
        .filter(|r| !r.link.trim().is_empty())
        .collect();
    let contents = join_all(candidates.iter().map(|r| fetcher.fetch_text(&r.link))).await;

    let sources: Vec<SourceReview> = candidates
        .into_iter()
        .zip(contents)
        .filter(|(_, content)| !content.is_empty())
        .map(|(r, content)| SourceReview {
            title: r.title,
            link: r.link,
            snippet: r.snippet,
            content,
        })
        .collect();

    tracing::debug!(query = %query, count = sources.len(), "Review sources fetched");
    sources
}

/// Text handed to the summarizer: every source joined by a blank line.
pub fn combined_content(sources: &[SourceReview]) -> String {
    sources
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The single review entry attached to a product detail.
pub fn consolidate(
    sources: Vec<SourceReview>,
    summary: String,
    pros: Vec<String>,
    cons: Vec<String>,
) -> ConsolidatedReview {
    ConsolidatedReview {
        title: CONSOLIDATED_TITLE.to_string(),
        link: sources.first().map(|s| s.link.clone()).unwrap_or_default(),
        snippet: CONSOLIDATED_SNIPPET.to_string(),
        content: combined_content(&sources),
        summary,
        pros,
        cons,
        individual_reviews: sources,
    }
}
