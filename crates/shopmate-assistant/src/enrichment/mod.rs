//! Background detail enrichment: purchase links, review sources and a
//! consolidated summary for every recommended product.
//!
//! A job runs detached from the request that launched it. Its only output is
//! the session record, and every write is guarded by the job's generation so
//! a superseded job can never overwrite its successor.

pub mod phrase;
pub mod reviews;
pub mod shopping;
pub mod summarize;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;

use shopmate_core::config::EnrichmentConfig;
use shopmate_core::{BuyLink, Preferences, ProductDetail, Recommendation, SessionState, SourceReview};

use crate::backends::Collaborators;
use crate::error::EnrichmentError;
use crate::session::SessionStore;
use phrase::{extract_keywords, search_phrase, FollowUpContext};
use summarize::{summarize_all, SummaryInput};

/// Everything a job needs, snapshotted from the session at launch.
#[derive(Clone, Debug)]
pub struct EnrichmentJob {
    pub session_id: String,
    pub generation: u64,
    pub original_query: String,
    pub preferences: Preferences,
    /// Follow-ups that arrived before the one being answered.
    pub prior_followups: Vec<String>,
    /// The follow-up being answered; `None` for an initial turn.
    pub followup: Option<String>,
    pub recommendations: Vec<Recommendation>,
}

/// Stateless enrichment over the shared collaborators.
#[derive(Clone)]
pub struct EnrichmentPipeline {
    collaborators: Collaborators,
    config: EnrichmentConfig,
}

impl EnrichmentPipeline {
    pub fn new(collaborators: Collaborators, config: EnrichmentConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// One detail record per recommendation, in recommendation order.
    pub async fn enrich(&self, job: &EnrichmentJob) -> Vec<ProductDetail> {
        let keywords = match &job.followup {
            Some(current) => {
                let ctx = FollowUpContext {
                    original_query: &job.original_query,
                    preferences: &job.preferences,
                    prior_followups: &job.prior_followups,
                    current,
                };
                Some(extract_keywords(self.collaborators.primary.as_ref(), &ctx).await)
            }
            None => None,
        };

        let gathered = join_all(job.recommendations.iter().map(|rec| {
            let phrase = search_phrase(&rec.name, keywords.as_deref(), &job.original_query);
            async move { self.gather(&phrase).await }
        }))
        .await;

        let inputs: Vec<SummaryInput> = job
            .recommendations
            .iter()
            .zip(&gathered)
            .map(|(rec, (_, sources))| SummaryInput {
                review_content: reviews::combined_content(sources),
                pros: rec.pros.clone(),
                cons: rec.cons.clone(),
            })
            .collect();
        let summaries = summarize_all(
            self.collaborators.primary.as_ref(),
            &inputs,
            self.config.summary_batch_width,
        )
        .await;

        job.recommendations
            .iter()
            .zip(gathered)
            .zip(summaries)
            .map(|((rec, (buy_links, sources)), summary)| ProductDetail {
                name: rec.name.clone(),
                buy_links,
                reviews: vec![reviews::consolidate(
                    sources,
                    summary,
                    rec.pros.clone(),
                    rec.cons.clone(),
                )],
            })
            .collect()
    }

    /// Shopping and review lookups for one product, run concurrently.
    async fn gather(&self, phrase: &str) -> (Vec<BuyLink>, Vec<SourceReview>) {
        let c = &self.collaborators;
        tokio::join!(
            shopping::buy_links(c.shopping.as_ref(), phrase, self.config.max_buy_links),
            reviews::gather_reviews(
                c.web.as_ref(),
                c.fetcher.as_ref(),
                phrase,
                self.config.max_review_sources
            )
        )
    }
}

/// Run `job` against its session: DETAILING, then READY with the details,
/// or ERROR if the pipeline panics. Returns the number of detail records
/// written (0 when the job was superseded).
pub async fn run_job(
    store: Arc<SessionStore>,
    pipeline: EnrichmentPipeline,
    job: EnrichmentJob,
) -> Result<usize, EnrichmentError> {
    let id = job.session_id.clone();
    let generation = job.generation;

    let marked = store.update_for_job(&id, generation, |rec| {
        rec.transition(SessionState::Detailing)
    })?;
    match marked {
        None => return Ok(0),
        Some(Err(e)) => tracing::warn!(session_id = %id, error = %e, "Could not mark session detailing"),
        Some(Ok(())) => {}
    }
    tracing::info!(
        session_id = %id,
        generation,
        products = job.recommendations.len(),
        "Enrichment started"
    );

    match AssertUnwindSafe(pipeline.enrich(&job)).catch_unwind().await {
        Ok(details) => {
            let count = details.len();
            let written = store.update_for_job(&id, generation, move |rec| {
                rec.product_details = details;
                rec.transition(SessionState::Ready)
            })?;
            match written {
                None => Ok(0),
                Some(result) => {
                    if let Err(e) = result {
                        tracing::warn!(session_id = %id, error = %e, "Details stored without READY transition");
                    }
                    tracing::info!(session_id = %id, count, "Enrichment completed");
                    Ok(count)
                }
            }
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(session_id = %id, error = %message, "Enrichment job panicked");
            let marked =
                store.update_for_job(&id, generation, |rec| rec.transition(SessionState::Error))?;
            if let Some(Err(e)) = marked {
                tracing::warn!(session_id = %id, error = %e, "Could not mark session failed");
            }
            Err(EnrichmentError::Panicked(message))
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
