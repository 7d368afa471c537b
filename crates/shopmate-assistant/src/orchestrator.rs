//! Turn orchestrator: routes each inbound message by session state and owns
//! the background enrichment jobs.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use shopmate_core::config::{SessionConfig, ShopmateConfig};
use shopmate_core::{ModelChoice, Preferences, ProductDetail, RecommendationSet, SessionState};

use crate::backends::Collaborators;
use crate::clarify::{clarification_reply, generate_questions, ClarificationEngine};
use crate::classifier::{QueryClassifier, QueryVerdict};
use crate::enrichment::{run_job, EnrichmentJob, EnrichmentPipeline};
use crate::error::AssistantError;
use crate::extract::parse_structured;
use crate::recommend::{compose_query, RecommendationGenerator};
use crate::session::{SessionRecord, SessionStore};
use crate::state_machine::validate_transition;

/// Maximum message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// One inbound chat message.
#[derive(Clone, Debug, Default)]
pub struct TurnRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub preferences: Option<Preferences>,
    pub model_choice: Option<ModelChoice>,
}

/// The immediate reply to a turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReply {
    pub reply: String,
    pub session_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailStatus {
    Processing,
    Completed,
}

/// Answer to a product-details poll.
#[derive(Clone, Debug, Serialize)]
pub struct DetailsReport {
    pub status: DetailStatus,
    pub state: SessionState,
    pub message: String,
    pub product_details: Vec<ProductDetail>,
}

/// Central coordinator wiring classifier, clarification, recommendation and
/// enrichment around the session store.
pub struct ShoppingAssistant {
    store: Arc<SessionStore>,
    collaborators: Collaborators,
    classifier: QueryClassifier,
    clarifier: ClarificationEngine,
    generator: RecommendationGenerator,
    pipeline: EnrichmentPipeline,
    policy: SessionConfig,
}

impl ShoppingAssistant {
    pub fn new(collaborators: Collaborators, config: &ShopmateConfig) -> Self {
        let ttl = Duration::from_secs(config.session.ttl_minutes.saturating_mul(60));
        Self {
            store: Arc::new(SessionStore::new(ttl)),
            classifier: QueryClassifier::new(collaborators.primary.clone()),
            clarifier: ClarificationEngine::new(collaborators.primary.clone()),
            generator: RecommendationGenerator::new(
                collaborators.primary.clone(),
                collaborators.secondary.clone(),
            ),
            pipeline: EnrichmentPipeline::new(collaborators.clone(), config.enrichment.clone()),
            collaborators,
            policy: config.session.clone(),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn active_sessions(&self) -> usize {
        self.store.len()
    }

    /// Evict idle sessions; called periodically by the server.
    pub fn sweep(&self) -> Result<usize, AssistantError> {
        self.store.evict_expired()
    }

    /// Handle an incoming message and return the immediate reply.
    ///
    /// Enrichment, when launched, continues in the background; poll
    /// [`product_details_status`](Self::product_details_status) for it.
    pub async fn submit_turn(&self, request: TurnRequest) -> Result<TurnReply, AssistantError> {
        let message = validate_message(&request.message)?;

        let session_id = request
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from);
        let existing = match &session_id {
            Some(id) => self.store.get(id)?,
            None => None,
        };

        match existing {
            None => {
                let id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
                self.initial_turn(id, message, request.preferences, request.model_choice)
                    .await
            }
            Some(rec) if rec.state() == SessionState::Clarifying => {
                self.clarification_round(rec, message, request.preferences, request.model_choice)
                    .await
            }
            Some(rec) => {
                self.follow_up(rec, message, request.preferences, request.model_choice)
                    .await
            }
        }
    }

    /// Report enrichment progress for a session.
    pub fn product_details_status(&self, session_id: &str) -> Result<DetailsReport, AssistantError> {
        let rec = self
            .store
            .get(session_id)?
            .ok_or_else(|| AssistantError::SessionNotFound(session_id.to_string()))?;

        let finished = rec.job().is_some_and(|job| job.is_finished());
        if !finished {
            return Ok(DetailsReport {
                status: DetailStatus::Processing,
                state: rec.state(),
                message: format!("Product details are still being prepared (state: {})", rec.state()),
                product_details: Vec::new(),
            });
        }

        let state = match rec.state() {
            SessionState::Searching | SessionState::Detailing => {
                self.settle_finished_job(session_id, rec.job_generation())?
            }
            other => other,
        };

        let message = if state == SessionState::Error {
            "Fetching product details failed".to_string()
        } else {
            format!("Product details ready for {} products", rec.product_details.len())
        };
        Ok(DetailsReport {
            status: DetailStatus::Completed,
            state,
            message,
            product_details: rec.product_details,
        })
    }

    /// Force READY for a finished job that left the session mid-enrichment.
    ///
    /// The state is re-read under the store lock; a turn that moved the
    /// session on, or started a newer job, is left alone.
    fn settle_finished_job(&self, session_id: &str, generation: u64) -> Result<SessionState, AssistantError> {
        self.store.update(session_id, |rec| {
            let stranded = matches!(rec.state(), SessionState::Searching | SessionState::Detailing)
                && rec.job_generation() == generation;
            if stranded {
                tracing::warn!(session_id = %session_id, state = %rec.state(), "Job finished without advancing state, forcing ready");
                rec.transition(SessionState::Ready)?;
            }
            Ok::<_, AssistantError>(rec.state())
        })?
    }

    /// Change the backend choice used for the session's future turns.
    pub fn switch_model(&self, session_id: &str, choice: ModelChoice) -> Result<(), AssistantError> {
        self.store.update(session_id, |rec| rec.model_choice = choice)?;
        tracing::info!(session_id = %session_id, model_choice = %choice, "Model switched");
        Ok(())
    }

    // =========================================================================
    // Turn kinds
    // =========================================================================

    async fn initial_turn(
        &self,
        id: String,
        message: &str,
        preferences: Option<Preferences>,
        model_choice: Option<ModelChoice>,
    ) -> Result<TurnReply, AssistantError> {
        let mut rec = SessionRecord::new(id.clone(), message);
        rec.model_choice = model_choice.unwrap_or_default();
        if let Some(prefs) = &preferences {
            rec.preferences.merge(prefs);
        }

        if !rec.preferences.is_empty() {
            rec.is_clarified = true;
            rec.transition(SessionState::Querying)?;
            self.store.create(rec)?;
            return self.recommend(&id, None).await;
        }

        rec.transition(SessionState::AnalyzingQuery)?;
        self.store.create(rec)?;
        let verdict = self.classifier.classify(message, &Preferences::new()).await;
        self.apply_verdict(&id, verdict, message, None).await
    }

    async fn clarification_round(
        &self,
        rec: SessionRecord,
        message: &str,
        preferences: Option<Preferences>,
        model_choice: Option<ModelChoice>,
    ) -> Result<TurnReply, AssistantError> {
        let id = rec.id.clone();
        let mut extracted = self
            .clarifier
            .extract_preferences(message, &rec.missing_info)
            .await;
        if let Some(prefs) = &preferences {
            extracted.merge(prefs);
        }

        let snapshot = self.store.update(&id, |rec| {
            if extracted.is_empty() {
                rec.followups.push(message.to_string());
            }
            rec.preferences.merge(&extracted);
            rec.clarification_attempts += 1;
            if let Some(choice) = model_choice {
                rec.model_choice = choice;
            }
            rec.clone()
        })?;

        let forced = snapshot.clarification_attempts >= self.policy.max_clarification_rounds
            || snapshot.preferences.len() >= self.policy.min_preference_categories;
        let escalate = forced
            || self
                .classifier
                .is_specific_enough(&snapshot.original_query, &snapshot.preferences)
                .await;

        tracing::info!(
            session_id = %id,
            attempts = snapshot.clarification_attempts,
            categories = snapshot.preferences.len(),
            escalate,
            "Clarification round"
        );

        if escalate {
            self.store.update(&id, |rec| {
                rec.transition(SessionState::Querying)?;
                rec.is_clarified = true;
                Ok::<_, AssistantError>(())
            })??;
            return self.recommend(&id, None).await;
        }

        let verdict = self
            .classifier
            .classify(&snapshot.original_query, &snapshot.preferences)
            .await;
        self.apply_verdict(&id, verdict, &snapshot.original_query, None)
            .await
    }

    async fn follow_up(
        &self,
        rec: SessionRecord,
        message: &str,
        preferences: Option<Preferences>,
        model_choice: Option<ModelChoice>,
    ) -> Result<TurnReply, AssistantError> {
        let id = rec.id.clone();
        let snapshot = self.store.update(&id, |rec| {
            let mut merged = rec.preferences.clone();
            if let Some(prefs) = &preferences {
                merged.merge(prefs);
            }
            let clarified = !merged.is_empty() || !rec.previous_recommendations.is_empty();
            let next = if clarified {
                SessionState::Querying
            } else {
                SessionState::AnalyzingQuery
            };
            validate_transition(rec.state(), next)?;

            rec.begin_job();
            rec.preferences = merged;
            rec.followups.push(message.to_string());
            if let Some(choice) = model_choice {
                rec.model_choice = choice;
            }
            rec.is_clarified = clarified;
            rec.transition(next)?;
            Ok::<_, AssistantError>(rec.clone())
        })??;

        tracing::info!(
            session_id = %id,
            followups = snapshot.followups.len(),
            clarified = snapshot.is_clarified,
            "Follow-up turn"
        );

        if snapshot.is_clarified {
            return self.recommend(&id, Some(message.to_string())).await;
        }

        let composed = compose_query(
            &snapshot.original_query,
            &snapshot.preferences,
            &snapshot.followups,
        );
        let verdict = self.classifier.classify(&composed, &Preferences::new()).await;
        self.apply_verdict(&id, verdict, &composed, Some(message.to_string()))
            .await
    }

    // =========================================================================
    // Shared steps
    // =========================================================================

    /// Record a classifier verdict, then either ask questions or recommend.
    async fn apply_verdict(
        &self,
        id: &str,
        verdict: QueryVerdict,
        query: &str,
        followup: Option<String>,
    ) -> Result<TurnReply, AssistantError> {
        let model_choice = self.store.update(id, |rec| {
            rec.transition(verdict.next_state())?;
            rec.missing_info = verdict.missing_info.clone();
            rec.confidence = verdict.confidence;
            if verdict.is_specific {
                rec.is_clarified = true;
            }
            Ok::<_, AssistantError>(rec.model_choice)
        })??;

        if verdict.is_specific {
            return self.recommend(id, followup).await;
        }

        let backend = self.collaborators.question_backend(model_choice);
        let questions = generate_questions(backend.as_ref(), query, &verdict.missing_info).await;
        Ok(TurnReply {
            reply: clarification_reply(&questions, &verdict.reasoning, verdict.confidence),
            session_id: id.to_string(),
        })
    }

    /// Generate recommendations for a session in QUERYING and, when they can
    /// be extracted, launch enrichment.
    async fn recommend(&self, id: &str, followup: Option<String>) -> Result<TurnReply, AssistantError> {
        let snapshot = self.store.update(id, |rec| {
            rec.transition(SessionState::Recommending)?;
            Ok::<_, AssistantError>(rec.clone())
        })??;

        let composed = compose_query(
            &snapshot.original_query,
            &snapshot.preferences,
            &snapshot.followups,
        );
        let raw = match self.generator.generate(&composed, snapshot.model_choice).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(session_id = %id, error = %e, "Recommendation generation failed");
                self.store
                    .update(id, |rec| rec.transition(SessionState::Error))??;
                return Err(e.into());
            }
        };

        match parse_structured::<RecommendationSet>(&raw) {
            Ok(set) => {
                let recommendations = set.recommendations;
                let generation = self.store.update(id, |rec| {
                    rec.transition(SessionState::Searching)?;
                    rec.previous_recommendations = recommendations.clone();
                    Ok::<_, AssistantError>(rec.begin_job())
                })??;

                let prior_followups = match &followup {
                    Some(_) => snapshot
                        .followups
                        .split_last()
                        .map(|(_, prior)| prior.to_vec())
                        .unwrap_or_default(),
                    None => Vec::new(),
                };
                self.launch(EnrichmentJob {
                    session_id: id.to_string(),
                    generation,
                    original_query: snapshot.original_query.clone(),
                    preferences: snapshot.preferences.clone(),
                    prior_followups,
                    followup,
                    recommendations,
                })?;
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Recommendations could not be extracted");
                self.store
                    .update(id, |rec| rec.transition(SessionState::Error))??;
            }
        }

        Ok(TurnReply {
            reply: raw,
            session_id: id.to_string(),
        })
    }

    /// Spawn the detached enrichment job and hand its handle to the session.
    fn launch(&self, job: EnrichmentJob) -> Result<(), AssistantError> {
        let id = job.session_id.clone();
        let generation = job.generation;
        let store = self.store.clone();
        let pipeline = self.pipeline.clone();

        tracing::info!(session_id = %id, generation, products = job.recommendations.len(), "Launching enrichment");
        let handle = tokio::spawn(async move {
            if let Err(e) = run_job(store, pipeline, job).await {
                tracing::warn!(error = %e, "Enrichment job ended with an error");
            }
        });
        let abort = handle.abort_handle();
        self.store
            .update(&id, |rec| rec.attach_job(generation, abort))
    }
}

fn validate_message(message: &str) -> Result<&str, AssistantError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(AssistantError::EmptyMessage);
    }
    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AssistantError::MessageTooLong(MAX_MESSAGE_LENGTH));
    }
    Ok(trimmed)
}
