//! Session records and the process-wide session store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;

use shopmate_core::{ModelChoice, Preferences, ProductDetail, Recommendation, SessionState};

use crate::error::AssistantError;
use crate::state_machine::validate_transition;

/// Handle to the background enrichment job owned by a session.
#[derive(Clone, Debug)]
pub struct JobHandle {
    pub generation: u64,
    abort: AbortHandle,
}

impl JobHandle {
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// One user's conversation.
#[derive(Clone, Debug)]
pub struct SessionRecord {
    pub id: String,
    pub original_query: String,
    pub preferences: Preferences,
    pub previous_recommendations: Vec<Recommendation>,
    pub followups: Vec<String>,
    pub model_choice: ModelChoice,
    state: SessionState,
    pub missing_info: Vec<String>,
    pub confidence: f64,
    pub clarification_attempts: u32,
    pub is_clarified: bool,
    pub product_details: Vec<ProductDetail>,
    job: Option<JobHandle>,
    job_generation: u64,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(id: impl Into<String>, original_query: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            original_query: original_query.into(),
            preferences: Preferences::new(),
            previous_recommendations: Vec::new(),
            followups: Vec::new(),
            model_choice: ModelChoice::default(),
            state: SessionState::Initial,
            missing_info: Vec::new(),
            confidence: 0.0,
            clarification_attempts: 0,
            is_clarified: false,
            product_details: Vec::new(),
            job: None,
            job_generation: 0,
            created_at: now,
            last_update: now,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `to` if the state machine allows it.
    pub fn transition(&mut self, to: SessionState) -> Result<(), AssistantError> {
        validate_transition(self.state, to)?;
        tracing::debug!(session_id = %self.id, from = %self.state, to = %to, "State transition");
        self.state = to;
        Ok(())
    }

    pub fn touch(&mut self) {
        self.last_update = Utc::now();
    }

    pub fn job(&self) -> Option<&JobHandle> {
        self.job.as_ref()
    }

    /// Generation of the newest job launched for this session (0 if none).
    pub fn job_generation(&self) -> u64 {
        self.job_generation
    }

    /// Abort any in-flight job and reserve the next generation number.
    ///
    /// Writes from jobs tagged with an older generation are rejected by
    /// [`SessionStore::update_for_job`] from this point on.
    pub fn begin_job(&mut self) -> u64 {
        if let Some(previous) = self.job.take() {
            if !previous.is_finished() {
                tracing::info!(
                    session_id = %self.id,
                    generation = previous.generation,
                    "Aborting superseded enrichment job"
                );
            }
            previous.abort.abort();
        }
        self.job_generation += 1;
        self.product_details.clear();
        self.job_generation
    }

    /// Record the handle of the job launched for `generation`.
    ///
    /// Ignored when a newer job has been reserved in the meantime.
    pub fn attach_job(&mut self, generation: u64, abort: AbortHandle) {
        if generation == self.job_generation {
            self.job = Some(JobHandle { generation, abort });
        } else {
            abort.abort();
        }
    }

    pub(crate) fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::weeks(52 * 100));
        now.signed_duration_since(self.last_update) > ttl
    }
}

/// Mutex-guarded map of sessions with idle-time eviction.
///
/// The lock is only held inside these synchronous methods, never across an
/// `.await`.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, SessionRecord>>, AssistantError> {
        self.sessions
            .lock()
            .map_err(|e| AssistantError::Store(format!("session lock poisoned: {}", e)))
    }

    /// Snapshot of a session, or `None` if unknown or expired.
    pub fn get(&self, id: &str) -> Result<Option<SessionRecord>, AssistantError> {
        let mut sessions = self.lock()?;
        let expired = sessions
            .get(id)
            .is_some_and(|rec| rec.is_expired(Utc::now(), self.ttl));
        if expired {
            if let Some(rec) = sessions.remove(id) {
                evict(rec);
            }
            return Ok(None);
        }
        Ok(sessions.get(id).cloned())
    }

    /// Insert a new record, replacing any record with the same id.
    pub fn create(&self, record: SessionRecord) -> Result<(), AssistantError> {
        let mut sessions = self.lock()?;
        tracing::info!(session_id = %record.id, "Session created");
        if let Some(old) = sessions.insert(record.id.clone(), record) {
            evict(old);
        }
        Ok(())
    }

    /// Apply `f` to a live session and refresh its `last_update`.
    pub fn update<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut SessionRecord) -> T,
    ) -> Result<T, AssistantError> {
        let mut sessions = self.lock()?;
        let now = Utc::now();
        match sessions.get_mut(id) {
            Some(rec) if !rec.is_expired(now, self.ttl) => {
                let out = f(rec);
                rec.last_update = now;
                Ok(out)
            }
            Some(_) => {
                if let Some(rec) = sessions.remove(id) {
                    evict(rec);
                }
                Err(AssistantError::SessionNotFound(id.to_string()))
            }
            None => Err(AssistantError::SessionNotFound(id.to_string())),
        }
    }

    /// Like [`update`](Self::update), but only while `generation` is still the
    /// session's newest job. Returns `Ok(None)` for a stale job.
    pub fn update_for_job<T>(
        &self,
        id: &str,
        generation: u64,
        f: impl FnOnce(&mut SessionRecord) -> T,
    ) -> Result<Option<T>, AssistantError> {
        let mut sessions = self.lock()?;
        let Some(rec) = sessions.get_mut(id) else {
            return Ok(None);
        };
        if rec.job_generation != generation {
            tracing::debug!(
                session_id = %id,
                stale = generation,
                current = rec.job_generation,
                "Dropping write from superseded job"
            );
            return Ok(None);
        }
        let out = f(rec);
        rec.touch();
        Ok(Some(out))
    }

    pub fn remove(&self, id: &str) -> Result<Option<SessionRecord>, AssistantError> {
        let mut sessions = self.lock()?;
        Ok(sessions.remove(id).map(|rec| {
            if let Some(job) = &rec.job {
                job.abort.abort();
            }
            rec
        }))
    }

    /// Drop every session idle longer than the TTL. Returns how many were evicted.
    pub fn evict_expired(&self) -> Result<usize, AssistantError> {
        let mut sessions = self.lock()?;
        let now = Utc::now();
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, rec)| rec.is_expired(now, self.ttl))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            if let Some(rec) = sessions.remove(id) {
                evict(rec);
            }
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Evicted idle sessions");
        }
        Ok(expired.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evict(rec: SessionRecord) {
    if let Some(job) = rec.job {
        job.abort.abort();
    }
    tracing::debug!(session_id = %rec.id, "Session evicted");
}
