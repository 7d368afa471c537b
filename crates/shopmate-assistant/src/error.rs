//! Error types for the assistant.

use shopmate_core::SessionState;
use shopmate_providers::ProviderError;

/// Errors surfaced by a conversational turn.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("{0}")]
    InvalidModelChoice(String),
    #[error("invalid state transition from {0} to {1}")]
    InvalidTransition(SessionState, SessionState),
    #[error("recommendation generation failed: {0}")]
    Generation(#[from] ProviderError),
    #[error("session store error: {0}")]
    Store(String),
}

/// Failure of a background enrichment job.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("enrichment job panicked: {0}")]
    Panicked(String),
    #[error("session store error: {0}")]
    Store(String),
}

impl From<AssistantError> for EnrichmentError {
    fn from(err: AssistantError) -> Self {
        EnrichmentError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(AssistantError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            AssistantError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            AssistantError::SessionNotFound("abc".to_string()).to_string(),
            "session not found: abc"
        );
    }

    #[test]
    fn test_invalid_transition_mentions_both_states() {
        let err = AssistantError::InvalidTransition(SessionState::Ready, SessionState::Detailing);
        let msg = err.to_string();
        assert!(msg.contains("ready"));
        assert!(msg.contains("detailing"));
    }

    #[test]
    fn test_provider_error_conversion() {
        let err: AssistantError = ProviderError::Timeout.into();
        assert!(matches!(err, AssistantError::Generation(_)));
        assert_eq!(err.to_string(), "recommendation generation failed: request timed out");
    }

    #[test]
    fn test_enrichment_error_from_store_error() {
        let err: EnrichmentError = AssistantError::Store("lock poisoned".to_string()).into();
        assert!(matches!(err, EnrichmentError::Store(_)));
    }
}
