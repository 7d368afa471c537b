//! Conversational shopping assistant.
//!
//! Classifies queries, asks clarifying questions, generates recommendations
//! through one or two generation backends, and enriches each recommended
//! product with purchase links and review summaries in the background.

pub mod backends;
pub mod clarify;
pub mod classifier;
pub mod enrichment;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod recommend;
pub mod session;
pub mod state_machine;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backends::Collaborators;
pub use clarify::ClarificationEngine;
pub use classifier::{QueryClassifier, QueryVerdict};
pub use enrichment::{EnrichmentJob, EnrichmentPipeline};
pub use error::{AssistantError, EnrichmentError};
pub use orchestrator::{
    DetailStatus, DetailsReport, ShoppingAssistant, TurnReply, TurnRequest, MAX_MESSAGE_LENGTH,
};
pub use recommend::RecommendationGenerator;
pub use session::{SessionRecord, SessionStore};
