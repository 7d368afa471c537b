//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use shopmate_assistant::ShoppingAssistant;

/// Shared application state.
///
/// All fields are cheap to clone across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Turn orchestrator and session store.
    pub assistant: Arc<ShoppingAssistant>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(assistant: ShoppingAssistant) -> Self {
        Self::from_shared(Arc::new(assistant))
    }

    /// Wrap an assistant that is also shared with background tasks.
    pub fn from_shared(assistant: Arc<ShoppingAssistant>) -> Self {
        Self {
            assistant,
            start_time: Instant::now(),
        }
    }
}
