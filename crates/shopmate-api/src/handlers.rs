//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path parameters and JSON bodies via axum
//! extractors, calls into the assistant, and returns JSON responses.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use shopmate_assistant::{AssistantError, DetailsReport, TurnRequest};
use shopmate_core::{ModelChoice, Preferences, ProductDetail};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

/// Request body for POST /api/chat.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_choice: Option<String>,
}

/// Request body for POST /api/switch-model/{session_id}.
#[derive(Debug, Serialize, Deserialize)]
pub struct SwitchModelRequest {
    pub model_choice: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: String,
    /// Always empty here; details arrive through polling.
    pub product_details: Vec<ProductDetail>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SwitchModelResponse {
    pub status: String,
    pub message: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: u64,
}

// =============================================================================
// Handler functions
// =============================================================================

/// POST /api/chat - submit one conversational turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let model_choice = body
        .model_choice
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(parse_model_choice)
        .transpose()?;

    let reply = state
        .assistant
        .submit_turn(TurnRequest {
            message: body.message,
            session_id: body.session_id,
            preferences: body.preferences,
            model_choice,
        })
        .await?;

    Ok(Json(ChatResponse {
        reply: reply.reply,
        session_id: reply.session_id,
        product_details: Vec::new(),
    }))
}

/// GET /api/product-details/{session_id} - poll background enrichment.
pub async fn product_details(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<DetailsReport>, ApiError> {
    let report = state.assistant.product_details_status(&session_id)?;
    Ok(Json(report))
}

/// POST /api/switch-model/{session_id} - change the session's backend choice.
pub async fn switch_model(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<SwitchModelRequest>,
) -> Result<Json<SwitchModelResponse>, ApiError> {
    let choice = parse_model_choice(&body.model_choice)?;
    state.assistant.switch_model(&session_id, choice)?;

    Ok(Json(SwitchModelResponse {
        status: "success".to_string(),
        message: format!("Model switched to {}", choice),
        session_id,
    }))
}

/// GET /health - liveness and basic counters.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.assistant.active_sessions() as u64,
    })
}

fn parse_model_choice(raw: &str) -> Result<ModelChoice, ApiError> {
    raw.parse::<ModelChoice>()
        .map_err(|e| AssistantError::InvalidModelChoice(e).into())
}
