use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "portfoliogen"
    }))
}

/// GET /api/model
/// Which backends are currently considered available. Names only, no errors.
pub async fn model_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "active",
        "services_available": {
            "gemini": state.gateway.is_available("gemini"),
            "groq": state.gateway.is_available("groq"),
        }
    }))
}
