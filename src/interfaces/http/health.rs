use super::AppState;
use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde_json::{Value, json};

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "uptimeSecs": state.started_at.elapsed().as_secs(),
        "timestamp": Utc::now().to_rfc3339(),
        "pid": std::process::id(),
    }))
}
