use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "fortune0",
        "version": env!("CARGO_PKG_VERSION"),
        "store": state.config.store.as_str(),
    }))
}
