use crate::api::AppState;
use crate::error::ApiError;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// Health - GET /api/health (round-trips the store)
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let ok = state.store.ping().await?;
    Ok(Json(json!({ "ok": ok })))
}

/// Store connectivity probe - GET /api/db-test
pub async fn db_test(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.store.list_tables().await?))
}
