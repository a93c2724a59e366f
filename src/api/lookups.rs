//! Dropdown and search lookups for the data-entry forms

use crate::api::AppState;
use crate::error::{present, ApiError};
use crate::models::{ClientMatch, ClientSearchQuery, ProgramOption, ServiceOption, StaffOption};
use crate::store::CLIENT_SEARCH_LIMIT;
use axum::{
    extract::{Query, State},
    Json,
};

pub async fn programs(State(state): State<AppState>) -> Result<Json<Vec<ProgramOption>>, ApiError> {
    Ok(Json(state.store.list_programs().await?))
}

pub async fn staff(State(state): State<AppState>) -> Result<Json<Vec<StaffOption>>, ApiError> {
    Ok(Json(state.store.list_staff().await?))
}

pub async fn services(State(state): State<AppState>) -> Result<Json<Vec<ServiceOption>>, ApiError> {
    Ok(Json(state.store.list_services().await?))
}

/// GET /api/lookups/clients?q=
/// A blank query never reaches the store.
pub async fn clients(
    State(state): State<AppState>,
    Query(params): Query<ClientSearchQuery>,
) -> Result<Json<Vec<ClientMatch>>, ApiError> {
    let Some(q) = present(&params.q) else {
        return Ok(Json(Vec::new()));
    };

    Ok(Json(state.store.search_clients(q, CLIENT_SEARCH_LIMIT).await?))
}
