//! KPI passthroughs
//! Read-only views; ordering and caps are fixed per view in `KpiView`.

use crate::api::AppState;
use crate::error::ApiError;
use crate::models::{KpiRow, KpiView};
use axum::{extract::State, Json};

async fn view_rows(state: &AppState, view: KpiView) -> Result<Json<Vec<KpiRow>>, ApiError> {
    Ok(Json(state.store.kpi_rows(view).await?))
}

/// GET /api/kpi/org-monthly (Executive, Admin)
pub async fn org_monthly(State(state): State<AppState>) -> Result<Json<Vec<KpiRow>>, ApiError> {
    view_rows(&state, KpiView::OrgMonthly).await
}

/// GET /api/kpi/program-monthly (ProgramDirector, Executive, Admin)
pub async fn program_monthly(
    State(state): State<AppState>,
) -> Result<Json<Vec<KpiRow>>, ApiError> {
    view_rows(&state, KpiView::ProgramMonthly).await
}

/// GET /api/kpi/staff-caseload (Executive, Admin)
pub async fn staff_caseload(
    State(state): State<AppState>,
) -> Result<Json<Vec<KpiRow>>, ApiError> {
    view_rows(&state, KpiView::StaffCaseload).await
}
