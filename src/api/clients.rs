//! Client records and service entries (Staff, Admin)

use crate::api::AppState;
use crate::error::{present, ApiError};
use crate::models::{AddServiceRequest, ClientFields, ClientRequest, NewClientService};
use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use tracing::{error, info};

fn client_fields(req: &ClientRequest) -> Result<ClientFields, ApiError> {
    let (Some(key), Some(first), Some(last)) = (
        present(&req.external_client_key),
        present(&req.first_name),
        present(&req.last_name),
    ) else {
        return Err(ApiError::bad_request(
            "external_client_key, first_name, and last_name are required",
        ));
    };

    Ok(ClientFields {
        external_client_key: key.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        dob: req.dob,
        gender: present(&req.gender).map(str::to_string),
        housing_status: present(&req.housing_status).map(str::to_string),
    })
}

/// Zero ids and durations count as missing, like blank strings.
fn service_record(req: &AddServiceRequest) -> Result<NewClientService, ApiError> {
    let nonzero = |v: Option<i64>| v.filter(|n| *n != 0);

    let (Some(client_id), Some(program_id), Some(service_id), Some(service_date), Some(duration)) = (
        nonzero(req.client_id),
        nonzero(req.program_id),
        nonzero(req.service_id),
        req.service_date,
        nonzero(req.duration_minutes),
    ) else {
        return Err(ApiError::bad_request(
            "client_id, program_id, service_id, service_date, duration_minutes required",
        ));
    };

    Ok(NewClientService {
        client_id,
        program_id,
        staff_id: nonzero(req.staff_id),
        service_id,
        service_date,
        duration_minutes: duration,
        notes_ref: present(&req.notes_ref).map(str::to_string),
    })
}

/// Create client - POST /api/clients
pub async fn create_client(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ClientRequest>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let client = client_fields(&payload)?;

    let client_id = state.store.create_client(&client).await.map_err(|e| {
        error!(error = %e, "Create client error");
        ApiError::ServerError("Failed to create client")
    })?;

    info!(client_id, "Client created");
    Ok(Json(json!({ "client_id": client_id })))
}

/// Update client - PUT /api/clients/:id
pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<ClientRequest>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let client_id = id
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::bad_request("Invalid client id"))?;

    let client = client_fields(&payload)?;

    state
        .store
        .update_client(client_id, &client)
        .await
        .map_err(|e| {
            error!(error = %e, client_id, "Update client error");
            ApiError::ServerError("Failed to update client")
        })?;

    Ok(Json(json!({ "ok": true, "client_id": client_id })))
}

/// Record a delivered service - POST /api/data/add-service
pub async fn add_service(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<AddServiceRequest>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let record = service_record(&payload)?;
    let client_service_id = state.store.add_client_service(&record).await?;

    info!(
        client_service_id,
        client_id = record.client_id,
        "Client service recorded"
    );
    Ok(Json(
        json!({ "ok": true, "client_service_id": client_service_id }),
    ))
}
