//! Authentication API Endpoints
//! Bootstrap, registration, login and password change

use crate::api::AppState;
use crate::auth::{
    models::{
        ChangePasswordRequest, Identity, LoginRequest, LoginResponse, NewAccountRequest,
    },
    password::{hash_password, meets_change_policy, meets_length_policy, verify_password},
};
use crate::error::{present, ApiError};
use crate::models::NewUser;
use crate::store::{StoreError, DEFAULT_ROLE_ID};
use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use tracing::{error, info, warn};

/// Passwords are taken as typed; only emptiness counts as missing.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn account_fields(payload: &NewAccountRequest) -> Option<(&str, &str, &str)> {
    Some((
        present(&payload.email)?,
        present(&payload.full_name)?,
        non_empty(&payload.password)?,
    ))
}

/// Bootstrap admin - POST /api/bootstrap-admin
pub async fn bootstrap_admin(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<NewAccountRequest>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let (email, full_name, password) = account_fields(&payload)
        .ok_or_else(|| ApiError::bad_request("email, full_name, password required"))?;

    let password_hash = hash_password(password, state.hash_cost).await?;
    let user = NewUser {
        email: email.to_string(),
        full_name: full_name.to_string(),
        password_hash,
    };

    let user_id = state
        .store
        .bootstrap_admin(&user)
        .await
        .map_err(|e| match e {
            StoreError::Conflict => ApiError::Conflict("User already exists"),
            StoreError::MissingRole(_) => ApiError::ServerError("Admin role not found"),
            other => {
                error!(error = %other, "bootstrap-admin transaction failed");
                ApiError::ServerError("bootstrap failed")
            }
        })?;

    info!(user_id, email, "Bootstrap admin provisioned");
    Ok(Json(json!({ "ok": true, "user_id": user_id })))
}

/// Register - POST /api/register
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<NewAccountRequest>, ApiError>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (email, full_name, password) = account_fields(&payload)
        .ok_or_else(|| ApiError::bad_request("email, full_name, and password required"))?;

    if !meets_length_policy(password) {
        return Err(ApiError::bad_request(
            "Password must be at least 12 characters",
        ));
    }

    let password_hash = hash_password(password, state.hash_cost).await?;
    let user = NewUser {
        email: email.to_string(),
        full_name: full_name.to_string(),
        password_hash,
    };

    let user_id = state
        .store
        .register_user(&user, DEFAULT_ROLE_ID)
        .await
        .map_err(|e| match e {
            StoreError::Conflict => ApiError::Conflict("Email already registered"),
            other => ApiError::from(other),
        })?;

    info!(user_id, email, "User registered");
    Ok((StatusCode::CREATED, Json(json!({ "ok": true }))))
}

/// Login - POST /api/login
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (Some(email), Some(password)) = (present(&payload.email), non_empty(&payload.password))
    else {
        return Err(ApiError::bad_request("email and password required"));
    };

    // Unknown, inactive and wrong-password all answer identically.
    let invalid = || ApiError::Unauthorized("Invalid credentials");

    let Some(user) = state
        .store
        .get_user_with_roles_by_email(email)
        .await?
        .filter(|u| u.is_active)
    else {
        warn!(email, "Failed login: unknown or inactive account");
        return Err(invalid());
    };

    if !verify_password(password, &user.password_hash).await? {
        warn!(email, "Failed login: bad password");
        return Err(invalid());
    }

    state.store.record_login(user.user_id).await?;

    let identity = Identity::from(&user);
    let token = state.jwt_handler.issue(&identity)?;

    info!(user_id = user.user_id, roles = ?user.roles, "Login successful");
    Ok(Json(LoginResponse {
        token,
        user: identity,
    }))
}

/// Change password - POST /api/change-password
pub async fn change_password(
    State(state): State<AppState>,
    identity: Identity,
    WithRejection(Json(payload), _): WithRejection<Json<ChangePasswordRequest>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let (Some(current), Some(new)) = (
        non_empty(&payload.current_password),
        non_empty(&payload.new_password),
    ) else {
        return Err(ApiError::bad_request(
            "current_password and new_password required",
        ));
    };

    if !meets_change_policy(new) {
        return Err(ApiError::bad_request(
            "Password must be at least 12 characters and include at least 1 number and 1 symbol",
        ));
    }

    let Some(creds) = state
        .store
        .get_credentials(identity.user_id)
        .await?
        .filter(|c| c.is_active)
    else {
        return Err(ApiError::Unauthorized("Unauthorized"));
    };

    if !verify_password(current, &creds.password_hash).await? {
        warn!(user_id = identity.user_id, "Password change with wrong current password");
        return Err(ApiError::Unauthorized("Current password is incorrect"));
    }

    let new_hash = hash_password(new, state.hash_cost).await?;
    state
        .store
        .update_password_hash(identity.user_id, &new_hash)
        .await?;

    info!(user_id = identity.user_id, "Password changed");
    Ok(Json(json!({ "ok": true })))
}

/// Current user - GET /api/auth/me
/// Answers from the token alone; roles are as of the last login.
pub async fn get_current_user(identity: Identity) -> Json<Identity> {
    Json(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_fields() {
        let full = NewAccountRequest {
            email: Some(" a@example.org ".to_string()),
            full_name: Some("A Person".to_string()),
            password: Some(" spaced password ".to_string()),
        };
        assert_eq!(
            account_fields(&full),
            Some(("a@example.org", "A Person", " spaced password "))
        );

        let blank_name = NewAccountRequest {
            full_name: Some("  ".to_string()),
            ..full
        };
        assert_eq!(account_fields(&blank_name), None);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(&Some(String::new())), None);
        assert_eq!(non_empty(&Some(" ".to_string())), Some(" "));
        assert_eq!(non_empty(&None), None);
    }
}
