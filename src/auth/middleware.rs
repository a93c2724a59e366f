//! Authentication Middleware
//! Two gates: bearer-token verification, then role membership
//!
//! `authenticate` and `authorize` are plain functions; the axum wrappers
//! below either continue with an enriched request or answer with an error.

use crate::auth::{
    jwt::JwtHandler,
    models::{Identity, Role},
};
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Forbidden")]
    Forbidden,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::Unauthorized("Missing token"),
            AuthError::InvalidToken => ApiError::Unauthorized("Invalid token"),
            AuthError::Forbidden => ApiError::Forbidden,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// Gate 1: pull the bearer token and verify it.
pub fn authenticate(headers: &HeaderMap, jwt: &JwtHandler) -> Result<Identity, AuthError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let claims = jwt.verify(token).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        AuthError::InvalidToken
    })?;

    Ok(claims.identity)
}

/// Gate 2: any one of `allowed` is enough.
pub fn authorize(identity: &Identity, allowed: &[Role]) -> Result<(), AuthError> {
    if identity.has_any_role(allowed) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Verifies the token and stores the caller's `Identity` on the request.
pub async fn auth_middleware(
    State(jwt_handler): State<Arc<JwtHandler>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = authenticate(req.headers(), &jwt_handler)?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Allowed-role set for one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct AllowedRoles(pub &'static [Role]);

impl AllowedRoles {
    pub const EXECUTIVE: Self = Self(&[Role::Executive, Role::Admin]);
    pub const PROGRAM_LEADERSHIP: Self = Self(&[Role::ProgramDirector, Role::Executive, Role::Admin]);
    pub const DATA_ENTRY: Self = Self(&[Role::Staff, Role::Admin]);
}

/// Role guard; must sit inside `auth_middleware`.
pub async fn require_any_role(
    State(allowed): State<AllowedRoles>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or(AuthError::MissingToken)?;

    if let Err(e) = authorize(identity, allowed.0) {
        debug!(
            user_id = identity.user_id,
            roles = ?identity.roles,
            allowed = ?allowed.0,
            "Role check failed"
        );
        return Err(e);
    }

    Ok(next.run(req).await)
}

/// Handlers take the authenticated caller as an argument.
#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}
