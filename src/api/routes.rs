//! Router assembly
//!
//! Everything lives under `/api`. Protected routes pass through the token
//! gate first, then (where listed) the per-route role guard.

use crate::api::{clients, kpi, lookups, system, AppState};
use crate::auth::{api as auth_api, auth_middleware, require_any_role, AllowedRoles};
use crate::middleware::request_logging;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::path::Path;
use tower_http::{cors::CorsLayer, services::ServeDir};

pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(system::health))
        .route("/bootstrap-admin", post(auth_api::bootstrap_admin))
        .route("/register", post(auth_api::register))
        .route("/login", post(auth_api::login));

    let protected_routes = Router::new()
        .route("/db-test", get(system::db_test))
        .route("/auth/me", get(auth_api::get_current_user))
        .route("/change-password", post(auth_api::change_password))
        .route(
            "/kpi/org-monthly",
            get(kpi::org_monthly).route_layer(middleware::from_fn_with_state(
                AllowedRoles::EXECUTIVE,
                require_any_role,
            )),
        )
        .route(
            "/kpi/program-monthly",
            get(kpi::program_monthly).route_layer(middleware::from_fn_with_state(
                AllowedRoles::PROGRAM_LEADERSHIP,
                require_any_role,
            )),
        )
        .route(
            "/kpi/staff-caseload",
            get(kpi::staff_caseload).route_layer(middleware::from_fn_with_state(
                AllowedRoles::EXECUTIVE,
                require_any_role,
            )),
        )
        .route("/lookups/programs", get(lookups::programs))
        .route("/lookups/staff", get(lookups::staff))
        .route("/lookups/services", get(lookups::services))
        .route("/lookups/clients", get(lookups::clients))
        .route(
            "/clients",
            post(clients::create_client).route_layer(middleware::from_fn_with_state(
                AllowedRoles::DATA_ENTRY,
                require_any_role,
            )),
        )
        .route(
            "/clients/:id",
            put(clients::update_client).route_layer(middleware::from_fn_with_state(
                AllowedRoles::DATA_ENTRY,
                require_any_role,
            )),
        )
        .route(
            "/data/add-service",
            post(clients::add_service).route_layer(middleware::from_fn_with_state(
                AllowedRoles::DATA_ENTRY,
                require_any_role,
            )),
        )
        .route_layer(middleware::from_fn_with_state(
            state.jwt_handler.clone(),
            auth_middleware,
        ));

    let api = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state);

    let mut app = Router::new().nest("/api", api);
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}
