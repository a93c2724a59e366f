//! Case-management dashboard backend
//!
//! Role-gated REST API over the case-management schema: staff
//! authentication, KPI views, lookups and client data entry.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod store;

pub use api::{build_router, AppState};
pub use config::Config;
pub use error::ApiError;
