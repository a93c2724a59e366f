//! Credential & Case Store
//! The relational store behind every handler, as an async trait
//!
//! `MySqlStore` talks to the real schema through a bounded sqlx pool;
//! `InMemoryStore` keeps the same contract in process for tests and demos.

pub mod memory;
pub mod mysql;

use crate::auth::models::UserWithRoles;
use crate::models::{
    ClientFields, ClientMatch, KpiRow, KpiView, NewClientService, NewUser, ProgramOption,
    ServiceOption, StaffOption, StoredCredentials,
};
use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryStore;
pub use mysql::MySqlStore;

/// `app_roles.role_id` handed to self-registered accounts (Staff in the seed data).
pub const DEFAULT_ROLE_ID: i64 = 4;

/// Result cap for the client search box.
pub const CLIENT_SEARCH_LIMIT: u32 = 20;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique key already present")]
    Conflict,

    #[error("role not found: {0}")]
    MissingRole(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
            _ => StoreError::Database(err),
        }
    }
}

#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Round-trip to prove the store answers.
    async fn ping(&self) -> Result<bool, StoreError>;

    async fn list_tables(&self) -> Result<Vec<String>, StoreError>;

    /// User row by email plus its role names; `None` when no row matches.
    async fn get_user_with_roles_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithRoles>, StoreError>;

    async fn get_credentials(&self, user_id: i64) -> Result<Option<StoredCredentials>, StoreError>;

    /// Insert an active user holding `role_id`. `Conflict` when the email exists.
    async fn register_user(&self, user: &NewUser, role_id: i64) -> Result<i64, StoreError>;

    /// Atomically create a user holding the Admin role.
    ///
    /// Fails `Conflict` when the email exists and `MissingRole` when no Admin
    /// role is seeded; either way nothing is written.
    async fn bootstrap_admin(&self, user: &NewUser) -> Result<i64, StoreError>;

    async fn record_login(&self, user_id: i64) -> Result<(), StoreError>;

    async fn update_password_hash(&self, user_id: i64, password_hash: &str)
        -> Result<(), StoreError>;

    async fn kpi_rows(&self, view: KpiView) -> Result<Vec<KpiRow>, StoreError>;

    async fn list_programs(&self) -> Result<Vec<ProgramOption>, StoreError>;

    async fn list_staff(&self) -> Result<Vec<StaffOption>, StoreError>;

    async fn list_services(&self) -> Result<Vec<ServiceOption>, StoreError>;

    /// Active clients whose key or names contain `query`, case-insensitively.
    async fn search_clients(&self, query: &str, limit: u32)
        -> Result<Vec<ClientMatch>, StoreError>;

    async fn create_client(&self, client: &ClientFields) -> Result<i64, StoreError>;

    async fn update_client(&self, client_id: i64, client: &ClientFields) -> Result<(), StoreError>;

    async fn add_client_service(&self, record: &NewClientService) -> Result<i64, StoreError>;
}
