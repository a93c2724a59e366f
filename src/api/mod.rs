pub mod clients;
pub mod kpi;
pub mod lookups;
pub mod routes;
pub mod system;

pub use routes::build_router;

use crate::auth::{password::HASH_COST, JwtHandler};
use crate::store::CaseStore;
use std::sync::Arc;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CaseStore>,
    pub jwt_handler: Arc<JwtHandler>,
    pub hash_cost: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn CaseStore>, jwt_handler: Arc<JwtHandler>) -> Self {
        Self {
            store,
            jwt_handler,
            hash_cost: HASH_COST,
        }
    }

    /// Lower bcrypt cost, for tests that hash many passwords.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }
}
