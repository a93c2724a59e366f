//! Authentication Module
//! Session tokens, password handling and the role-gated middleware chain

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;

pub use jwt::JwtHandler;
pub use middleware::{auth_middleware, require_any_role, AllowedRoles};
pub use models::{Identity, Role};
