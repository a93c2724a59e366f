//! Authentication Models
//! Identity, token claims and auth request/response bodies

use serde::{Deserialize, Serialize};

/// Permission categories seeded in `app_roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Executive,
    ProgramDirector,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Executive => "Executive",
            Role::ProgramDirector => "ProgramDirector",
            Role::Staff => "Staff",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User row joined with its role names.
#[derive(Debug, Clone)]
pub struct UserWithRoles {
    pub user_id: i64,
    pub email: String,
    pub full_name: String,
    pub password_hash: String, // bcrypt hash - never serialize
    pub is_active: bool,
    pub roles: Vec<String>,
}

/// Who the caller is, as carried inside a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub full_name: String,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        self.roles
            .iter()
            .any(|r| allowed.iter().any(|a| a.as_str() == r))
    }
}

impl From<&UserWithRoles> for Identity {
    fn from(user: &UserWithRoles) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            roles: user.roles.clone(),
        }
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(flatten)]
    pub identity: Identity,
    pub iat: i64,
    pub exp: i64,
}

/// Bootstrap-admin and register share a body shape.
#[derive(Debug, Default, Deserialize)]
pub struct NewAccountRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Identity,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(roles: &[&str]) -> Identity {
        Identity {
            user_id: 7,
            email: "case.worker@example.org".to_string(),
            full_name: "Case Worker".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_role_names_match_seeded_rows() {
        assert_eq!(Role::ProgramDirector.to_string(), "ProgramDirector");
        assert!(identity(&["Staff"]).has_any_role(&[Role::Staff]));
        // Stored names are case-sensitive
        assert!(!identity(&["staff"]).has_any_role(&[Role::Staff]));
    }

    #[test]
    fn test_any_role_match() {
        let staff = identity(&["Staff"]);
        assert!(staff.has_any_role(&[Role::Staff, Role::Admin]));
        assert!(!staff.has_any_role(&[Role::Executive, Role::Admin]));

        let nobody = identity(&[]);
        assert!(!nobody.has_any_role(&[Role::Admin]));
    }

    #[test]
    fn test_claims_serialize_flat() {
        let claims = Claims {
            identity: identity(&["Executive"]),
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["user_id"], 7);
        assert_eq!(json["roles"][0], "Executive");
        assert_eq!(json["exp"], 2);
    }
}
