//! Password hashing and policy
//! bcrypt runs on the blocking pool so request tasks keep moving

use anyhow::{Context, Result};

pub const HASH_COST: u32 = 12;
pub const MIN_PASSWORD_LEN: usize = 12;

/// Salted bcrypt hash of `password`.
pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("hashing task panicked")?
        .context("Failed to hash password")
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("verify task panicked")?
        .context("Failed to verify password")
}

/// Minimum bar for self-registration.
pub fn meets_length_policy(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

/// Stronger bar for password changes: length, a digit and a symbol.
pub fn meets_change_policy(password: &str) -> bool {
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_ascii_alphanumeric());
    meets_length_policy(password) && has_digit && has_symbol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_policy() {
        assert!(!meets_length_policy("elevenchars"));
        assert!(meets_length_policy("twelve chars"));
    }

    #[test]
    fn test_change_policy() {
        assert!(!meets_change_policy("short1!"));
        assert!(!meets_change_policy("nodigitsherebutsymbol!"));
        assert!(!meets_change_policy("nosymbolsbut1234"));
        assert!(meets_change_policy("longenoughpw12!"));
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery", 4)
            .await
            .unwrap();
        assert!(verify_password("correct horse battery", &hash).await.unwrap());
        assert!(!verify_password("wrong horse battery", &hash).await.unwrap());
    }
}
