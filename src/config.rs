//! Runtime Configuration
//! Assembled once at startup from CLI flags, environment and `.env`.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const DEV_JWT_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

#[derive(Parser, Debug, Clone)]
#[command(name = "casedash")]
#[command(about = "Case-management dashboard API")]
pub struct Config {
    /// MySQL host
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    /// MySQL port
    #[arg(long, env = "DB_PORT", default_value = "3306")]
    pub db_port: u16,

    /// MySQL user
    #[arg(long, env = "DB_USER", default_value = "root")]
    pub db_user: String,

    /// MySQL password
    #[arg(long, env = "DB_PASS", default_value = "", hide_env_values = true)]
    pub db_pass: String,

    /// Database (schema) name
    #[arg(long, env = "DB_NAME", default_value = "casedash")]
    pub db_name: String,

    /// Maximum pooled connections
    #[arg(long, env = "DB_POOL_SIZE", default_value = "10")]
    pub db_pool_size: u32,

    /// Seconds to wait for a pooled connection before failing
    #[arg(long, env = "DB_ACQUIRE_TIMEOUT_SECS", default_value = "30")]
    pub db_acquire_timeout_secs: u64,

    /// HS256 signing secret for session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Sign tokens with the built-in development secret when JWT_SECRET is unset
    #[arg(long, env = "ALLOW_DEV_JWT_SECRET")]
    pub allow_dev_jwt_secret: bool,

    /// HTTP listen port
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Directory with the dashboard's static HTML
    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,
}

impl Config {
    /// Load `.env` (cwd and parents, then the crate root) and parse.
    pub fn load() -> Self {
        load_env();
        Self::parse()
    }

    /// Signing secret. Blank counts as unset; the dev constant needs an explicit opt-in.
    pub fn jwt_secret(&self) -> Result<String> {
        match self.jwt_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Ok(secret.to_string()),
            _ if self.allow_dev_jwt_secret => {
                warn!("JWT_SECRET not set; signing with the insecure dev secret");
                Ok(DEV_JWT_SECRET.to_string())
            }
            _ => bail!("JWT_SECRET is required (or pass --allow-dev-jwt-secret for local use)"),
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.db_acquire_timeout_secs)
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn load_env() {
    let _ = dotenv::dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
