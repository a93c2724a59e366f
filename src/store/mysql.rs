//! MySQL-backed store
//!
//! All access goes through one bounded `MySqlPool`. Every statement is
//! parameterized; the only interpolated SQL is the fixed KPI view text.
//!
//! Transactions hold their pooled connection inside a sqlx `Transaction`.
//! Dropping it without `commit` rolls back and hands the connection back to
//! the pool, so every early return releases the connection.

use crate::auth::models::{Role, UserWithRoles};
use crate::config::Config;
use crate::models::{
    ClientFields, ClientMatch, KpiRow, KpiView, NewClientService, NewUser, ProgramOption,
    ServiceOption, StaffOption, StoredCredentials,
};
use crate::store::{CaseStore, StoreError};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, FromRow, Row, TypeInfo};
use tracing::{info, instrument, warn};

#[derive(Debug, FromRow)]
struct UserRow {
    user_id: i64,
    email: String,
    full_name: String,
    password_hash: String,
    is_active: bool,
}

#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Build the pool lazily; connections open on first use.
    pub fn connect(config: &Config) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.db_host)
            .port(config.db_port)
            .username(&config.db_user)
            .password(&config.db_pass)
            .database(&config.db_name);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.db_pool_size)
            .acquire_timeout(config.acquire_timeout())
            .connect_lazy_with(options);

        info!(
            host = %config.db_host,
            database = %config.db_name,
            max_connections = config.db_pool_size,
            "MySQL pool initialized (lazy)"
        );

        Self { pool }
    }

    async fn role_names(&self, user_id: i64) -> Result<Vec<String>, StoreError> {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT r.role_name
             FROM app_user_roles ur
             JOIN app_roles r ON r.role_id = ur.role_id
             WHERE ur.user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }
}

#[async_trait]
impl CaseStore for MySqlStore {
    async fn ping(&self) -> Result<bool, StoreError> {
        let ok: i64 = sqlx::query_scalar("SELECT 1 AS ok")
            .fetch_one(&self.pool)
            .await?;
        Ok(ok == 1)
    }

    async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SHOW TABLES").fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get_unchecked::<String, _>(0).map_err(StoreError::from))
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn get_user_with_roles_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithRoles>, StoreError> {
        let user = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, email, full_name, password_hash, is_active
             FROM app_users
             WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        let roles = self.role_names(user.user_id).await?;

        Ok(Some(UserWithRoles {
            user_id: user.user_id,
            email: user.email,
            full_name: user.full_name,
            password_hash: user.password_hash,
            is_active: user.is_active,
            roles,
        }))
    }

    async fn get_credentials(&self, user_id: i64) -> Result<Option<StoredCredentials>, StoreError> {
        let creds = sqlx::query_as::<_, StoredCredentials>(
            "SELECT password_hash, is_active FROM app_users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(creds)
    }

    #[instrument(skip(self, user), fields(email = %user.email), err)]
    async fn register_user(&self, user: &NewUser, role_id: i64) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT user_id FROM app_users WHERE email = ?")
                .bind(&user.email)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            tx.rollback().await?;
            return Err(StoreError::Conflict);
        }

        let inserted = sqlx::query(
            "INSERT INTO app_users (email, full_name, password_hash, is_active)
             VALUES (?, ?, ?, 1)",
        )
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .execute(&mut *tx)
        .await?;
        let user_id = inserted.last_insert_id() as i64;

        sqlx::query("INSERT INTO app_user_roles (user_id, role_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user_id)
    }

    #[instrument(skip(self, user), fields(email = %user.email), err)]
    async fn bootstrap_admin(&self, user: &NewUser) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT user_id FROM app_users WHERE email = ?")
                .bind(&user.email)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            tx.rollback().await?;
            return Err(StoreError::Conflict);
        }

        let inserted = sqlx::query(
            "INSERT INTO app_users (email, full_name, password_hash) VALUES (?, ?, ?)",
        )
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .execute(&mut *tx)
        .await?;
        let user_id = inserted.last_insert_id() as i64;

        let role_id: Option<i64> =
            sqlx::query_scalar("SELECT role_id FROM app_roles WHERE role_name = ?")
                .bind(Role::Admin.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(role_id) = role_id else {
            warn!("Admin role missing from app_roles; rolling back bootstrap");
            tx.rollback().await?;
            return Err(StoreError::MissingRole(Role::Admin.to_string()));
        };

        sqlx::query("INSERT INTO app_user_roles (user_id, role_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(user_id, "Bootstrap admin created");
        Ok(user_id)
    }

    async fn record_login(&self, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE app_users SET last_login_at = NOW() WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_password_hash(
        &self,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE app_users SET password_hash = ? WHERE user_id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn kpi_rows(&self, view: KpiView) -> Result<Vec<KpiRow>, StoreError> {
        let sql = view.sql();
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row_to_json(row).map_err(StoreError::from))
            .collect()
    }

    async fn list_programs(&self) -> Result<Vec<ProgramOption>, StoreError> {
        let rows = sqlx::query_as::<_, ProgramOption>(
            "SELECT program_id, program_name FROM programs WHERE is_active = 1 ORDER BY program_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_staff(&self) -> Result<Vec<StaffOption>, StoreError> {
        let rows = sqlx::query_as::<_, StaffOption>(
            "SELECT staff_id, full_name FROM staff WHERE is_active = 1 ORDER BY full_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_services(&self) -> Result<Vec<ServiceOption>, StoreError> {
        let rows = sqlx::query_as::<_, ServiceOption>(
            "SELECT service_id, service_type FROM services ORDER BY service_type",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn search_clients(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<ClientMatch>, StoreError> {
        let like = format!("%{}%", escape_like(&query.to_lowercase()));

        let rows = sqlx::query_as::<_, ClientMatch>(
            "SELECT client_id, external_client_key, first_name, last_name
             FROM clients
             WHERE is_active = 1
               AND (
                 LOWER(external_client_key) LIKE ?
                 OR LOWER(first_name) LIKE ?
                 OR LOWER(last_name) LIKE ?
               )
             ORDER BY last_name, first_name
             LIMIT ?",
        )
        .bind(&like)
        .bind(&like)
        .bind(&like)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_client(&self, client: &ClientFields) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO clients
               (external_client_key, first_name, last_name, dob, gender, housing_status)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&client.external_client_key)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(client.dob)
        .bind(&client.gender)
        .bind(&client.housing_status)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id() as i64)
    }

    async fn update_client(&self, client_id: i64, client: &ClientFields) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE clients
             SET external_client_key = ?, first_name = ?, last_name = ?,
                 dob = ?, gender = ?, housing_status = ?
             WHERE client_id = ?",
        )
        .bind(&client.external_client_key)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(client.dob)
        .bind(&client.gender)
        .bind(&client.housing_status)
        .bind(client_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add_client_service(&self, record: &NewClientService) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO client_services
               (client_id, program_id, staff_id, service_id, service_date, duration_minutes, notes_ref)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.client_id)
        .bind(record.program_id)
        .bind(record.staff_id)
        .bind(record.service_id)
        .bind(record.service_date)
        .bind(record.duration_minutes)
        .bind(&record.notes_ref)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id() as i64)
    }
}

/// Escape `LIKE` wildcards so user input only matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// View rows have no fixed shape, so decode by the column's reported type.
fn row_to_json(row: &MySqlRow) -> Result<KpiRow, sqlx::Error> {
    let mut out = KpiRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = column_value(row, idx, column.type_info().name())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn column_value(row: &MySqlRow, idx: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let value = match type_name {
        "BOOLEAN" => row.try_get::<Option<bool>, _>(idx)?.map(Value::from),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<Option<i64>, _>(idx)?.map(Value::from)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row.try_get::<Option<u64>, _>(idx)?.map(Value::from),
        "FLOAT" => row
            .try_get::<Option<f32>, _>(idx)?
            .map(|v| Value::from(f64::from(v))),
        "DOUBLE" => row.try_get::<Option<f64>, _>(idx)?.map(Value::from),
        // Kept as the exact text MySQL sends; AVG/SUM in views produce it.
        "DECIMAL" => row
            .try_get_unchecked::<Option<String>, _>(idx)?
            .map(Value::String),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)?
            .map(|d| Value::String(d.to_string())),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(idx)?
            .map(|t| Value::String(t.to_string())),
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S").to_string())),
        "YEAR" => row.try_get_unchecked::<Option<u16>, _>(idx)?.map(Value::from),
        "BIT" => row
            .try_get_unchecked::<Option<Vec<u8>>, _>(idx)?
            .map(|bytes| Value::from(bit_value(&bytes))),
        "NULL" => None,
        _ => row
            .try_get_unchecked::<Option<String>, _>(idx)?
            .map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// BIT(n) arrives big-endian, at most 8 bytes.
fn bit_value(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}
