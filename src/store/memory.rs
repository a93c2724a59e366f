//! In-memory store
//!
//! Same contract as the MySQL store, for tests and running without a
//! database. Multi-step writes run against a copy of the state that only
//! replaces the live state on success, which gives all-or-nothing
//! behaviour matching a rolled-back transaction.

use crate::auth::models::{Role, UserWithRoles};
use crate::models::{
    ClientFields, ClientMatch, KpiRow, KpiView, NewClientService, NewUser, ProgramOption,
    ServiceOption, StaffOption, StoredCredentials,
};
use crate::store::{CaseStore, StoreError};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

#[derive(Debug, Clone)]
struct UserRecord {
    user_id: i64,
    email: String,
    full_name: String,
    password_hash: String,
    is_active: bool,
    last_login_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
struct ClientRecord {
    client_id: i64,
    fields: ClientFields,
    is_active: bool,
}

#[derive(Debug, Clone, Default)]
struct State {
    users: Vec<UserRecord>,
    roles: Vec<(i64, String)>,
    user_roles: Vec<(i64, i64)>,
    programs: Vec<(ProgramOption, bool)>,
    staff: Vec<(StaffOption, bool)>,
    services: Vec<ServiceOption>,
    clients: Vec<ClientRecord>,
    client_services: Vec<(i64, NewClientService)>,
    kpi: HashMap<KpiView, Vec<KpiRow>>,
}

impl State {
    fn user_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.email == email)
    }

    fn insert_user(&mut self, user: &NewUser, is_active: bool) -> i64 {
        let user_id = self.users.len() as i64 + 1;
        self.users.push(UserRecord {
            user_id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            password_hash: user.password_hash.clone(),
            is_active,
            last_login_at: None,
        });
        user_id
    }

    fn role_id(&self, name: &str) -> Option<i64> {
        self.roles.iter().find(|(_, n)| n == name).map(|(id, _)| *id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    client_searches: AtomicUsize,
}

impl InMemoryStore {
    /// Store seeded with the four standard roles (ids 1-4, Staff = 4).
    pub fn new() -> Self {
        let store = Self::default();
        {
            let mut state = store.state.write();
            for (idx, role) in [Role::Admin, Role::Executive, Role::ProgramDirector, Role::Staff]
                .iter()
                .enumerate()
            {
                state.roles.push((idx as i64 + 1, role.as_str().to_string()));
            }
        }
        store
    }

    /// Store with an empty `app_roles` table.
    pub fn without_roles() -> Self {
        Self::default()
    }

    /// Run `f` on a copy of the state and keep the copy only if it succeeds.
    fn transact<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut live = self.state.write();
        let mut draft = live.clone();
        let out = f(&mut draft)?;
        *live = draft;
        Ok(out)
    }

    pub fn seed_program(&self, name: &str, is_active: bool) -> i64 {
        let mut state = self.state.write();
        let program_id = state.programs.len() as i64 + 1;
        state.programs.push((
            ProgramOption {
                program_id,
                program_name: name.to_string(),
            },
            is_active,
        ));
        program_id
    }

    pub fn seed_staff(&self, full_name: &str, is_active: bool) -> i64 {
        let mut state = self.state.write();
        let staff_id = state.staff.len() as i64 + 1;
        state.staff.push((
            StaffOption {
                staff_id,
                full_name: full_name.to_string(),
            },
            is_active,
        ));
        staff_id
    }

    pub fn seed_service(&self, service_type: &str) -> i64 {
        let mut state = self.state.write();
        let service_id = state.services.len() as i64 + 1;
        state.services.push(ServiceOption {
            service_id,
            service_type: service_type.to_string(),
        });
        service_id
    }

    pub fn seed_client(&self, fields: ClientFields, is_active: bool) -> i64 {
        let mut state = self.state.write();
        let client_id = state.clients.len() as i64 + 1;
        state.clients.push(ClientRecord {
            client_id,
            fields,
            is_active,
        });
        client_id
    }

    pub fn set_kpi_rows(&self, view: KpiView, rows: Vec<KpiRow>) {
        self.state.write().kpi.insert(view, rows);
    }

    /// Grant `role` to an existing user, as an administrator would in the database.
    pub fn assign_role(&self, user_id: i64, role: Role) -> Result<(), StoreError> {
        self.transact(|state| {
            let role_id = state
                .role_id(role.as_str())
                .ok_or_else(|| StoreError::MissingRole(role.to_string()))?;
            state.user_roles.push((user_id, role_id));
            Ok(())
        })
    }

    pub fn set_active(&self, user_id: i64, is_active: bool) {
        let mut state = self.state.write();
        if let Some(user) = state.users.iter_mut().find(|u| u.user_id == user_id) {
            user.is_active = is_active;
        }
    }

    pub fn user_rows_for_email(&self, email: &str) -> usize {
        self.state
            .read()
            .users
            .iter()
            .filter(|u| u.email == email)
            .count()
    }

    pub fn role_assignments(&self, user_id: i64) -> usize {
        self.state
            .read()
            .user_roles
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .count()
    }

    pub fn last_login_at(&self, user_id: i64) -> Option<NaiveDateTime> {
        self.state
            .read()
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .and_then(|u| u.last_login_at)
    }

    pub fn client(&self, client_id: i64) -> Option<ClientFields> {
        self.state
            .read()
            .clients
            .iter()
            .find(|c| c.client_id == client_id)
            .map(|c| c.fields.clone())
    }

    pub fn client_service(&self, client_service_id: i64) -> Option<NewClientService> {
        self.state
            .read()
            .client_services
            .iter()
            .find(|(id, _)| *id == client_service_id)
            .map(|(_, record)| record.clone())
    }

    /// How many times `search_clients` reached the store.
    pub fn client_search_count(&self) -> usize {
        self.client_searches.load(AtomicOrdering::Relaxed)
    }
}

#[async_trait]
impl CaseStore for InMemoryStore {
    async fn ping(&self) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        Ok([
            "app_roles",
            "app_user_roles",
            "app_users",
            "client_services",
            "clients",
            "programs",
            "services",
            "staff",
        ]
        .iter()
        .map(|t| t.to_string())
        .collect())
    }

    async fn get_user_with_roles_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithRoles>, StoreError> {
        let state = self.state.read();
        let Some(user) = state.user_by_email(email) else {
            return Ok(None);
        };

        let roles = state
            .user_roles
            .iter()
            .filter(|(uid, _)| *uid == user.user_id)
            .filter_map(|(_, rid)| state.roles.iter().find(|(id, _)| id == rid))
            .map(|(_, name)| name.clone())
            .collect();

        Ok(Some(UserWithRoles {
            user_id: user.user_id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            password_hash: user.password_hash.clone(),
            is_active: user.is_active,
            roles,
        }))
    }

    async fn get_credentials(&self, user_id: i64) -> Result<Option<StoredCredentials>, StoreError> {
        Ok(self
            .state
            .read()
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .map(|u| StoredCredentials {
                password_hash: u.password_hash.clone(),
                is_active: u.is_active,
            }))
    }

    async fn register_user(&self, user: &NewUser, role_id: i64) -> Result<i64, StoreError> {
        self.transact(|state| {
            if state.user_by_email(&user.email).is_some() {
                return Err(StoreError::Conflict);
            }
            let user_id = state.insert_user(user, true);
            if !state.roles.iter().any(|(id, _)| *id == role_id) {
                return Err(StoreError::MissingRole(format!("role_id {role_id}")));
            }
            state.user_roles.push((user_id, role_id));
            Ok(user_id)
        })
    }

    async fn bootstrap_admin(&self, user: &NewUser) -> Result<i64, StoreError> {
        self.transact(|state| {
            if state.user_by_email(&user.email).is_some() {
                return Err(StoreError::Conflict);
            }
            let user_id = state.insert_user(user, true);
            let role_id = state
                .role_id(Role::Admin.as_str())
                .ok_or_else(|| StoreError::MissingRole(Role::Admin.to_string()))?;
            state.user_roles.push((user_id, role_id));
            Ok(user_id)
        })
    }

    async fn record_login(&self, user_id: i64) -> Result<(), StoreError> {
        let mut state = self.state.write();
        if let Some(user) = state.users.iter_mut().find(|u| u.user_id == user_id) {
            user.last_login_at = Some(Utc::now().naive_utc());
        }
        Ok(())
    }

    async fn update_password_hash(
        &self,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write();
        if let Some(user) = state.users.iter_mut().find(|u| u.user_id == user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn kpi_rows(&self, view: KpiView) -> Result<Vec<KpiRow>, StoreError> {
        let mut rows = self
            .state
            .read()
            .kpi
            .get(&view)
            .cloned()
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            view.order()
                .iter()
                .map(|key| {
                    let ord = compare_json(a.get(key.column), b.get(key.column));
                    if key.descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        if let Some(limit) = view.limit() {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn list_programs(&self) -> Result<Vec<ProgramOption>, StoreError> {
        let mut rows: Vec<ProgramOption> = self
            .state
            .read()
            .programs
            .iter()
            .filter(|(_, active)| *active)
            .map(|(p, _)| p.clone())
            .collect();
        rows.sort_by(|a, b| a.program_name.cmp(&b.program_name));
        Ok(rows)
    }

    async fn list_staff(&self) -> Result<Vec<StaffOption>, StoreError> {
        let mut rows: Vec<StaffOption> = self
            .state
            .read()
            .staff
            .iter()
            .filter(|(_, active)| *active)
            .map(|(s, _)| s.clone())
            .collect();
        rows.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(rows)
    }

    async fn list_services(&self) -> Result<Vec<ServiceOption>, StoreError> {
        let mut rows = self.state.read().services.clone();
        rows.sort_by(|a, b| a.service_type.cmp(&b.service_type));
        Ok(rows)
    }

    async fn search_clients(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<ClientMatch>, StoreError> {
        self.client_searches.fetch_add(1, AtomicOrdering::Relaxed);

        let needle = query.to_lowercase();
        let matches = |s: &str| s.to_lowercase().contains(&needle);

        let state = self.state.read();
        let mut rows: Vec<&ClientRecord> = state
            .clients
            .iter()
            .filter(|c| c.is_active)
            .filter(|c| {
                matches(&c.fields.external_client_key)
                    || matches(&c.fields.first_name)
                    || matches(&c.fields.last_name)
            })
            .collect();
        rows.sort_by(|a, b| {
            (&a.fields.last_name, &a.fields.first_name)
                .cmp(&(&b.fields.last_name, &b.fields.first_name))
        });

        Ok(rows
            .into_iter()
            .take(limit as usize)
            .map(|c| ClientMatch {
                client_id: c.client_id,
                external_client_key: Some(c.fields.external_client_key.clone()),
                first_name: c.fields.first_name.clone(),
                last_name: c.fields.last_name.clone(),
            })
            .collect())
    }

    async fn create_client(&self, client: &ClientFields) -> Result<i64, StoreError> {
        Ok(self.seed_client(client.clone(), true))
    }

    async fn update_client(&self, client_id: i64, client: &ClientFields) -> Result<(), StoreError> {
        let mut state = self.state.write();
        if let Some(record) = state.clients.iter_mut().find(|c| c.client_id == client_id) {
            record.fields = client.clone();
        }
        Ok(())
    }

    async fn add_client_service(&self, record: &NewClientService) -> Result<i64, StoreError> {
        let mut state = self.state.write();
        let id = state.client_services.len() as i64 + 1;
        state.client_services.push((id, record.clone()));
        Ok(id)
    }
}

/// Nulls first, numbers numerically, everything else as text.
fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            full_name: "Test User".to_string(),
            password_hash: "hash".to_string(),
        }
    }

    fn client(key: &str, first: &str, last: &str) -> ClientFields {
        ClientFields {
            external_client_key: key.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            dob: None,
            gender: None,
            housing_status: None,
        }
    }

    fn row(value: serde_json::Value) -> KpiRow {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_register_then_lookup_with_roles() {
        let store = InMemoryStore::new();
        let user_id = store.register_user(&new_user("a@example.org"), 4).await.unwrap();

        let user = store
            .get_user_with_roles_by_email("a@example.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.roles, vec!["Staff".to_string()]);
        assert!(user.is_active);

        assert!(store
            .get_user_with_roles_by_email("missing@example.org")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_register_duplicate_conflicts() {
        let store = InMemoryStore::new();
        store.register_user(&new_user("a@example.org"), 4).await.unwrap();
        let err = store.register_user(&new_user("a@example.org"), 4).await;
        assert!(matches!(err, Err(StoreError::Conflict)));
        assert_eq!(store.user_rows_for_email("a@example.org"), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_rolls_back_without_admin_role() {
        let store = InMemoryStore::without_roles();
        let err = store.bootstrap_admin(&new_user("root@example.org")).await;
        assert!(matches!(err, Err(StoreError::MissingRole(_))));
        assert_eq!(store.user_rows_for_email("root@example.org"), 0);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_capped() {
        let store = InMemoryStore::new();
        for i in 0..25 {
            store.seed_client(client(&format!("K-{i:02}"), "Alex", &format!("Smith{i:02}")), true);
        }
        store.seed_client(client("K-99", "SMITHY", "Zed"), false);

        let rows = store.search_clients("smith", 20).await.unwrap();
        assert_eq!(rows.len(), 20);
        assert_eq!(rows[0].last_name, "Smith00");
        assert!(rows.iter().all(|r| r.last_name != "Zed"));
        assert_eq!(store.client_search_count(), 1);
    }

    #[tokio::test]
    async fn test_kpi_ordering_and_cap() {
        let store = InMemoryStore::new();
        let rows = (1..=30)
            .map(|m| row(json!({ "month_start": format!("2023-{:02}-01", (m % 12) + 1), "n": m })))
            .collect();
        store.set_kpi_rows(KpiView::OrgMonthly, rows);

        let out = store.kpi_rows(KpiView::OrgMonthly).await.unwrap();
        assert_eq!(out.len(), 24);
        assert_eq!(out[0]["month_start"], "2023-12-01");

        store.set_kpi_rows(
            KpiView::StaffCaseload,
            vec![
                row(json!({ "full_name": "Bea", "active_caseload": 3 })),
                row(json!({ "full_name": "Ann", "active_caseload": 3 })),
                row(json!({ "full_name": "Cal", "active_caseload": 9 })),
            ],
        );
        let out = store.kpi_rows(KpiView::StaffCaseload).await.unwrap();
        let names: Vec<_> = out.iter().map(|r| r["full_name"].clone()).collect();
        assert_eq!(names, vec![json!("Cal"), json!("Ann"), json!("Bea")]);
    }
}
