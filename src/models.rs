//! Case-management records and request bodies

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// A KPI view row keyed by column name. Column sets are owned by the views.
pub type KpiRow = serde_json::Map<String, Value>;

/// Account insert shared by register and bootstrap-admin.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
}

/// Hash and status needed to re-check a password.
#[derive(Debug, Clone, FromRow)]
pub struct StoredCredentials {
    pub password_hash: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ProgramOption {
    pub program_id: i64,
    pub program_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct StaffOption {
    pub staff_id: i64,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ServiceOption {
    pub service_id: i64,
    pub service_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ClientMatch {
    pub client_id: i64,
    pub external_client_key: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

/// Validated client columns, trimmed and ready to write.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientFields {
    pub external_client_key: String,
    pub first_name: String,
    pub last_name: String,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub housing_status: Option<String>,
}

/// Validated `client_services` insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClientService {
    pub client_id: i64,
    pub program_id: i64,
    pub staff_id: Option<i64>,
    pub service_id: i64,
    pub service_date: NaiveDate,
    pub duration_minutes: i64,
    pub notes_ref: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientRequest {
    pub external_client_key: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub housing_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddServiceRequest {
    pub client_id: Option<i64>,
    pub program_id: Option<i64>,
    pub staff_id: Option<i64>,
    pub service_id: Option<i64>,
    pub service_date: Option<NaiveDate>,
    pub duration_minutes: Option<i64>,
    pub notes_ref: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientSearchQuery {
    pub q: Option<String>,
}

/// Precomputed aggregation views behind the KPI endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KpiView {
    OrgMonthly,
    ProgramMonthly,
    StaffCaseload,
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, Copy)]
pub struct SortKey {
    pub column: &'static str,
    pub descending: bool,
}

impl KpiView {
    pub fn view_name(&self) -> &'static str {
        match self {
            KpiView::OrgMonthly => "v_exec_org_monthly",
            KpiView::ProgramMonthly => "v_program_monthly",
            KpiView::StaffCaseload => "v_staff_caseload_active",
        }
    }

    pub fn order(&self) -> &'static [SortKey] {
        match self {
            KpiView::OrgMonthly => &[SortKey { column: "month_start", descending: true }],
            KpiView::ProgramMonthly => &[
                SortKey { column: "month_start", descending: true },
                SortKey { column: "program_name", descending: false },
            ],
            KpiView::StaffCaseload => &[
                SortKey { column: "active_caseload", descending: true },
                SortKey { column: "full_name", descending: false },
            ],
        }
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            KpiView::OrgMonthly => Some(24),
            KpiView::ProgramMonthly => Some(500),
            KpiView::StaffCaseload => None,
        }
    }

    /// Fixed query text; every part comes from the constants above.
    pub fn sql(&self) -> String {
        let order = self
            .order()
            .iter()
            .map(|k| format!("{} {}", k.column, if k.descending { "DESC" } else { "ASC" }))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT * FROM {} ORDER BY {}", self.view_name(), order);
        if let Some(limit) = self.limit() {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        sql
    }
}
