use serde::{Deserialize, Serialize};

/// Column the implicit tenant predicate applies to.
pub const TENANT_COLUMN: &str = "tenant_id";

/// The implicit condition a query is scoped by. Chosen once, at query build
/// time, from the session's snapshot - never re-read while the query runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantScope {
    /// No tenant predicate. Only privileged sessions build these.
    Unscoped,
    /// `tenant_id = <id>` appended to every WHERE clause.
    Tenant(String),
    /// `tenant_id IS NULL` - the explicit compatibility mode for unresolved
    /// contexts, never the product of a missing value.
    NullOnly,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    pub select: Option<Vec<String>>,
    #[serde(rename = "where")]
    pub where_clause: Option<serde_json::Value>,
    pub order: Option<serde_json::Value>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<serde_json::Value>,
}
