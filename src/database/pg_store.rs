// Postgres implementation of the TenantStore surface.
//
// Predicates arrive as structured FilterData plus the already-decided
// TenantScope; both are compiled to parameterized SQL here and nowhere else.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow, PgTypeInfo};
use sqlx::{Column, PgPool, Row, TypeInfo};
use uuid::Uuid;

use crate::database::record::{Operation, Record};
use crate::filter::{Filter, FilterData, TenantScope, TENANT_COLUMN};
use crate::session::store::{StoreError, TenantStore};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_record(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        table: &str,
        record: &Record,
    ) -> Result<Record, StoreError> {
        let map = record.to_map();
        let mut columns: Vec<&String> = map.keys().collect();
        columns.sort();
        for column in &columns {
            Filter::validate_column_name(column)?;
        }

        let column_list =
            columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ");
        let placeholders =
            (1..=columns.len()).map(|i| format!("${}", i)).collect::<Vec<_>>().join(", ");
        let query = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *",
            table, column_list, placeholders
        );

        let mut q = sqlx::query(&query);
        for column in &columns {
            q = bind_field(q, column, &map[column.as_str()]);
        }

        let row = q.fetch_one(&mut **tx).await?;
        row_to_record(&row)
    }

    async fn update_record(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        table: &str,
        record: &Record,
        scope: &TenantScope,
    ) -> Result<Record, StoreError> {
        let id = record.id().ok_or(StoreError::MissingId)?;

        let map = record.to_map();
        let mut columns: Vec<&String> = map.keys().filter(|k| k.as_str() != "id").collect();
        columns.sort();
        for column in &columns {
            Filter::validate_column_name(column)?;
        }

        let set_clauses = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("\"{}\" = ${}", c, i + 1))
            .collect::<Vec<_>>()
            .join(", ");

        let id_placeholder = columns.len() + 1;
        let scope_clause = match scope {
            TenantScope::Unscoped => String::new(),
            TenantScope::Tenant(_) => {
                format!(" AND \"{}\" = ${}", TENANT_COLUMN, id_placeholder + 1)
            }
            TenantScope::NullOnly => format!(" AND \"{}\" IS NULL", TENANT_COLUMN),
        };

        let query = format!(
            "UPDATE \"{}\" SET {} WHERE \"id\" = ${}{} RETURNING *",
            table, set_clauses, id_placeholder, scope_clause
        );

        let mut q = sqlx::query(&query);
        for column in &columns {
            q = bind_field(q, column, &map[column.as_str()]);
        }
        q = q.bind(id);
        if let TenantScope::Tenant(tenant_id) = scope {
            q = q.bind(tenant_id.clone());
        }

        // Zero rows means the id does not exist inside this scope; a row
        // belonging to another tenant is indistinguishable from no row at all
        let row = q.fetch_optional(&mut **tx).await?.ok_or(StoreError::NotFound)?;
        row_to_record(&row)
    }
}

#[async_trait]
impl TenantStore for PgStore {
    async fn select(
        &self,
        table: &str,
        filter: FilterData,
        scope: TenantScope,
    ) -> Result<Vec<Record>, StoreError> {
        let mut compiled = Filter::new(table, scope)?;
        compiled.assign(filter)?;
        let sql = compiled.to_sql()?;

        let mut q = sqlx::query(&sql.query);
        for param in &sql.params {
            q = bind_param(q, param);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn persist(
        &self,
        table: &str,
        records: Vec<Record>,
        scope: TenantScope,
    ) -> Result<Vec<Record>, StoreError> {
        Filter::validate_table_name(table)?;

        let mut tx = self.pool.begin().await?;
        let mut persisted = Vec::with_capacity(records.len());
        for record in &records {
            match record.operation() {
                Operation::Create => {
                    persisted.push(self.insert_record(&mut tx, table, record).await?);
                }
                Operation::Update => {
                    persisted.push(self.update_record(&mut tx, table, record, &scope).await?);
                }
                Operation::Select => continue,
            }
        }
        tx.commit().await?;

        tracing::debug!("Persisted {} record(s) to '{}'", persisted.len(), table);
        Ok(persisted)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Bind a record field, mapping system fields to their native column types.
fn bind_field<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    column: &str,
    value: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match column {
        "id" => {
            if let Some(id) = value.as_str().and_then(|s| Uuid::parse_str(s).ok()) {
                return q.bind(id);
            }
            bind_param(q, value)
        }
        "created_at" | "updated_at" => {
            if let Some(ts) = value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
            {
                return q.bind(ts);
            }
            bind_param(q, value)
        }
        _ => bind_param(q, value),
    }
}

/// Bind a JSON value by its own type
fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres doesn't have u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()), // JSONB
    }
}

/// Convert a database row to a Record, field by typed field
fn row_to_record(row: &PgRow) -> Result<Record, StoreError> {
    let mut data = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = extract_column_value(row, i, column.type_info());
        data.insert(column.name().to_string(), value);
    }
    Ok(Record::from(data))
}

fn extract_column_value(row: &PgRow, index: usize, type_info: &PgTypeInfo) -> Value {
    match type_info.name() {
        "UUID" => row
            .try_get::<Option<Uuid>, _>(index)
            .ok()
            .flatten()
            .map(|u| Value::String(u.to_string()))
            .unwrap_or(Value::Null),
        "TEXT" | "VARCHAR" => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|n| Value::Number(i64::from(n).into()))
            .unwrap_or(Value::Null),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|n| Value::Number(i64::from(n).into()))
            .unwrap_or(Value::Null),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(|n| Value::Number(n.into()))
            .unwrap_or(Value::Null),
        "FLOAT4" | "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
            .unwrap_or(Value::Null),
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "JSONB" | "JSON" => {
            row.try_get::<Option<Value>, _>(index).ok().flatten().unwrap_or(Value::Null)
        }
        "TIMESTAMPTZ" | "TIMESTAMP" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|t| Value::String(t.to_rfc3339()))
            .unwrap_or(Value::Null),
        other => {
            tracing::warn!("Unhandled PostgreSQL type: {}, falling back to null", other);
            Value::Null
        }
    }
}
