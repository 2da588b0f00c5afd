// In-memory implementation of the TenantStore surface.
//
// Interprets the same predicate language the Postgres store compiles, so the
// two are interchangeable behind the session. Used by the integration tests
// and by single-process installs that don't want a database.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::database::record::{Operation, Record};
use crate::filter::eval;
use crate::filter::filter_order::FilterOrder;
use crate::filter::{Filter, FilterData, TenantScope};
use crate::session::store::{StoreError, TenantStore};

#[derive(Default)]
pub struct MemStore {
    tables: RwLock<HashMap<String, Vec<Map<String, Value>>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in a table, unscoped. Test/diagnostic helper.
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map(|rows| rows.len()).unwrap_or(0)
    }
}

#[async_trait]
impl TenantStore for MemStore {
    async fn select(
        &self,
        table: &str,
        filter: FilterData,
        scope: TenantScope,
    ) -> Result<Vec<Record>, StoreError> {
        Filter::validate_table_name(table)?;
        let order = match &filter.order {
            Some(spec) => FilterOrder::validate_and_parse(spec)?,
            None => vec![],
        };

        let tables = self.tables.read().await;
        let rows = tables.get(table).cloned().unwrap_or_default();
        drop(tables);

        let mut matched = Vec::new();
        for row in rows {
            if !eval::in_scope(&row, &scope) {
                continue;
            }
            if eval::matches_where(&row, filter.where_clause.as_ref())? {
                matched.push(row);
            }
        }

        eval::sort_records(&mut matched, &order);

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let matched: Vec<_> = match filter.limit {
            Some(limit) => matched.into_iter().skip(offset).take(limit.max(0) as usize).collect(),
            None => matched.into_iter().skip(offset).collect(),
        };

        // Column projection, mirroring an explicit SELECT list
        let projected = match &filter.select {
            Some(columns) if !columns.is_empty() && !columns.contains(&"*".to_string()) => matched
                .into_iter()
                .map(|row| {
                    row.into_iter().filter(|(k, _)| columns.contains(k)).collect::<Map<_, _>>()
                })
                .collect(),
            _ => matched,
        };

        Ok(projected.into_iter().map(Record::from).collect())
    }

    async fn persist(
        &self,
        table: &str,
        records: Vec<Record>,
        scope: TenantScope,
    ) -> Result<Vec<Record>, StoreError> {
        Filter::validate_table_name(table)?;

        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();

        // Plan first, mutate second: a batch either applies whole or not at all
        enum Plan {
            Insert(Map<String, Value>),
            Replace(usize, Map<String, Value>),
        }

        let mut plans = Vec::with_capacity(records.len());
        for record in &records {
            match record.operation() {
                Operation::Create => plans.push(Plan::Insert(record.to_map())),
                Operation::Update => {
                    let id = record.id().ok_or(StoreError::MissingId)?.to_string();
                    let index = rows
                        .iter()
                        .position(|row| {
                            row.get("id").and_then(|v| v.as_str()) == Some(id.as_str())
                                && eval::in_scope(row, &scope)
                        })
                        .ok_or(StoreError::NotFound)?;
                    let mut merged = rows[index].clone();
                    for (key, value) in record.to_map() {
                        merged.insert(key, value);
                    }
                    plans.push(Plan::Replace(index, merged));
                }
                Operation::Select => continue,
            }
        }

        let mut persisted = Vec::with_capacity(plans.len());
        for plan in plans {
            match plan {
                Plan::Insert(row) => {
                    persisted.push(Record::from(row.clone()));
                    rows.push(row);
                }
                Plan::Replace(index, row) => {
                    rows[index] = row.clone();
                    persisted.push(Record::from(row));
                }
            }
        }

        tracing::debug!("Persisted {} record(s) to '{}'", persisted.len(), table);
        Ok(persisted)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(fields: Value) -> Record {
        let mut record = Record::from_json(fields).unwrap();
        record.set_id(uuid::Uuid::new_v4());
        record
    }

    fn stamped(fields: Value, tenant: &str) -> Record {
        let mut record = create(fields);
        record.set_tenant_id(tenant);
        record
    }

    #[tokio::test]
    async fn select_honors_scope() {
        let store = MemStore::new();
        store
            .persist(
                "products",
                vec![stamped(json!({"name": "a"}), "t1"), stamped(json!({"name": "b"}), "t2")],
                TenantScope::Unscoped,
            )
            .await
            .unwrap();

        let rows = store
            .select("products", FilterData::default(), TenantScope::Tenant("t1".into()))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&json!("a")));
    }

    #[tokio::test]
    async fn update_outside_scope_is_not_found() {
        let store = MemStore::new();
        let persisted = store
            .persist("products", vec![stamped(json!({"name": "a"}), "t1")], TenantScope::Unscoped)
            .await
            .unwrap();

        let mut change = Record::new();
        change.set_id(persisted[0].id().unwrap());
        change.set_operation(Operation::Update);
        change.set("name", json!("hijacked"));

        let err = store
            .persist("products", vec![change], TenantScope::Tenant("t2".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        // Untouched
        let rows = store
            .select("products", FilterData::default(), TenantScope::Tenant("t1".into()))
            .await
            .unwrap();
        assert_eq!(rows[0].get("name"), Some(&json!("a")));
    }

    #[tokio::test]
    async fn failed_batch_applies_nothing() {
        let store = MemStore::new();

        let mut missing = Record::new();
        missing.set_id(uuid::Uuid::new_v4());
        missing.set_operation(Operation::Update);
        missing.set("name", json!("ghost"));

        let batch = vec![stamped(json!({"name": "new"}), "t1"), missing];
        let err = store.persist("products", batch, TenantScope::Unscoped).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert_eq!(store.row_count("products").await, 0);
    }

    #[tokio::test]
    async fn select_projects_columns() {
        let store = MemStore::new();
        store
            .persist(
                "products",
                vec![stamped(json!({"name": "a", "qty": 3}), "t1")],
                TenantScope::Unscoped,
            )
            .await
            .unwrap();

        let filter = FilterData { select: Some(vec!["name".into()]), ..Default::default() };
        let rows = store.select("products", filter, TenantScope::Unscoped).await.unwrap();
        assert_eq!(rows[0].get("name"), Some(&json!("a")));
        assert_eq!(rows[0].get("qty"), None);
    }
}
