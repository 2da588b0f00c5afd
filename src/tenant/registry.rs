use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::database::models::Tenant;

/// Errors from the persisted tenant registry. Absence of a tenant is not an
/// error - lookups answer it with Ok(None).
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Tenant registry unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Authoritative source of tenants. Read-mostly; administered out of band.
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    async fn lookup(&self, tenant_id: &str) -> Result<Option<Tenant>, DirectoryError>;
}

/// Registry backed by the `tenants` table.
pub struct PgTenantRegistry {
    pool: PgPool,
}

impl PgTenantRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantRegistry for PgTenantRegistry {
    async fn lookup(&self, tenant_id: &str) -> Result<Option<Tenant>, DirectoryError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, active, created_at, updated_at FROM tenants WHERE id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }
}

/// Fixed in-memory registry for development, tests, and single-tenant
/// installs. Supports deactivation so operators can retire a tenant without
/// restarting.
#[derive(Default)]
pub struct StaticTenantRegistry {
    tenants: RwLock<HashMap<String, Tenant>>,
}

impl StaticTenantRegistry {
    pub fn new(tenant_ids: impl IntoIterator<Item = String>) -> Self {
        let now = Utc::now();
        let tenants = tenant_ids
            .into_iter()
            .map(|id| {
                let tenant = Tenant {
                    id: id.clone(),
                    name: id.clone(),
                    active: true,
                    created_at: now,
                    updated_at: now,
                };
                (id, tenant)
            })
            .collect();
        Self { tenants: RwLock::new(tenants) }
    }

    pub async fn insert(&self, tenant: Tenant) {
        self.tenants.write().await.insert(tenant.id.clone(), tenant);
    }

    /// Retire a tenant. New resolutions fail once caches expire or are
    /// invalidated; in-flight sessions keep their snapshot.
    pub async fn deactivate(&self, tenant_id: &str) {
        if let Some(tenant) = self.tenants.write().await.get_mut(tenant_id) {
            tenant.active = false;
            tenant.updated_at = Utc::now();
        }
    }
}

#[async_trait]
impl TenantRegistry for StaticTenantRegistry {
    async fn lookup(&self, tenant_id: &str) -> Result<Option<Tenant>, DirectoryError> {
        Ok(self.tenants.read().await.get(tenant_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_registry_answers_absence_with_none() {
        let registry = StaticTenantRegistry::new(["t1".to_string()]);
        assert!(registry.lookup("t1").await.unwrap().is_some());
        assert!(registry.lookup("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deactivation_flips_active() {
        let registry = StaticTenantRegistry::new(["t1".to_string()]);
        registry.deactivate("t1").await;
        let tenant = registry.lookup("t1").await.unwrap().unwrap();
        assert!(!tenant.active);
    }
}
