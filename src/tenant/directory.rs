use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::tenant::registry::{DirectoryError, TenantRegistry};

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    valid: bool,
    inserted_at: Instant,
}

/// Validation front for the tenant registry.
///
/// Answers "does tenant X exist and is it active?" from a bounded TTL cache,
/// falling back to the registry on a miss. Staleness is bounded and
/// documented: a positive entry can outlive a deactivation by up to the TTL,
/// so a just-retired tenant may keep resolving for that window unless
/// `invalidate` is called. Reads take the shared lock; only cache population
/// and invalidation take the exclusive one.
pub struct TenantDirectory {
    registry: Arc<dyn TenantRegistry>,
    cache: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl TenantDirectory {
    pub fn new(registry: Arc<dyn TenantRegistry>, ttl: Duration, capacity: usize) -> Self {
        Self { registry, cache: RwLock::new(HashMap::new()), ttl, capacity }
    }

    /// Check whether a tenant exists and is active. Absence and inactivity
    /// both come back as Ok(false); Err is reserved for registry faults.
    pub async fn validate(&self, tenant_id: &str) -> Result<bool, DirectoryError> {
        // Fast path: fresh cache entry
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(tenant_id) {
                if entry.inserted_at.elapsed() < self.ttl {
                    tracing::debug!("Tenant '{}' cache hit (valid={})", tenant_id, entry.valid);
                    return Ok(entry.valid);
                }
            }
        }

        let valid = self
            .registry
            .lookup(tenant_id)
            .await?
            .map(|tenant| tenant.is_live())
            .unwrap_or(false);

        {
            let mut cache = self.cache.write().await;
            if cache.len() >= self.capacity {
                let ttl = self.ttl;
                cache.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
            }
            // Still full after eviction: serve uncached rather than dropping
            // a live entry
            if cache.len() < self.capacity || cache.contains_key(tenant_id) {
                cache.insert(
                    tenant_id.to_string(),
                    CacheEntry { valid, inserted_at: Instant::now() },
                );
            } else {
                tracing::warn!("Tenant cache at capacity ({}), not caching '{}'", self.capacity, tenant_id);
            }
        }

        tracing::debug!("Tenant '{}' validated against registry (valid={})", tenant_id, valid);
        Ok(valid)
    }

    /// Drop the cache entry for a tenant, e.g. when a deactivation must take
    /// effect before the TTL would let it.
    pub async fn invalidate(&self, tenant_id: &str) {
        self.cache.write().await.remove(tenant_id);
        tracing::info!("Invalidated tenant cache entry for '{}'", tenant_id);
    }
}
