use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::config::UnresolvedReads;
use crate::database::record::Record;
use crate::filter::{Filter, FilterData, TenantScope};
use crate::session::error::SessionError;
use crate::session::interceptor::{InterceptorChain, WriteContext};
use crate::session::scope::EntityScopes;
use crate::session::store::TenantStore;

/// Capability required to open a session that can read across tenants.
/// There is no blanket constructor: holding one is an explicit act of the
/// privileged caller, not something request plumbing hands out.
#[derive(Debug)]
pub struct BypassGrant(());

impl BypassGrant {
    pub fn for_privileged_caller() -> Self {
        BypassGrant(())
    }
}

/// Per-request handle to persistence.
///
/// The tenant value is snapshotted at construction and applied to every read
/// and write issued through this handle; it never tracks later changes to the
/// context it came from, so all queries through one session agree with each
/// other (snapshot stability). One session per request; never shared.
pub struct DataAccessSession {
    snapshot: Option<String>,
    privileged: bool,
    unresolved_reads: UnresolvedReads,
    store: Arc<dyn TenantStore>,
    scopes: Arc<EntityScopes>,
    interceptors: InterceptorChain,
}

impl std::fmt::Debug for DataAccessSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataAccessSession")
            .field("snapshot", &self.snapshot)
            .field("privileged", &self.privileged)
            .field("unresolved_reads", &self.unresolved_reads)
            .finish_non_exhaustive()
    }
}

impl DataAccessSession {
    pub(crate) fn build(
        snapshot: Option<String>,
        privileged: bool,
        unresolved_reads: UnresolvedReads,
        store: Arc<dyn TenantStore>,
        scopes: Arc<EntityScopes>,
    ) -> Self {
        Self {
            snapshot,
            privileged,
            unresolved_reads,
            store,
            scopes,
            interceptors: InterceptorChain::default(),
        }
    }

    /// The tenant this session is confined to, if resolved.
    pub fn tenant_snapshot(&self) -> Option<&str> {
        self.snapshot.as_deref()
    }

    /// Read records of one entity type. Tenant-owned entities are implicitly
    /// confined to the snapshot; the caller predicate cannot widen that.
    pub async fn read(
        &self,
        entity: &str,
        filter: FilterData,
    ) -> Result<Vec<Record>, SessionError> {
        Filter::validate_table_name(entity)?;
        let scope = self.read_scope(entity)?;
        Ok(self.store.select(entity, filter, scope).await?)
    }

    /// Primary-key lookup. Deliberately routed through the same filtered path
    /// as `read` - a key lookup that skipped the scope would be a hole, not an
    /// optimization.
    pub async fn direct_lookup(
        &self,
        entity: &str,
        id: Uuid,
    ) -> Result<Option<Record>, SessionError> {
        let filter = FilterData {
            where_clause: Some(json!({ "id": id.to_string() })),
            limit: Some(1),
            ..Default::default()
        };
        let mut records = self.read(entity, filter).await?;
        Ok(if records.is_empty() { None } else { Some(records.remove(0)) })
    }

    /// Persist created/modified records. Every record is stamped with the
    /// snapshot before the store sees it; an unresolved snapshot fails the
    /// whole batch up front, so no partial writes ever commit.
    pub async fn write(
        &self,
        entity: &str,
        mut records: Vec<Record>,
    ) -> Result<Vec<Record>, SessionError> {
        Filter::validate_table_name(entity)?;

        let tenant_owned = self.scopes.is_tenant_owned(entity);
        if tenant_owned && self.snapshot.is_none() {
            return Err(SessionError::TenantRequired);
        }

        let ctx = WriteContext {
            entity,
            snapshot: self.snapshot.as_deref(),
            tenant_owned,
        };
        self.interceptors.run(&mut records, &ctx)?;

        let scope = if tenant_owned {
            // Checked above; updates stay confined to the snapshot's rows
            TenantScope::Tenant(self.snapshot.clone().ok_or(SessionError::TenantRequired)?)
        } else {
            TenantScope::Unscoped
        };

        tracing::debug!(
            "Persisting {} record(s) to '{}' under {:?}",
            records.len(),
            entity,
            self.snapshot
        );
        Ok(self.store.persist(entity, records, scope).await?)
    }

    /// Read without the tenant predicate. Requires the session to have been
    /// opened with a BypassGrant; everything else is a CrossTenantAttempt.
    pub async fn read_unscoped(
        &self,
        entity: &str,
        filter: FilterData,
    ) -> Result<Vec<Record>, SessionError> {
        if !self.privileged {
            return Err(SessionError::CrossTenantAttempt(entity.to_string()));
        }
        Filter::validate_table_name(entity)?;
        tracing::info!("Unscoped read of '{}' by privileged session", entity);
        Ok(self.store.select(entity, filter, TenantScope::Unscoped).await?)
    }

    fn read_scope(&self, entity: &str) -> Result<TenantScope, SessionError> {
        if !self.scopes.is_tenant_owned(entity) {
            return Ok(TenantScope::Unscoped);
        }
        match (&self.snapshot, self.unresolved_reads) {
            (Some(tenant_id), _) => Ok(TenantScope::Tenant(tenant_id.clone())),
            // Fail closed: an unresolved snapshot refuses tenant-owned reads
            // rather than returning an empty-but-successful result.
            (None, UnresolvedReads::Refuse) => Err(SessionError::TenantRequired),
            // The explicit compatibility mode: visible set is the null-tenant
            // rows, chosen by configuration rather than by accident.
            (None, UnresolvedReads::MatchNull) => Ok(TenantScope::NullOnly),
        }
    }
}
