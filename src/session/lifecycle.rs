use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::config::UnresolvedReads;
use crate::session::error::SessionError;
use crate::session::scope::EntityScopes;
use crate::session::session::{BypassGrant, DataAccessSession};
use crate::session::store::TenantStore;
use crate::tenant::context::TenantContext;

const PENDING: u8 = 0;
const RESOLVED: u8 = 1;
const FAILED: u8 = 2;

/// Per-request ordering guard: resolution must complete before any session is
/// constructed. In the HTTP wiring the middleware only installs a
/// RequestScope after resolving, so a pending gate reaching session
/// construction is a wiring defect - surfaced as OrderingViolation rather
/// than silently producing an unscoped handle.
#[derive(Debug)]
pub struct LifecycleGate {
    state: AtomicU8,
}

impl Default for LifecycleGate {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleGate {
    pub fn new() -> Self {
        Self { state: AtomicU8::new(PENDING) }
    }

    /// Resolution finished successfully (including lenient-unresolved).
    pub fn mark_resolved(&self) {
        self.state.store(RESOLVED, Ordering::Release);
    }

    /// Resolution terminated with a failure response.
    pub fn mark_failed(&self) {
        self.state.store(FAILED, Ordering::Release);
    }

    pub fn is_resolved(&self) -> bool {
        self.state.load(Ordering::Acquire) == RESOLVED
    }

    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }
}

/// Everything a handler needs to open sessions for the current request.
/// Installed into request extensions by the resolution middleware.
#[derive(Clone)]
pub struct RequestScope {
    context: TenantContext,
    gate: Arc<LifecycleGate>,
    store: Arc<dyn TenantStore>,
    scopes: Arc<EntityScopes>,
    unresolved_reads: UnresolvedReads,
}

impl RequestScope {
    pub fn new(
        context: TenantContext,
        gate: Arc<LifecycleGate>,
        store: Arc<dyn TenantStore>,
        scopes: Arc<EntityScopes>,
        unresolved_reads: UnresolvedReads,
    ) -> Self {
        Self { context, gate, store, scopes, unresolved_reads }
    }

    pub fn context(&self) -> &TenantContext {
        &self.context
    }

    /// Open a scoped session. Snapshots the context now; later context
    /// changes do not affect the returned session.
    pub fn session(&self) -> Result<DataAccessSession, SessionError> {
        self.open(false)
    }

    /// Open a privileged session able to read across tenants. The grant is
    /// consumed so each privileged session is an explicit, separate act.
    pub fn privileged_session(
        &self,
        _grant: BypassGrant,
    ) -> Result<DataAccessSession, SessionError> {
        self.open(true)
    }

    fn open(&self, privileged: bool) -> Result<DataAccessSession, SessionError> {
        if !self.gate.is_resolved() {
            tracing::error!("Session construction attempted before resolution completed");
            return Err(SessionError::OrderingViolation);
        }
        Ok(DataAccessSession::build(
            self.context.tenant_id().map(str::to_string),
            privileged,
            self.unresolved_reads,
            self.store.clone(),
            self.scopes.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::mem_store::MemStore;

    fn scope_with_gate(gate: Arc<LifecycleGate>) -> RequestScope {
        RequestScope::new(
            TenantContext::resolved("t1".to_string()),
            gate,
            Arc::new(MemStore::new()),
            Arc::new(EntityScopes::default()),
            UnresolvedReads::Refuse,
        )
    }

    #[test]
    fn pending_gate_refuses_session_construction() {
        let scope = scope_with_gate(Arc::new(LifecycleGate::new()));
        let err = scope.session().unwrap_err();
        assert!(matches!(err, SessionError::OrderingViolation));
    }

    #[test]
    fn failed_gate_refuses_session_construction() {
        let gate = Arc::new(LifecycleGate::new());
        gate.mark_failed();
        let scope = scope_with_gate(gate);
        assert!(matches!(scope.session(), Err(SessionError::OrderingViolation)));
    }

    #[test]
    fn resolved_gate_allows_sessions() {
        let gate = Arc::new(LifecycleGate::new());
        gate.mark_resolved();
        let scope = scope_with_gate(gate);
        let session = scope.session().unwrap();
        assert_eq!(session.tenant_snapshot(), Some("t1"));
    }

    #[tokio::test]
    async fn privileged_sessions_come_only_from_a_grant() {
        let gate = Arc::new(LifecycleGate::new());
        gate.mark_resolved();
        let store = Arc::new(MemStore::new());
        let scope = RequestScope::new(
            TenantContext::resolved("t1".to_string()),
            gate,
            store,
            Arc::new(EntityScopes::default()),
            UnresolvedReads::Refuse,
        );

        // A plain session cannot read across tenants
        let session = scope.session().unwrap();
        let err = session
            .read_unscoped("products", crate::filter::FilterData::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::CrossTenantAttempt(_)));

        // A granted session can
        let privileged =
            scope.privileged_session(BypassGrant::for_privileged_caller()).unwrap();
        let records = privileged
            .read_unscoped("products", crate::filter::FilterData::default())
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn session_snapshot_ignores_later_context_resolution() {
        let gate = Arc::new(LifecycleGate::new());
        gate.mark_resolved();
        let context = TenantContext::unresolved();
        let scope = RequestScope::new(
            context.clone(),
            gate,
            Arc::new(MemStore::new()),
            Arc::new(EntityScopes::default()),
            UnresolvedReads::Refuse,
        );
        let session = scope.session().unwrap();
        assert_eq!(session.tenant_snapshot(), None);

        // Context resolves after the fact; the session stays frozen
        context.resolve("t9".to_string()).unwrap();
        assert_eq!(session.tenant_snapshot(), None);

        // A session opened after resolution sees the new value
        let later = scope.session().unwrap();
        assert_eq!(later.tenant_snapshot(), Some("t9"));
    }
}
