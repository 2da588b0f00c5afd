use std::sync::{Arc, OnceLock};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Tenant context is already resolved")]
    AlreadyResolved,
}

/// Request-scoped, single-assignment holder of the resolved tenant id.
///
/// Created unresolved, set at most once, then immutable. Reading before the
/// assignment yields None, which every consumer of tenant-owned data treats
/// as a hard stop - never as "no filter". Clones share the same slot, so the
/// value set through one handle is visible through all of them.
#[derive(Debug, Clone, Default)]
pub struct TenantContext {
    slot: Arc<OnceLock<String>>,
}

impl TenantContext {
    /// A context with no tenant assigned yet.
    pub fn unresolved() -> Self {
        Self::default()
    }

    /// A context born resolved. Used by the resolver as its final step, so a
    /// cancelled resolution never leaves a half-assigned context behind.
    pub fn resolved(tenant_id: String) -> Self {
        let slot = OnceLock::new();
        // A fresh lock cannot already be set
        let _ = slot.set(tenant_id);
        Self { slot: Arc::new(slot) }
    }

    /// Perform the one allowed unresolved -> resolved transition. A second
    /// assignment is a programming error, reported rather than applied.
    pub fn resolve(&self, tenant_id: String) -> Result<(), ContextError> {
        self.slot.set(tenant_id).map_err(|_| ContextError::AlreadyResolved)
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.slot.get().map(String::as_str)
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unresolved() {
        let context = TenantContext::unresolved();
        assert!(!context.is_resolved());
        assert_eq!(context.tenant_id(), None);
    }

    #[test]
    fn resolves_exactly_once() {
        let context = TenantContext::unresolved();
        context.resolve("t1".to_string()).unwrap();
        assert_eq!(context.tenant_id(), Some("t1"));

        let err = context.resolve("t2".to_string()).unwrap_err();
        assert!(matches!(err, ContextError::AlreadyResolved));
        // First assignment wins
        assert_eq!(context.tenant_id(), Some("t1"));
    }

    #[test]
    fn clones_share_the_slot() {
        let context = TenantContext::unresolved();
        let handle = context.clone();
        context.resolve("t1".to_string()).unwrap();
        assert_eq!(handle.tenant_id(), Some("t1"));
    }

    #[test]
    fn resolved_constructor_is_set() {
        let context = TenantContext::resolved("t1".to_string());
        assert!(context.is_resolved());
        assert!(context.resolve("t2".to_string()).is_err());
    }
}
