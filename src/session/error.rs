use thiserror::Error;

/// Failures raised by the session surface. Each names the isolation guarantee
/// it refuses to degrade; none is recoverable by retrying the same call.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Operation on tenant-owned data requires a resolved tenant")]
    TenantRequired,

    #[error("Unscoped access to '{0}' requires a privileged session")]
    CrossTenantAttempt(String),

    #[error("Session constructed before tenant resolution completed")]
    OrderingViolation,

    #[error("Filter error: {0}")]
    Filter(#[from] crate::filter::error::FilterError),

    #[error("Record error: {0}")]
    Record(#[from] crate::database::record::RecordError),

    #[error("Store error: {0}")]
    Store(#[from] crate::session::store::StoreError),
}
