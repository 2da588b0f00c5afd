use async_trait::async_trait;
use thiserror::Error;

use crate::database::record::Record;
use crate::filter::{FilterData, TenantScope};

/// Errors from a TenantStore implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Record missing id for update")]
    MissingId,

    #[error("Filter error: {0}")]
    Filter(#[from] crate::filter::error::FilterError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Engine-agnostic persistence surface consumed by DataAccessSession.
///
/// Implementations receive predicates as structured `FilterData` plus the
/// already-decided `TenantScope`, and compose both into whatever their engine
/// speaks. The scope arrives as data: nothing here re-reads request state.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Filtered select over one entity table.
    async fn select(
        &self,
        table: &str,
        filter: FilterData,
        scope: TenantScope,
    ) -> Result<Vec<Record>, StoreError>;

    /// Persist a batch atomically: Create records are inserted, Update records
    /// written by id. Updates honor the scope - a row outside it reads as
    /// NotFound, never as someone else's row. No partial batches.
    async fn persist(
        &self,
        table: &str,
        records: Vec<Record>,
        scope: TenantScope,
    ) -> Result<Vec<Record>, StoreError>;

    /// Connectivity probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
