// Pre-persist interceptors for the session write path.
//
// Every record headed for storage passes the chain in registration order
// before the store is called; stamping therefore happens in exactly one
// place and is testable without any storage engine behind it.

use uuid::Uuid;

use crate::database::record::{Operation, Record};
use crate::session::error::SessionError;

/// What the chain knows about the write being performed.
pub struct WriteContext<'a> {
    pub entity: &'a str,
    /// The session's tenant snapshot, not the live context.
    pub snapshot: Option<&'a str>,
    pub tenant_owned: bool,
}

/// One step of the pre-persist chain.
pub trait WriteInterceptor: Send + Sync {
    /// Interceptor name for logging and debugging
    fn name(&self) -> &'static str;

    /// Check if interceptor applies to this operation state
    fn applies_to(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn apply(&self, record: &mut Record, ctx: &WriteContext<'_>) -> Result<(), SessionError>;
}

/// Overwrites `tenant_id` with the session snapshot, unconditionally.
///
/// Caller-supplied values - including forged ones that slipped past input
/// parsing - are discarded here, so a record can only ever persist under the
/// tenant the session was opened for. An unresolved snapshot fails the write.
pub struct TenantStamp;

impl WriteInterceptor for TenantStamp {
    fn name(&self) -> &'static str {
        "TenantStamp"
    }

    fn apply(&self, record: &mut Record, ctx: &WriteContext<'_>) -> Result<(), SessionError> {
        if !ctx.tenant_owned {
            return Ok(());
        }
        match ctx.snapshot {
            Some(tenant_id) => {
                record.set_tenant_id(tenant_id);
                Ok(())
            }
            None => Err(SessionError::TenantRequired),
        }
    }
}

/// Assigns a fresh id to created records that lack one.
pub struct AssignId;

impl WriteInterceptor for AssignId {
    fn name(&self) -> &'static str {
        "AssignId"
    }

    fn applies_to(&self, op: Operation) -> bool {
        matches!(op, Operation::Create)
    }

    fn apply(&self, record: &mut Record, _ctx: &WriteContext<'_>) -> Result<(), SessionError> {
        if record.id().is_none() {
            record.set_id(Uuid::new_v4());
        }
        Ok(())
    }
}

/// Maintains created_at/updated_at.
pub struct Timestamps;

impl WriteInterceptor for Timestamps {
    fn name(&self) -> &'static str {
        "Timestamps"
    }

    fn apply(&self, record: &mut Record, _ctx: &WriteContext<'_>) -> Result<(), SessionError> {
        if record.operation() == Operation::Create {
            record.touch_created_at();
        }
        record.touch_updated_at();
        Ok(())
    }
}

/// The fixed-order chain. Stamping runs first so later interceptors observe
/// the final tenant value.
pub struct InterceptorChain {
    interceptors: Vec<Box<dyn WriteInterceptor>>,
}

impl Default for InterceptorChain {
    fn default() -> Self {
        Self {
            interceptors: vec![Box::new(TenantStamp), Box::new(AssignId), Box::new(Timestamps)],
        }
    }
}

impl InterceptorChain {
    /// Run every applicable interceptor over every record. The first failure
    /// aborts the whole batch - nothing reaches the store after an error.
    pub fn run(&self, records: &mut [Record], ctx: &WriteContext<'_>) -> Result<(), SessionError> {
        for record in records.iter_mut() {
            for interceptor in &self.interceptors {
                if !interceptor.applies_to(record.operation()) {
                    continue;
                }
                interceptor.apply(record, ctx).map_err(|e| {
                    tracing::warn!(
                        "Interceptor {} rejected write to '{}': {}",
                        interceptor.name(),
                        ctx.entity,
                        e
                    );
                    e
                })?;
                tracing::debug!("Interceptor {} applied for '{}'", interceptor.name(), ctx.entity);
            }
        }
        Ok(())
    }
}
