use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::session::lifecycle::{LifecycleGate, RequestScope};
use crate::tenant::resolver::RequestMeta;
use crate::AppState;

/// Tenant resolution middleware - the front of the request pipeline.
///
/// Resolves the tenant before any handler runs and short-circuits the request
/// with a stable error code when resolution fails, so no tenant-owned data
/// access can happen on an unresolved request. On success it installs a
/// RequestScope (context + opened lifecycle gate + session factory) into the
/// request extensions for handlers to open sessions from.
pub async fn resolve_tenant_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let meta = request_meta(request.headers(), state.resolver.header_name());

    let gate = Arc::new(LifecycleGate::new());

    let context = match state.resolver.resolve(&meta).await {
        Ok(context) => context,
        Err(err) => {
            gate.mark_failed();
            return Err(err.into());
        }
    };

    // Resolution is complete (resolved, or lenient-unresolved); sessions may
    // now be constructed for this request.
    gate.mark_resolved();

    let scope = RequestScope::new(
        context,
        gate,
        state.store.clone(),
        state.scopes.clone(),
        state.unresolved_reads,
    );
    request.extensions_mut().insert(scope);

    Ok(next.run(request).await)
}

/// Build the bounded request view the resolver consumes.
fn request_meta(headers: &HeaderMap, tenant_header: &str) -> RequestMeta {
    let header_value = |name: &str| {
        headers.get(name).and_then(|v| v.to_str().ok()).map(|s| s.to_string())
    };

    let bearer_token = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    RequestMeta {
        tenant_header: header_value(tenant_header),
        bearer_token,
        host: header_value("host"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_the_three_signals() {
        let mut headers = HeaderMap::new();
        headers.insert("tenant", HeaderValue::from_static("t1"));
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        headers.insert("host", HeaderValue::from_static("t1.api.example.com"));

        let meta = request_meta(&headers, "tenant");
        assert_eq!(meta.tenant_header.as_deref(), Some("t1"));
        assert_eq!(meta.bearer_token.as_deref(), Some("abc.def.ghi"));
        assert_eq!(meta.host.as_deref(), Some("t1.api.example.com"));
    }

    #[test]
    fn respects_configured_header_name() {
        let mut headers = HeaderMap::new();
        headers.insert("x-org", HeaderValue::from_static("t1"));
        let meta = request_meta(&headers, "x-org");
        assert_eq!(meta.tenant_header.as_deref(), Some("t1"));
        assert_eq!(request_meta(&headers, "tenant").tenant_header, None);
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(request_meta(&headers, "tenant").bearer_token, None);
    }
}
