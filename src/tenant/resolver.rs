use std::sync::Arc;

use thiserror::Error;

use crate::config::{ResolutionPolicy, ResolutionStrategy, ResolverConfig};
use crate::tenant::claims::decode_tenant_claim;
use crate::tenant::context::TenantContext;
use crate::tenant::directory::TenantDirectory;
use crate::tenant::registry::DirectoryError;

/// Resolution failures, each with its own response mapping.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("No tenant signal present on request")]
    MissingTenant,

    #[error("Tenant '{0}' is not active or does not exist")]
    InvalidTenant(String),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Bounded view of an inbound request - the only request shape the resolver
/// sees, so tenancy stays decoupled from the transport layer.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Value of the configured tenant header, if present
    pub tenant_header: Option<String>,
    /// Bearer token from the Authorization header, if present
    pub bearer_token: Option<String>,
    /// Request host, as sent (may carry a port)
    pub host: Option<String>,
}

/// Extracts a candidate tenant id via exactly one configured strategy and
/// validates it against the directory. Produces a TenantContext or a typed
/// failure; never constructs a data-access session, and assigns the context
/// as its very last step so a cancelled resolution leaves nothing behind.
pub struct TenantResolver {
    strategy: ResolutionStrategy,
    policy: ResolutionPolicy,
    header_name: String,
    jwt_secret: String,
    directory: Arc<TenantDirectory>,
}

impl TenantResolver {
    pub fn new(
        strategy: ResolutionStrategy,
        policy: ResolutionPolicy,
        header_name: impl Into<String>,
        jwt_secret: impl Into<String>,
        directory: Arc<TenantDirectory>,
    ) -> Self {
        Self {
            strategy,
            policy,
            header_name: header_name.into(),
            jwt_secret: jwt_secret.into(),
            directory,
        }
    }

    pub fn from_config(config: &ResolverConfig, directory: Arc<TenantDirectory>) -> Self {
        Self::new(
            config.strategy,
            config.policy,
            config.header_name.clone(),
            crate::config::config().security.jwt_secret.clone(),
            directory,
        )
    }

    /// Name of the header the Header strategy reads.
    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub async fn resolve(&self, meta: &RequestMeta) -> Result<TenantContext, ResolutionError> {
        let candidate = match self.extract(meta) {
            Some(candidate) => candidate,
            None => {
                return match self.policy {
                    ResolutionPolicy::Strict => Err(ResolutionError::MissingTenant),
                    ResolutionPolicy::Lenient => {
                        // The compatibility shim: downstream tenant-owned
                        // operations will see an unresolved context and apply
                        // their own policy. Loud on purpose.
                        tracing::warn!(
                            "Lenient resolution admitted a request without a tenant signal"
                        );
                        Ok(TenantContext::unresolved())
                    }
                };
            }
        };

        if !self.directory.validate(&candidate).await? {
            tracing::warn!("Rejected unknown or inactive tenant '{}'", candidate);
            return Err(ResolutionError::InvalidTenant(candidate));
        }

        tracing::debug!("Resolved tenant '{}'", candidate);
        Ok(TenantContext::resolved(candidate))
    }

    fn extract(&self, meta: &RequestMeta) -> Option<String> {
        let candidate = match self.strategy {
            ResolutionStrategy::Header => meta.tenant_header.clone(),
            ResolutionStrategy::Claim => {
                let token = meta.bearer_token.as_deref()?;
                match decode_tenant_claim(token, &self.jwt_secret) {
                    Ok(claims) => Some(claims.tenant),
                    Err(reason) => {
                        // An undecodable token carries no usable signal
                        tracing::warn!("Bearer token rejected: {}", reason);
                        None
                    }
                }
            }
            ResolutionStrategy::Subdomain => Self::leading_host_label(meta.host.as_deref()?),
        };

        candidate.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
    }

    /// `t1.api.example.com` -> `t1`; bare hosts like `localhost` carry none.
    fn leading_host_label(host: &str) -> Option<String> {
        let host = host.split(':').next().unwrap_or(host);
        let mut labels = host.split('.');
        let first = labels.next()?;
        // A leading label only exists if there is a parent domain behind it
        labels.next()?;
        Some(first.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ResolutionPolicy, ResolutionStrategy};
    use crate::tenant::claims::encode_tenant_claim;
    use crate::tenant::registry::StaticTenantRegistry;
    use std::time::Duration;

    fn directory(ids: &[&str]) -> Arc<TenantDirectory> {
        Arc::new(TenantDirectory::new(
            Arc::new(StaticTenantRegistry::new(ids.iter().map(|s| s.to_string()))),
            Duration::from_secs(60),
            16,
        ))
    }

    fn resolver(strategy: ResolutionStrategy, policy: ResolutionPolicy) -> TenantResolver {
        TenantResolver::new(strategy, policy, "tenant", "test-secret", directory(&["t1"]))
    }

    #[tokio::test]
    async fn header_strategy_resolves_known_tenant() {
        let resolver = resolver(ResolutionStrategy::Header, ResolutionPolicy::Strict);
        let meta = RequestMeta { tenant_header: Some("t1".into()), ..Default::default() };
        let context = resolver.resolve(&meta).await.unwrap();
        assert_eq!(context.tenant_id(), Some("t1"));
    }

    #[tokio::test]
    async fn missing_signal_fails_under_strict() {
        let resolver = resolver(ResolutionStrategy::Header, ResolutionPolicy::Strict);
        let err = resolver.resolve(&RequestMeta::default()).await.unwrap_err();
        assert!(matches!(err, ResolutionError::MissingTenant));
    }

    #[tokio::test]
    async fn missing_signal_yields_unresolved_under_lenient() {
        let resolver = resolver(ResolutionStrategy::Header, ResolutionPolicy::Lenient);
        let context = resolver.resolve(&RequestMeta::default()).await.unwrap();
        assert!(!context.is_resolved());
    }

    #[tokio::test]
    async fn unknown_tenant_is_invalid_even_under_lenient() {
        let resolver = resolver(ResolutionStrategy::Header, ResolutionPolicy::Lenient);
        let meta = RequestMeta { tenant_header: Some("bad".into()), ..Default::default() };
        let err = resolver.resolve(&meta).await.unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidTenant(id) if id == "bad"));
    }

    #[tokio::test]
    async fn blank_header_counts_as_missing() {
        let resolver = resolver(ResolutionStrategy::Header, ResolutionPolicy::Strict);
        let meta = RequestMeta { tenant_header: Some("   ".into()), ..Default::default() };
        assert!(matches!(
            resolver.resolve(&meta).await.unwrap_err(),
            ResolutionError::MissingTenant
        ));
    }

    #[tokio::test]
    async fn claim_strategy_reads_bearer_token() {
        let resolver = resolver(ResolutionStrategy::Claim, ResolutionPolicy::Strict);
        let meta = RequestMeta {
            bearer_token: Some(encode_tenant_claim("t1", "test-secret")),
            ..Default::default()
        };
        let context = resolver.resolve(&meta).await.unwrap();
        assert_eq!(context.tenant_id(), Some("t1"));
    }

    #[tokio::test]
    async fn garbled_token_counts_as_missing_signal() {
        let resolver = resolver(ResolutionStrategy::Claim, ResolutionPolicy::Strict);
        let meta = RequestMeta { bearer_token: Some("not-a-jwt".into()), ..Default::default() };
        assert!(matches!(
            resolver.resolve(&meta).await.unwrap_err(),
            ResolutionError::MissingTenant
        ));
    }

    #[tokio::test]
    async fn subdomain_strategy_takes_leading_label() {
        let resolver = resolver(ResolutionStrategy::Subdomain, ResolutionPolicy::Strict);
        let meta =
            RequestMeta { host: Some("t1.api.example.com:8080".into()), ..Default::default() };
        let context = resolver.resolve(&meta).await.unwrap();
        assert_eq!(context.tenant_id(), Some("t1"));
    }

    #[tokio::test]
    async fn bare_host_carries_no_subdomain_signal() {
        let resolver = resolver(ResolutionStrategy::Subdomain, ResolutionPolicy::Strict);
        let meta = RequestMeta { host: Some("localhost:3000".into()), ..Default::default() };
        assert!(matches!(
            resolver.resolve(&meta).await.unwrap_err(),
            ResolutionError::MissingTenant
        ));
    }

    #[tokio::test]
    async fn header_strategy_ignores_other_signals() {
        // Exactly one strategy is consulted; a valid claim cannot leak in
        let resolver = resolver(ResolutionStrategy::Header, ResolutionPolicy::Strict);
        let meta = RequestMeta {
            bearer_token: Some(encode_tenant_claim("t1", "test-secret")),
            host: Some("t1.api.example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            resolver.resolve(&meta).await.unwrap_err(),
            ResolutionError::MissingTenant
        ));
    }

    #[tokio::test]
    async fn resolution_is_deterministic() {
        let resolver = resolver(ResolutionStrategy::Header, ResolutionPolicy::Strict);
        let meta = RequestMeta { tenant_header: Some("t1".into()), ..Default::default() };
        for _ in 0..3 {
            let context = resolver.resolve(&meta).await.unwrap();
            assert_eq!(context.tenant_id(), Some("t1"));
        }
    }
}
