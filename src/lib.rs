pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod session;
pub mod tenant;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::database::manager::DatabaseManager;
use crate::session::scope::EntityScopes;
use crate::session::store::TenantStore;
use crate::tenant::directory::TenantDirectory;
use crate::tenant::resolver::TenantResolver;

/// Shared application state handed to the resolution middleware and handlers.
pub struct AppState {
    pub resolver: TenantResolver,
    pub directory: Arc<TenantDirectory>,
    pub store: Arc<dyn TenantStore>,
    pub scopes: Arc<EntityScopes>,
    pub unresolved_reads: config::UnresolvedReads,
}

/// Build the full router: public health endpoint plus the tenant-scoped API.
pub fn app(state: Arc<AppState>) -> Router {
    use axum::routing::post;

    let api = Router::new()
        // Collection-level operations
        .route(
            "/api/data/:schema",
            get(handlers::data::schema_get).post(handlers::data::schema_post),
        )
        // Record-level operations
        .route(
            "/api/data/:schema/:id",
            get(handlers::data::record_get).put(handlers::data::record_put),
        )
        // Filtered search
        .route("/api/find/:schema", post(handlers::find::find_post))
        // Every /api route resolves the tenant before any handler runs
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_tenant::resolve_tenant_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .with_state(state)
}

/// Wire up the default production state: Postgres-backed store and registry.
pub async fn postgres_state() -> anyhow::Result<Arc<AppState>> {
    use crate::database::pg_store::PgStore;
    use crate::tenant::registry::PgTenantRegistry;

    let pool = DatabaseManager::pool().await?;
    let directory = Arc::new(TenantDirectory::new(
        Arc::new(PgTenantRegistry::new(pool.clone())),
        config::config().directory.cache_ttl(),
        config::config().directory.cache_capacity,
    ));
    let resolver = TenantResolver::from_config(&config::config().resolver, directory.clone());
    let scopes = Arc::new(EntityScopes::from_config(&config::config().entities));
    let store: Arc<dyn TenantStore> = Arc::new(PgStore::new(pool));

    Ok(Arc::new(AppState {
        resolver,
        directory,
        store,
        scopes,
        unresolved_reads: config::config().resolver.unresolved_reads,
    }))
}
