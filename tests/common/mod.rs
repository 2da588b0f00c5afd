#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use warden_api::config::{ResolutionPolicy, ResolutionStrategy, UnresolvedReads};
use warden_api::database::mem_store::MemStore;
use warden_api::session::scope::EntityScopes;
use warden_api::tenant::directory::TenantDirectory;
use warden_api::tenant::registry::StaticTenantRegistry;
use warden_api::tenant::resolver::TenantResolver;
use warden_api::{app, AppState};

pub const TEST_JWT_SECRET: &str = "test-secret";

/// In-process application under test: real router, memory store, static
/// tenant registry. No network, no database.
pub struct TestApp {
    pub router: Router,
    pub registry: Arc<StaticTenantRegistry>,
    pub directory: Arc<TenantDirectory>,
    pub store: Arc<MemStore>,
}

pub struct TestAppBuilder {
    strategy: ResolutionStrategy,
    policy: ResolutionPolicy,
    unresolved_reads: UnresolvedReads,
    tenants: Vec<String>,
    cache_ttl: Duration,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            strategy: ResolutionStrategy::Header,
            policy: ResolutionPolicy::Strict,
            unresolved_reads: UnresolvedReads::Refuse,
            tenants: vec!["t1".to_string(), "t2".to_string()],
            cache_ttl: Duration::from_secs(60),
        }
    }

    pub fn strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn unresolved_reads(mut self, mode: UnresolvedReads) -> Self {
        self.unresolved_reads = mode;
        self
    }

    pub fn tenants(mut self, ids: &[&str]) -> Self {
        self.tenants = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> TestApp {
        let registry = Arc::new(StaticTenantRegistry::new(self.tenants));
        let directory = Arc::new(TenantDirectory::new(registry.clone(), self.cache_ttl, 64));
        let resolver = TenantResolver::new(
            self.strategy,
            self.policy,
            "tenant",
            TEST_JWT_SECRET,
            directory.clone(),
        );
        let store = Arc::new(MemStore::new());
        let scopes = Arc::new(EntityScopes::default());

        let state = Arc::new(AppState {
            resolver,
            directory: directory.clone(),
            store: store.clone(),
            scopes,
            unresolved_reads: self.unresolved_reads,
        });

        TestApp { router: app(state), registry, directory, store }
    }
}

pub fn test_app() -> TestApp {
    TestAppBuilder::new().build()
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("infallible router");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON response body")
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, tenant: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method("GET").uri(uri);
        if let Some(tenant) = tenant {
            request = request.header("tenant", tenant);
        }
        self.send(request.body(Body::empty()).expect("request")).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        tenant: Option<&str>,
        body: &Value,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(tenant) = tenant {
            request = request.header("tenant", tenant);
        }
        self.send(request.body(Body::from(body.to_string())).expect("request")).await
    }

    pub async fn put_json(
        &self,
        uri: &str,
        tenant: Option<&str>,
        body: &Value,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method("PUT")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(tenant) = tenant {
            request = request.header("tenant", tenant);
        }
        self.send(request.body(Body::from(body.to_string())).expect("request")).await
    }
}

/// Mint a bearer token carrying a tenant claim, for the Claim strategy.
pub fn bearer_token(tenant: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims<'a> {
        tenant: &'a str,
        exp: usize,
    }

    let claims = Claims { tenant, exp: 4102444800 };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()))
        .expect("test token")
}
