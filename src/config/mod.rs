use std::env;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub resolver: ResolverConfig,
    pub directory: DirectoryConfig,
    pub entities: EntityConfig,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Where the tenant signal comes from. Exactly one strategy is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    Header,
    Claim,
    Subdomain,
}

/// What happens when no tenant signal is present on a request.
/// Strict rejects the request; Lenient admits it with an unresolved context
/// and is only intended as a compatibility shim for legacy callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    Strict,
    Lenient,
}

/// What a session does with tenant-owned reads when its snapshot is unresolved.
/// Refuse fails the read; MatchNull scopes to rows with a null tenant and must
/// be chosen deliberately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReads {
    Refuse,
    MatchNull,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub strategy: ResolutionStrategy,
    pub policy: ResolutionPolicy,
    pub header_name: String,
    pub unresolved_reads: UnresolvedReads,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Positive and negative entries both live this long. A tenant deactivated
    /// mid-window keeps validating until the entry expires or is invalidated.
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
}

impl DirectoryConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Tables exempt from tenant scoping. Everything else is tenant-owned.
    pub shared: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub max_limit: Option<i32>,
    pub max_nested_depth: u32,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Resolver overrides
        if let Ok(v) = env::var("RESOLVER_STRATEGY") {
            self.resolver.strategy = match v.as_str() {
                "claim" => ResolutionStrategy::Claim,
                "subdomain" => ResolutionStrategy::Subdomain,
                _ => ResolutionStrategy::Header,
            };
        }
        if let Ok(v) = env::var("RESOLVER_POLICY") {
            // Lenient must be asked for by name; anything else stays strict
            self.resolver.policy = if v == "lenient" {
                ResolutionPolicy::Lenient
            } else {
                ResolutionPolicy::Strict
            };
        }
        if let Ok(v) = env::var("RESOLVER_HEADER_NAME") {
            self.resolver.header_name = v;
        }
        if let Ok(v) = env::var("RESOLVER_UNRESOLVED_READS") {
            self.resolver.unresolved_reads = if v == "match_null" {
                UnresolvedReads::MatchNull
            } else {
                UnresolvedReads::Refuse
            };
        }

        // Directory overrides
        if let Ok(v) = env::var("DIRECTORY_CACHE_TTL_SECS") {
            self.directory.cache_ttl_secs = v.parse().unwrap_or(self.directory.cache_ttl_secs);
        }
        if let Ok(v) = env::var("DIRECTORY_CACHE_CAPACITY") {
            self.directory.cache_capacity = v.parse().unwrap_or(self.directory.cache_capacity);
        }

        // Entity overrides
        if let Ok(v) = env::var("ENTITIES_SHARED") {
            self.entities.shared = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Filter overrides
        if let Ok(v) = env::var("FILTER_MAX_LIMIT") {
            self.filter.max_limit = v.parse().ok();
        }
        if let Ok(v) = env::var("FILTER_MAX_NESTED_DEPTH") {
            self.filter.max_nested_depth = v.parse().unwrap_or(self.filter.max_nested_depth);
        }
        if let Ok(v) = env::var("FILTER_DEBUG_LOGGING") {
            self.filter.debug_logging = v.parse().unwrap_or(self.filter.debug_logging);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            resolver: ResolverConfig {
                strategy: ResolutionStrategy::Header,
                policy: ResolutionPolicy::Strict,
                header_name: "tenant".to_string(),
                unresolved_reads: UnresolvedReads::Refuse,
            },
            directory: DirectoryConfig {
                cache_ttl_secs: 30,
                cache_capacity: 1024,
            },
            entities: EntityConfig { shared: vec![] },
            filter: FilterConfig {
                max_limit: Some(1000),
                max_nested_depth: 10,
                debug_logging: true,
            },
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                jwt_secret: String::new(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            resolver: ResolverConfig {
                strategy: ResolutionStrategy::Header,
                policy: ResolutionPolicy::Strict,
                header_name: "tenant".to_string(),
                unresolved_reads: UnresolvedReads::Refuse,
            },
            directory: DirectoryConfig {
                cache_ttl_secs: 120,
                cache_capacity: 4096,
            },
            entities: EntityConfig { shared: vec![] },
            filter: FilterConfig {
                max_limit: Some(500),
                max_nested_depth: 5,
                debug_logging: false,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            resolver: ResolverConfig {
                strategy: ResolutionStrategy::Header,
                policy: ResolutionPolicy::Strict,
                header_name: "tenant".to_string(),
                unresolved_reads: UnresolvedReads::Refuse,
            },
            directory: DirectoryConfig {
                cache_ttl_secs: 120,
                cache_capacity: 16384,
            },
            entities: EntityConfig { shared: vec![] },
            filter: FilterConfig {
                max_limit: Some(100),
                max_nested_depth: 3,
                debug_logging: false,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: String::new(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
