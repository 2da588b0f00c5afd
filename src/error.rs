// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),
    MissingTenant(String),

    // 401 Unauthorized
    Unauthorized(String),
    InvalidTenant(String),

    // 403 Forbidden
    Forbidden(String),
    TenantRequired(String),
    CrossTenantAttempt(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),
    OrderingViolation(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::MissingTenant(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::InvalidTenant(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::TenantRequired(_) => 403,
            ApiError::CrossTenantAttempt(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::OrderingViolation(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::MissingTenant(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::InvalidTenant(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::TenantRequired(msg) => msg,
            ApiError::CrossTenantAttempt(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::OrderingViolation(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get stable error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::MissingTenant(_) => "MISSING_TENANT",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::InvalidTenant(_) => "INVALID_TENANT",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::TenantRequired(_) => "TENANT_REQUIRED",
            ApiError::CrossTenantAttempt(_) => "CROSS_TENANT_ATTEMPT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::OrderingViolation(_) => "ORDERING_VIOLATION",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert component error types to ApiError

impl From<crate::tenant::resolver::ResolutionError> for ApiError {
    fn from(err: crate::tenant::resolver::ResolutionError) -> Self {
        use crate::tenant::resolver::ResolutionError;
        match err {
            ResolutionError::MissingTenant => {
                ApiError::MissingTenant("No tenant signal present on request".to_string())
            }
            ResolutionError::InvalidTenant(id) => {
                ApiError::InvalidTenant(format!("Tenant '{}' is not active or does not exist", id))
            }
            ResolutionError::Directory(e) => {
                // Storage faults are not the caller's business
                tracing::error!("Directory error during resolution: {}", e);
                ApiError::service_unavailable("Tenant directory temporarily unavailable")
            }
        }
    }
}

impl From<crate::session::error::SessionError> for ApiError {
    fn from(err: crate::session::error::SessionError) -> Self {
        use crate::session::error::SessionError;
        match err {
            SessionError::TenantRequired => ApiError::TenantRequired(
                "Operation on tenant-owned data requires a resolved tenant".to_string(),
            ),
            SessionError::CrossTenantAttempt(entity) => ApiError::CrossTenantAttempt(format!(
                "Unscoped access to '{}' requires a privileged session",
                entity
            )),
            SessionError::OrderingViolation => ApiError::OrderingViolation(
                "Data access attempted before tenant resolution completed".to_string(),
            ),
            SessionError::Filter(e) => ApiError::bad_request(e.to_string()),
            SessionError::Record(e) => ApiError::bad_request(e.to_string()),
            SessionError::Store(crate::session::store::StoreError::NotFound) => {
                ApiError::not_found("Record not found")
            }
            SessionError::Store(e) => {
                tracing::error!("Store error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<crate::database::record::RecordError> for ApiError {
    fn from(err: crate::database::record::RecordError) -> Self {
        match err {
            crate::database::record::RecordError::SystemFieldNotAllowed(field) => {
                ApiError::bad_request(format!("System field '{}' cannot be set via API", field))
            }
            crate::database::record::RecordError::InvalidJson(msg) => ApiError::invalid_json(msg),
            crate::database::record::RecordError::MissingRequiredField(field) => {
                ApiError::bad_request(format!("Missing required field: {}", field))
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
