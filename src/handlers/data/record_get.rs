use axum::extract::{Extension, Path};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::session::lifecycle::RequestScope;

/// GET /api/data/:schema/:id - fetch one record by primary key.
/// Goes through the session's filtered lookup, so a record belonging to
/// another tenant is a plain 404.
pub async fn record_get(
    Extension(scope): Extension<RequestScope>,
    Path((schema, id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid record id"))?;

    let session = scope.session()?;
    let record = session
        .direct_lookup(&schema, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Record not found"))?;

    Ok(ApiResponse::success(record.to_json()))
}
