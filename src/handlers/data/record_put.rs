use std::collections::HashMap;

use axum::extract::{Extension, Path};
use axum::Json;
use serde_json::Value;
use uuid::Uuid;

use crate::database::record::Record;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::session::lifecycle::RequestScope;

/// PUT /api/data/:schema/:id - update one record by primary key.
/// The current row is loaded through the scoped lookup first, so updates can
/// only ever target rows the session is allowed to see.
pub async fn record_put(
    Extension(scope): Extension<RequestScope>,
    Path((schema, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> ApiResult<Value> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid record id"))?;

    let session = scope.session()?;

    let existing = session
        .direct_lookup(&schema, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Record not found"))?;

    let mut record = Record::from_json(body)?;
    let original: HashMap<String, Value> = existing.to_map().into_iter().collect();
    record.inject(original);

    let persisted = session.write(&schema, vec![record]).await?;
    let updated = persisted
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::internal_server_error("Update produced no result"))?;

    Ok(ApiResponse::success(updated.to_json()))
}
