use axum::extract::{Extension, Path};
use axum::Json;
use serde_json::Value;

use crate::database::record::Record;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::session::lifecycle::RequestScope;

/// POST /api/data/:schema - create one record or a batch.
/// Any tenant value in the body is discarded; the session stamps its own.
pub async fn schema_post(
    Extension(scope): Extension<RequestScope>,
    Path(schema): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Value> {
    let records = match body {
        Value::Object(_) => vec![Record::from_json(body)?],
        Value::Array(_) => Record::from_json_array(body)?,
        _ => return Err(ApiError::invalid_json("Expected JSON object or array")),
    };

    let session = scope.session()?;
    let persisted = session.write(&schema, records).await?;

    Ok(ApiResponse::created(Record::to_json_array(&persisted)))
}
