use axum::extract::{Extension, Path};
use axum::Json;
use serde_json::Value;

use crate::database::record::Record;
use crate::filter::FilterData;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::session::lifecycle::RequestScope;

/// POST /api/find/:schema - filtered search with a structured predicate body.
/// The tenant predicate is appended outside whatever the body asks for.
pub async fn find_post(
    Extension(scope): Extension<RequestScope>,
    Path(schema): Path<String>,
    Json(filter): Json<FilterData>,
) -> ApiResult<Value> {
    let session = scope.session()?;
    let records = session.read(&schema, filter).await?;
    Ok(ApiResponse::success(Record::to_json_array(&records)))
}
