use axum::extract::{Extension, Path, Query};
use serde::Deserialize;
use serde_json::Value;

use crate::database::record::Record;
use crate::filter::FilterData;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::session::lifecycle::RequestScope;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i32>,
    pub offset: Option<i32>,
    pub order: Option<String>,
}

/// GET /api/data/:schema - list records, implicitly confined to the tenant
pub async fn schema_get(
    Extension(scope): Extension<RequestScope>,
    Path(schema): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Value> {
    let session = scope.session()?;

    let filter = FilterData {
        order: query.order.map(Value::String),
        limit: query.limit,
        offset: query.offset,
        ..Default::default()
    };

    let records = session.read(&schema, filter).await?;
    Ok(ApiResponse::success(Record::to_json_array(&records)))
}
