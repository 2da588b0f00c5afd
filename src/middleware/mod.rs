pub mod resolve_tenant;
pub mod response;

pub use resolve_tenant::resolve_tenant_middleware;
pub use response::{ApiResponse, ApiResult};
