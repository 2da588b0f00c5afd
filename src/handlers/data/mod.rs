mod record_get;
mod record_put;
mod schema_get;
mod schema_post;

pub use record_get::record_get;
pub use record_put::record_put;
pub use schema_get::schema_get;
pub use schema_post::schema_post;
