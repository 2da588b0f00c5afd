pub mod manager;
pub mod mem_store;
pub mod models;
pub mod pg_store;
pub mod record;

pub use manager::{DatabaseError, DatabaseManager};
pub use record::{Operation, Record, RecordError};
