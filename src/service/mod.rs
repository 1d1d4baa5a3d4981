pub mod assistant;
pub mod cipher;
pub mod executor;
pub mod safety;
pub mod schema_cache;
pub mod sql_generator;
pub mod vault;

pub use assistant::Assistant;
pub use safety::{DenylistGate, SqlGate, is_safe};
