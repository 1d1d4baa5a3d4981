//! Database access for registered connections.
//!
//! Layout:
//! - `pool.rs`: dialect-tagged pools and the scoped `ConnectionHandle`
//! - `schema.rs`: catalog queries used for schema reflection
//! - `values.rs`: driver value <-> JSON conversion

pub mod pool;
pub mod schema;
pub mod values;

pub use pool::{ConnectionHandle, DbPool};
