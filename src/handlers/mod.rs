pub mod ask;
pub mod connection;

pub use ask::ask_handler;
pub use connection::{connect_handler, schema_handler};
