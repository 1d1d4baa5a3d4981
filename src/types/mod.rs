pub mod aistudio;
pub mod profile;
pub mod query;

pub use profile::{AskRequest, ConnectResponse, ConnectionProfile, Dialect, SchemaQuery};
pub use query::{AskResponse, QueryResult, Row, SchemaSnapshot};
