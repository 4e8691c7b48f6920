//! Domain models for the query contract.
//!
//! - `Query`: a validated question plus optional engine knobs
//! - `Answer` / `Citation`: the normalized response shape
//! - `QueryError`: validation, engine and configuration failures

pub mod answer;
pub mod error;
pub mod query;

pub use answer::{Answer, Citation};
pub use error::{ConfigurationError, EngineError, QueryError, Result, ValidationError};
pub use query::{Query, QueryRequest};
