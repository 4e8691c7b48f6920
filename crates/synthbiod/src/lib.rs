//! SynthBio daemon
//!
//! Serves the query gateway over HTTP:
//! - `POST /query`: one question in, one normalized answer out
//! - `GET /health`: liveness
//! - `GET /`: the embedded single-page client

pub mod config;
pub mod server;

pub use config::{cors_layer, ConfigError, EngineArgs, ServerArgs};
pub use server::{error_response, router, serve, AppState, ErrorBody, REQUEST_ID_HEADER};
