//! SynthBio Engine - GraphRAG invocation
//!
//! Provides:
//! - `EngineConfig` / `EngineInvocation`: the `graphrag query` command line
//! - `EngineRunner`: child-process execution with timeout
//! - `RetrievalEngine`: the engine seam, implemented by `CliEngine`
//! - `QueryService`: validate → invoke → normalize for one request

pub mod engine;
pub mod fakes;
pub mod invocation;
pub mod runner;
pub mod service;

// Re-export key types
pub use engine::{CliEngine, RetrievalEngine};
pub use invocation::{
    EngineConfig, EngineInvocation, QueryMethod, API_KEY_ENV, DEFAULT_ENGINE_BIN,
    DEFAULT_RESPONSE_TYPE, DEFAULT_TIMEOUT_SECS,
};
pub use runner::{EngineRunner, RunOutput};
pub use service::QueryService;
