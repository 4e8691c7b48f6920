//! SynthBio Core
//!
//! The query contract shared by the gateway service and its clients:
//! - domain types (`Query`, `Answer`, `Citation`) and the error taxonomy
//! - defensive parsing of engine output (`normalize`)
//! - GraphRAG project/run-directory resolution (`workspace`)
//! - tracing setup, lifecycle events and counters

pub mod domain;
pub mod metrics;
pub mod normalize;
pub mod obs;
pub mod telemetry;
pub mod workspace;

pub use domain::{
    Answer, Citation, ConfigurationError, EngineError, Query, QueryError, QueryRequest, Result,
    ValidationError,
};

pub use normalize::{
    extract_report_citations, parse_engine_output, CitationOrder, CitationPolicy, OutputFormat,
    DEFAULT_CITATION_LIMIT,
};

pub use workspace::{
    find_root_dir, has_minimum_tables, select_latest_run_dir, EngineWorkspace, Settings,
};

pub use metrics::METRICS;
pub use obs::{
    emit_engine_invoked, emit_query_failed, emit_query_finished, emit_query_started, query_span,
};
pub use telemetry::init_tracing;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
