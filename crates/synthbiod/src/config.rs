//! Daemon configuration: command-line flags with environment fallbacks.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::{header, HeaderValue, Method};
use clap::Args;
use synthbio_core::{CitationOrder, CitationPolicy, OutputFormat, DEFAULT_CITATION_LIMIT};
use synthbio_engine::{
    EngineConfig, QueryMethod, API_KEY_ENV, DEFAULT_ENGINE_BIN, DEFAULT_RESPONSE_TYPE,
    DEFAULT_TIMEOUT_SECS,
};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Invalid daemon configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen address {0}")]
    InvalidAddress(String),

    #[error("invalid CORS origin {0:?}")]
    InvalidOrigin(String),
}

/// Listener and cross-origin settings, plus the engine flags.
#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Allowed cross-origin caller ("*" for any). Unset sends no CORS headers.
    #[arg(long, env = "CORS_ALLOW_ORIGIN")]
    pub cors_allow_origin: Option<String>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl ServerArgs {
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    pub fn cors_layer(&self) -> Result<Option<CorsLayer>, ConfigError> {
        cors_layer(self.cors_allow_origin.as_deref())
    }
}

/// How to find and run the GraphRAG engine.
#[derive(Debug, Clone, Args)]
pub struct EngineArgs {
    /// GraphRAG project root (searched upward for settings.yaml)
    #[arg(long, env = "GRAPHRAG_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Explicit engine config file
    #[arg(long, env = "GRAPHRAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Engine executable
    #[arg(long, env = "GRAPHRAG_BIN", default_value = DEFAULT_ENGINE_BIN)]
    pub engine_bin: String,

    /// Search method: global, local, drift or basic
    #[arg(long, env = "GRAPHRAG_METHOD", default_value = "global")]
    pub method: QueryMethod,

    /// Answer style requested from the engine
    #[arg(long, env = "GRAPHRAG_RESPONSE_TYPE", default_value = DEFAULT_RESPONSE_TYPE)]
    pub response_type: String,

    /// Per-query timeout in seconds (0 disables)
    #[arg(long, env = "GRAPHRAG_QUERY_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Maximum citations returned (0 keeps all)
    #[arg(long, env = "GRAPHRAG_CITATION_LIMIT", default_value_t = DEFAULT_CITATION_LIMIT)]
    pub citation_limit: usize,

    /// Citation order: engine or rank
    #[arg(long, env = "GRAPHRAG_CITATION_ORDER", default_value = "engine")]
    pub citation_order: CitationOrder,

    /// Engine output format: auto, json or text
    #[arg(long, env = "GRAPHRAG_OUTPUT_FORMAT", default_value = "auto")]
    pub output_format: OutputFormat,

    /// Pass --verbose to the engine
    #[arg(long = "engine-verbose", env = "GRAPHRAG_QUERY_VERBOSE")]
    pub engine_verbose: bool,
}

impl EngineArgs {
    pub fn citation_policy(&self) -> CitationPolicy {
        CitationPolicy::new(self.citation_order, self.citation_limit)
    }

    /// Engine configuration. The API key is read from `GRAPHRAG_API_KEY`.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::new(&self.root)
            .with_command(self.engine_bin.clone(), vec!["query".to_string()])
            .with_method(self.method)
            .with_timeout_secs(self.timeout_secs)
            .with_output_format(self.output_format)
            .with_citation_policy(self.citation_policy())
            .with_api_key(std::env::var(API_KEY_ENV).ok());
        if let Some(path) = self.config.as_ref() {
            config = config.with_config_path(path);
        }
        config.response_type = self.response_type.clone();
        config.verbose = self.engine_verbose;
        config
    }
}

/// CORS for `origin`: `None` or blank disables CORS, `*` allows any origin.
pub fn cors_layer(origin: Option<&str>) -> Result<Option<CorsLayer>, ConfigError> {
    let origin = match origin.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(origin) => origin,
    };
    let allow_origin = if origin == "*" {
        AllowOrigin::from(Any)
    } else {
        let value = HeaderValue::from_str(origin)
            .map_err(|_| ConfigError::InvalidOrigin(origin.to_string()))?;
        AllowOrigin::exact(value)
    };
    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    ))
}
