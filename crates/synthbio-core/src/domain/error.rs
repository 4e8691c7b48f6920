//! Error taxonomy for the query contract.
//!
//! Every failure a request can hit falls in exactly one of three families,
//! each with a fixed HTTP status. The wrapped message is always surfaced to
//! the caller verbatim.

use std::path::PathBuf;

/// Bad client input. Never reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("missing 'question' (string) in request body")]
    MissingQuestion,

    #[error("community_level must be a non-negative integer")]
    InvalidCommunityLevel,

    #[error("dynamic must be a boolean")]
    InvalidDynamic,
}

/// Failure of the external retrieval engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("engine timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("engine exited with status {code}: {detail}")]
    Failed { code: i32, detail: String },

    #[error("engine produced malformed output: {0}")]
    MalformedOutput(String),

    #[error("engine process error: {0}")]
    Process(String),
}

/// Missing or unreadable deployment configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("root directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("no settings.yaml or settings.yml found under {}", .0.display())]
    SettingsNotFound(PathBuf),

    #[error("settings file {} is unreadable: {reason}", path.display())]
    UnreadableSettings { path: PathBuf, reason: String },

    #[error("config file {} is unreadable: {reason}", path.display())]
    UnreadableConfig { path: PathBuf, reason: String },

    #[error("engine binary `{0}` not found")]
    EngineNotFound(String),

    #[error("{} references ${{{var}}} but {var} is not set", path.display())]
    MissingApiKey { var: String, path: PathBuf },
}

/// Any error `handle_query` can return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl QueryError {
    /// HTTP status the service answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            QueryError::Validation(_) => 400,
            QueryError::Engine(EngineError::Timeout { .. }) => 504,
            QueryError::Engine(_) => 502,
            QueryError::Configuration(_) => 500,
        }
    }

    /// Short machine-readable family name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Validation(_) => "validation",
            QueryError::Engine(EngineError::Timeout { .. }) => "engine_timeout",
            QueryError::Engine(_) => "engine",
            QueryError::Configuration(_) => "configuration",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, QueryError::Engine(EngineError::Timeout { .. }))
    }
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
