//! The retrieval-engine seam and its subprocess implementation.

use async_trait::async_trait;
use synthbio_core::{
    parse_engine_output, Answer, ConfigurationError, EngineWorkspace, Query, QueryError,
};
use tracing::debug;

use crate::invocation::{EngineConfig, QueryMethod, API_KEY_ENV};
use crate::runner::EngineRunner;

/// An opaque `retrieve(question, method, config, root)` function.
///
/// Implementations return the engine's raw answer and citations; ordering
/// and truncation are applied by the caller.
#[async_trait]
pub trait RetrievalEngine: Send + Sync {
    async fn retrieve(&self, query: &Query) -> Result<Answer, QueryError>;

    /// Method this engine searches with, for logging.
    fn method(&self) -> QueryMethod;

    /// Executable or backend name, for logging.
    fn describe(&self) -> String;
}

/// Runs the GraphRAG CLI as a child process per query.
#[derive(Debug, Clone)]
pub struct CliEngine {
    config: EngineConfig,
}

impl CliEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve the project, verify the explicit config file is readable and
    /// that an API key exists whenever the engine settings interpolate one.
    pub fn resolve_workspace(&self) -> Result<EngineWorkspace, ConfigurationError> {
        let workspace = EngineWorkspace::resolve(&self.config.root)?;
        let config_path = self.config.resolved_config_path(&workspace.root);
        if let Some(path) = config_path.as_ref() {
            std::fs::File::open(path).map_err(|e| ConfigurationError::UnreadableConfig {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        }
        workspace.require_env_var(API_KEY_ENV, self.api_key_available(), config_path.as_deref())?;
        Ok(workspace)
    }

    /// The child inherits the gateway's environment, so either source counts.
    fn api_key_available(&self) -> bool {
        self.config.api_key.is_some()
            || std::env::var(API_KEY_ENV).is_ok_and(|key| !key.trim().is_empty())
    }
}

#[async_trait]
impl RetrievalEngine for CliEngine {
    async fn retrieve(&self, query: &Query) -> Result<Answer, QueryError> {
        let workspace = self.resolve_workspace()?;
        let invocation = self.config.invocation(query, &workspace);
        debug!(
            root = %workspace.root.display(),
            run_dir = %workspace.run_dir.display(),
            args = ?invocation.args,
            "invoking engine"
        );

        let output = EngineRunner::execute(&invocation).await?.into_success()?;
        let mut answer = parse_engine_output(&output.stdout, self.config.output_format)?;
        if answer.run_dir.is_none() {
            answer.run_dir = Some(workspace.run_dir.display().to_string());
        }
        Ok(answer)
    }

    fn method(&self) -> QueryMethod {
        self.config.method
    }

    fn describe(&self) -> String {
        self.config.program.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_workspace_rejects_unreadable_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.yaml"), "").unwrap();
        let engine = CliEngine::new(EngineConfig::new(dir.path()).with_config_path("nope.yaml"));
        let err = engine.resolve_workspace().unwrap_err();
        assert!(matches!(err, ConfigurationError::UnreadableConfig { .. }));
    }

    #[test]
    fn test_resolve_workspace_accepts_relative_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.yaml"), "").unwrap();
        let engine =
            CliEngine::new(EngineConfig::new(dir.path()).with_config_path("settings.yaml"));
        assert!(engine.resolve_workspace().is_ok());
    }

    #[test]
    fn test_resolve_workspace_accepts_configured_api_key() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.yaml"), "api_key: ${GRAPHRAG_API_KEY}\n").unwrap();
        let engine = CliEngine::new(
            EngineConfig::new(dir.path()).with_api_key(Some("sk-test".to_string())),
        );
        assert!(engine.resolve_workspace().is_ok());
    }

    #[tokio::test]
    async fn test_retrieve_without_api_key_is_configuration_error() {
        if std::env::var(API_KEY_ENV).is_ok_and(|k| !k.trim().is_empty()) {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.yaml"), "api_key: ${GRAPHRAG_API_KEY}\n").unwrap();
        let engine = CliEngine::new(
            EngineConfig::new(dir.path()).with_command("true", Vec::new()),
        );
        let err = engine.retrieve(&Query::new("q").unwrap()).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("${GRAPHRAG_API_KEY}"));
    }

    #[test]
    fn test_describe_and_method() {
        let engine = CliEngine::new(
            EngineConfig::new(".")
                .with_command("python3", vec!["query_runner.py".to_string()])
                .with_method(QueryMethod::Drift),
        );
        assert_eq!(engine.describe(), "python3");
        assert_eq!(engine.method(), QueryMethod::Drift);
    }
}
