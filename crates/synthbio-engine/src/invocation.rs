//! Engine configuration and the command line built from it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use synthbio_core::{CitationPolicy, EngineWorkspace, OutputFormat, Query};

/// Default engine executable.
pub const DEFAULT_ENGINE_BIN: &str = "graphrag";

/// Default answer style requested from the engine.
pub const DEFAULT_RESPONSE_TYPE: &str = "multiple_paragraphs";

/// Default per-query timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Environment variable the engine reads its model API key from.
pub const API_KEY_ENV: &str = "GRAPHRAG_API_KEY";

/// GraphRAG search method.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueryMethod {
    /// Map-reduce over community reports.
    #[default]
    Global,

    /// Entity-centred neighbourhood search.
    Local,

    /// Hybrid of global and local.
    Drift,

    /// Plain vector search over text units.
    Basic,
}

impl QueryMethod {
    pub fn name(&self) -> &'static str {
        match self {
            QueryMethod::Global => "global",
            QueryMethod::Local => "local",
            QueryMethod::Drift => "drift",
            QueryMethod::Basic => "basic",
        }
    }

    /// Whether the method accepts `--dynamic-community-selection`.
    pub fn supports_dynamic_selection(&self) -> bool {
        matches!(self, QueryMethod::Global)
    }
}

impl FromStr for QueryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "local" => Ok(Self::Local),
            "drift" => Ok(Self::Drift),
            "basic" => Ok(Self::Basic),
            other => Err(format!(
                "unknown method `{other}` (expected global|local|drift|basic)"
            )),
        }
    }
}

impl fmt::Display for QueryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Deployment configuration for the CLI engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Executable to spawn.
    pub program: String,

    /// Arguments placed before the generated flags (`query` for the stock CLI).
    pub prefix_args: Vec<String>,

    /// Directory the project root is searched from.
    pub root: PathBuf,

    /// Explicit engine config file. Relative paths resolve against the root.
    pub config_path: Option<PathBuf>,

    pub method: QueryMethod,

    pub response_type: String,

    /// Timeout in seconds. `0` disables it.
    pub timeout_secs: u64,

    pub output_format: OutputFormat,

    pub citation_policy: CitationPolicy,

    /// Forwarded to the child as `GRAPHRAG_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub verbose: bool,
}

impl EngineConfig {
    /// Stock `graphrag query` configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            program: DEFAULT_ENGINE_BIN.to_string(),
            prefix_args: vec!["query".to_string()],
            root: root.into(),
            config_path: None,
            method: QueryMethod::Global,
            response_type: DEFAULT_RESPONSE_TYPE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            output_format: OutputFormat::Auto,
            citation_policy: CitationPolicy::default(),
            api_key: None,
            verbose: false,
        }
    }

    /// Use a custom executable and leading arguments.
    pub fn with_command(mut self, program: impl Into<String>, prefix_args: Vec<String>) -> Self {
        self.program = program.into();
        self.prefix_args = prefix_args;
        self
    }

    pub fn with_method(mut self, method: QueryMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_citation_policy(mut self, policy: CitationPolicy) -> Self {
        self.citation_policy = policy;
        self
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Config path resolved against the project root.
    pub fn resolved_config_path(&self, root: &Path) -> Option<PathBuf> {
        self.config_path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            }
        })
    }

    /// Build the command line for one query against a resolved workspace.
    pub fn invocation(&self, query: &Query, workspace: &EngineWorkspace) -> EngineInvocation {
        let mut args = self.prefix_args.clone();
        args.push("--root".to_string());
        args.push(workspace.root.display().to_string());
        args.push("--method".to_string());
        args.push(self.method.name().to_string());
        args.push("--query".to_string());
        args.push(query.question.clone());

        if let Some(config) = self.resolved_config_path(&workspace.root) {
            args.push("--config".to_string());
            args.push(config.display().to_string());
        }
        if workspace.run_dir_overrides_base() {
            args.push("--data".to_string());
            args.push(workspace.run_dir.display().to_string());
        }
        if let Some(level) = query.community_level {
            args.push("--community-level".to_string());
            args.push(level.to_string());
        }
        if self.method.supports_dynamic_selection() {
            args.push(if query.dynamic_community_selection {
                "--dynamic-community-selection".to_string()
            } else {
                "--no-dynamic-community-selection".to_string()
            });
        }
        args.push("--response-type".to_string());
        args.push(self.response_type.clone());
        if self.verbose {
            args.push("--verbose".to_string());
        }

        let env = self
            .api_key
            .iter()
            .map(|key| (API_KEY_ENV.to_string(), key.clone()))
            .collect();

        EngineInvocation {
            program: self.program.clone(),
            args,
            env,
            current_dir: Some(workspace.root.clone()),
            timeout_secs: self.timeout_secs,
        }
    }
}

/// A fully resolved child-process command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,

    /// Timeout in seconds. `0` disables it.
    pub timeout_secs: u64,
}

impl EngineInvocation {
    /// Ad-hoc command, mainly for diagnostics and tests.
    pub fn custom(program: impl Into<String>, args: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            args,
            env: Vec::new(),
            current_dir: None,
            timeout_secs,
        }
    }
}
