//! Locating the GraphRAG project root and the run directory to query.
//!
//! A project root is the nearest ancestor holding `settings.yaml` (or
//! `settings.yml`). Index runs live under `output/`; the newest directory
//! holding the tables global search needs is the one queried.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::ConfigurationError;

/// Settings file names, in lookup order.
pub const SETTINGS_FILES: [&str; 2] = ["settings.yaml", "settings.yml"];

/// Tables a run directory must contain to be queryable.
pub const REQUIRED_TABLES: [&str; 3] = [
    "entities.parquet",
    "communities.parquet",
    "community_reports.parquet",
];

/// Directory scanned for timestamped runs when the configured one is empty.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// The subset of the engine's `settings.yaml` this gateway reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub base_dir: Option<String>,
}

impl Settings {
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Read and parse the settings file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigurationError::UnreadableSettings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(&text).map_err(|e| ConfigurationError::UnreadableSettings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Walk upward from `start` to the first directory holding a settings file.
/// Falls back to `start` itself.
pub fn find_root_dir(start: &Path) -> PathBuf {
    let start = fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());
    start
        .ancestors()
        .find(|dir| settings_path(dir).is_some())
        .map(Path::to_path_buf)
        .unwrap_or(start)
}

/// The settings file directly inside `dir`, if any.
pub fn settings_path(dir: &Path) -> Option<PathBuf> {
    SETTINGS_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Whether `dir` contains every table in [`REQUIRED_TABLES`].
pub fn has_minimum_tables(dir: &Path) -> bool {
    REQUIRED_TABLES.iter().all(|t| dir.join(t).is_file())
}

/// A queryable run directory found under `output/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirCandidate {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

/// Queryable subdirectories of `output_root`, newest first.
pub fn scan_run_dirs(output_root: &Path) -> Vec<RunDirCandidate> {
    let Ok(entries) = fs::read_dir(output_root) else {
        return Vec::new();
    };
    let mut candidates: Vec<RunDirCandidate> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir() && has_minimum_tables(p))
        .filter_map(|path| {
            let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
            Some(RunDirCandidate {
                path,
                modified: DateTime::<Utc>::from(modified),
            })
        })
        .collect();
    candidates.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
    candidates
}

/// Pick the run directory to query.
///
/// Prefers the configured `output.base_dir` when it holds the required
/// tables, then the newest qualifying directory under `<root>/output`, and
/// finally returns the configured (or default) base unchanged.
pub fn select_latest_run_dir(root: &Path, settings: &Settings) -> PathBuf {
    let configured = settings
        .output
        .base_dir
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|base| root.join(base));

    if let Some(base) = configured.as_ref() {
        if has_minimum_tables(base) {
            debug!(run_dir = %base.display(), "using configured output.base_dir");
            return base.clone();
        }
    }

    let output_root = root.join(DEFAULT_OUTPUT_DIR);
    if let Some(latest) = scan_run_dirs(&output_root).into_iter().next() {
        info!(
            run_dir = %latest.path.display(),
            modified = %latest.modified.to_rfc3339(),
            "selected latest run directory"
        );
        return latest.path;
    }

    configured.unwrap_or(output_root)
}

/// Whether `text` interpolates `${var}`.
pub fn references_env_var(text: &str, var: &str) -> bool {
    text.contains(&format!("${{{var}}}"))
}

/// Whether `root/.env` assigns a non-blank value to `var`.
pub fn dotenv_defines(root: &Path, var: &str) -> bool {
    let Ok(entries) = dotenvy::from_path_iter(root.join(".env")) else {
        return false;
    };
    entries
        .filter_map(|entry| entry.ok())
        .any(|(key, value)| key == var && !value.trim().is_empty())
}

/// A resolved engine project: root, parsed settings and chosen run directory.
#[derive(Debug, Clone)]
pub struct EngineWorkspace {
    pub root: PathBuf,
    pub settings_file: PathBuf,
    pub settings: Settings,
    pub run_dir: PathBuf,
}

impl EngineWorkspace {
    /// Resolve the workspace that `start` belongs to.
    pub fn resolve(start: &Path) -> Result<Self, ConfigurationError> {
        if !start.is_dir() {
            return Err(ConfigurationError::RootNotFound(start.to_path_buf()));
        }
        let root = find_root_dir(start);
        let settings_file =
            settings_path(&root).ok_or_else(|| ConfigurationError::SettingsNotFound(root.clone()))?;
        let settings = Settings::load(&settings_file)?;
        let run_dir = select_latest_run_dir(&root, &settings);
        Ok(Self {
            root,
            settings_file,
            settings,
            run_dir,
        })
    }

    /// Fail when the settings file, or `extra_config`, interpolates `${var}`
    /// while no value is available. `provided` covers the caller's own
    /// sources; the project's `.env` file is checked here.
    pub fn require_env_var(
        &self,
        var: &str,
        provided: bool,
        extra_config: Option<&Path>,
    ) -> Result<(), ConfigurationError> {
        if provided || dotenv_defines(&self.root, var) {
            return Ok(());
        }
        let files = std::iter::once(self.settings_file.as_path()).chain(extra_config);
        for path in files {
            let Ok(text) = fs::read_to_string(path) else {
                continue;
            };
            if references_env_var(&text, var) {
                return Err(ConfigurationError::MissingApiKey {
                    var: var.to_string(),
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    /// Whether the chosen run directory differs from the configured base,
    /// in which case the engine must be pointed at it explicitly.
    pub fn run_dir_overrides_base(&self) -> bool {
        match self.settings.output.base_dir.as_deref() {
            Some(base) if !base.trim().is_empty() => {
                let configured = self.root.join(base);
                let canon = |p: &Path| fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
                canon(&configured) != canon(&self.run_dir)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch_tables(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        for t in REQUIRED_TABLES {
            fs::write(dir.join(t), b"PAR1").unwrap();
        }
    }

    #[test]
    fn test_settings_parse_base_dir() {
        let s = Settings::from_yaml_str("output:\n  type: file\n  base_dir: \"runs/main\"\n")
            .unwrap();
        assert_eq!(s.output.base_dir.as_deref(), Some("runs/main"));
    }

    #[test]
    fn test_settings_empty_file_is_default() {
        let s = Settings::from_yaml_str("  \n").unwrap();
        assert!(s.output.base_dir.is_none());
    }

    #[test]
    fn test_settings_ignores_unknown_sections() {
        let s = Settings::from_yaml_str(
            "models:\n  default_chat_model:\n    api_key: ${GRAPHRAG_API_KEY}\n",
        )
        .unwrap();
        assert!(s.output.base_dir.is_none());
    }

    #[test]
    fn test_has_minimum_tables() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!has_minimum_tables(dir.path()));
        touch_tables(dir.path());
        assert!(has_minimum_tables(dir.path()));
    }

    #[test]
    fn test_find_root_dir_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.yml"), "").unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        let root = find_root_dir(&nested);
        assert_eq!(root, fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn test_select_prefers_configured_base() {
        let dir = tempfile::tempdir().unwrap();
        touch_tables(&dir.path().join("custom"));
        touch_tables(&dir.path().join("output/20250101-000000"));
        let settings = Settings::from_yaml_str("output:\n  base_dir: custom\n").unwrap();
        assert_eq!(
            select_latest_run_dir(dir.path(), &settings),
            dir.path().join("custom")
        );
    }

    #[test]
    fn test_select_falls_back_to_output_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch_tables(&dir.path().join("output/20250908-145313"));
        fs::create_dir_all(dir.path().join("output/incomplete")).unwrap();
        let settings = Settings::from_yaml_str("output:\n  base_dir: missing\n").unwrap();
        assert_eq!(
            select_latest_run_dir(dir.path(), &settings),
            dir.path().join("output/20250908-145313")
        );
    }

    #[test]
    fn test_select_returns_configured_when_nothing_qualifies() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::from_yaml_str("output:\n  base_dir: fresh\n").unwrap();
        assert_eq!(
            select_latest_run_dir(dir.path(), &settings),
            dir.path().join("fresh")
        );
        assert_eq!(
            select_latest_run_dir(dir.path(), &Settings::default()),
            dir.path().join("output")
        );
    }

    #[test]
    fn test_resolve_missing_root() {
        let err = EngineWorkspace::resolve(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, ConfigurationError::RootNotFound(_)));
    }

    #[test]
    fn test_resolve_without_settings() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineWorkspace::resolve(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigurationError::SettingsNotFound(_)));
    }

    #[test]
    fn test_resolve_unparsable_settings() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.yaml"), "output: [unclosed").unwrap();
        let err = EngineWorkspace::resolve(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnreadableSettings { .. }));
    }

    #[test]
    fn test_references_env_var() {
        assert!(references_env_var("api_key: ${GRAPHRAG_API_KEY}", "GRAPHRAG_API_KEY"));
        assert!(!references_env_var("api_key: $GRAPHRAG_API_KEY", "GRAPHRAG_API_KEY"));
        assert!(!references_env_var("api_key: sk-local", "GRAPHRAG_API_KEY"));
    }

    #[test]
    fn test_require_env_var_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("settings.yaml"),
            "models:\n  default_chat_model:\n    api_key: ${GRAPHRAG_API_KEY}\n",
        )
        .unwrap();
        let ws = EngineWorkspace::resolve(dir.path()).unwrap();

        let err = ws.require_env_var("GRAPHRAG_API_KEY", false, None).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingApiKey { .. }));
        assert!(ws.require_env_var("GRAPHRAG_API_KEY", true, None).is_ok());
    }

    #[test]
    fn test_require_env_var_satisfied_by_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.yaml"), "api_key: ${GRAPHRAG_API_KEY}\n").unwrap();
        fs::write(dir.path().join(".env"), "GRAPHRAG_API_KEY=sk-test\n").unwrap();
        let ws = EngineWorkspace::resolve(dir.path()).unwrap();
        assert!(ws.require_env_var("GRAPHRAG_API_KEY", false, None).is_ok());

        fs::write(dir.path().join(".env"), "GRAPHRAG_API_KEY=\n").unwrap();
        assert!(ws.require_env_var("GRAPHRAG_API_KEY", false, None).is_err());
    }

    #[test]
    fn test_require_env_var_checks_extra_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.yaml"), "").unwrap();
        let alt = dir.path().join("alt.yaml");
        fs::write(&alt, "api_key: ${GRAPHRAG_API_KEY}\n").unwrap();
        let ws = EngineWorkspace::resolve(dir.path()).unwrap();

        assert!(ws.require_env_var("GRAPHRAG_API_KEY", false, None).is_ok());
        let err = ws
            .require_env_var("GRAPHRAG_API_KEY", false, Some(&alt))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingApiKey {
                var: "GRAPHRAG_API_KEY".to_string(),
                path: alt,
            }
        );
    }
}
