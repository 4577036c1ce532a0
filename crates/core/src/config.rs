//! TOML-based project configuration for Lockstep.
//!
//! Configuration lives in `<project>/.lockstep/config.toml`. Every section is
//! optional; a project without a config file runs on defaults. Store paths
//! are relative to the project root and resolved at load time.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::store::Timeouts;

/// Name of the control directory holding config and the merge lock.
pub const CONTROL_DIR: &str = ".lockstep";

/// Config file name inside the control directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding `row_store.path`.
pub const ROW_STORE_ENV: &str = "LOCKSTEP_ROW_STORE";

/// Environment variable overriding `row_store.binary`.
pub const DOLT_BIN_ENV: &str = "LOCKSTEP_DOLT_BIN";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level project configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectSection,

    /// Structured row store (Dolt) settings.
    #[serde(default)]
    pub row_store: RowStoreConfig,

    /// File-tree store (Git) settings.
    #[serde(default)]
    pub tree_store: TreeStoreConfig,

    /// Per-call engine timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Project root all relative paths resolve against (not serialized).
    #[serde(skip)]
    pub root: PathBuf,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Row store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowStoreConfig {
    /// Directory of the dolt repository, relative to the project root.
    #[serde(default = "default_row_store_path")]
    pub path: PathBuf,

    /// `dolt` executable name or path.
    #[serde(default = "default_dolt_binary")]
    pub binary: String,
}

fn default_row_store_path() -> PathBuf {
    PathBuf::from(CONTROL_DIR).join("rows")
}

fn default_dolt_binary() -> String {
    "dolt".into()
}

impl Default for RowStoreConfig {
    fn default() -> Self {
        Self {
            path: default_row_store_path(),
            binary: default_dolt_binary(),
        }
    }
}

/// Tree store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeStoreConfig {
    /// Git working tree, relative to the project root.
    #[serde(default = "default_tree_store_path")]
    pub path: PathBuf,
}

fn default_tree_store_path() -> PathBuf {
    PathBuf::from(".")
}

impl Default for TreeStoreConfig {
    fn default() -> Self {
        Self {
            path: default_tree_store_path(),
        }
    }
}

/// Timeout budgets in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Metadata reads (branch, HEAD, conflict listing). Default 5.
    #[serde(default = "default_metadata_secs")]
    pub metadata_secs: u64,

    /// Merges, resets, aborts and previews. Default 60.
    #[serde(default = "default_merge_secs")]
    pub merge_secs: u64,
}

fn default_metadata_secs() -> u64 {
    5
}

fn default_merge_secs() -> u64 {
    60
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            metadata_secs: default_metadata_secs(),
            merge_secs: default_merge_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl ProjectConfig {
    /// Load a [`ProjectConfig`] from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading project configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: ProjectConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("project configuration parsed successfully");
        Ok(config)
    }

    /// Load the configuration for the project rooted at `root`, falling back
    /// to defaults when no config file exists. Applies environment overrides
    /// and validates.
    pub fn load_for_project<P: AsRef<Path>>(root: P) -> Result<Self, ConfigError> {
        let root = root.as_ref();
        let file = root.join(CONTROL_DIR).join(CONFIG_FILE);
        let mut config = if file.exists() {
            Self::load_from_file(&file)?
        } else {
            debug!(path = %file.display(), "no config file, using defaults");
            Self::default()
        };
        config.root = root.to_path_buf();
        config.resolve_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `LOCKSTEP_*` environment overrides.
    pub fn resolve_env_overrides(&mut self) {
        if let Some(path) = non_empty_env(ROW_STORE_ENV) {
            debug!(path = %path, "row store path overridden from environment");
            self.row_store.path = PathBuf::from(path);
        }
        if let Some(binary) = non_empty_env(DOLT_BIN_ENV) {
            debug!(binary = %binary, "dolt binary overridden from environment");
            self.row_store.binary = binary;
        }
    }

    /// Validate that all values are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_store.binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "row_store.binary".into(),
                detail: "dolt binary must not be empty".into(),
            });
        }
        if self.timeouts.metadata_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeouts.metadata_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }
        if self.timeouts.merge_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeouts.merge_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }
        Ok(())
    }

    /// Absolute-or-root-relative location of the row store.
    pub fn row_store_path(&self) -> PathBuf {
        self.root.join(&self.row_store.path)
    }

    /// Absolute-or-root-relative location of the tree store.
    pub fn tree_store_path(&self) -> PathBuf {
        self.root.join(&self.tree_store.path)
    }

    /// Directory holding the config file and the merge lock.
    pub fn control_dir(&self) -> PathBuf {
        self.root.join(CONTROL_DIR)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            metadata: Duration::from_secs(self.timeouts.metadata_secs),
            merge: Duration::from_secs(self.timeouts.merge_secs),
        }
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load_for_project(dir.path()).unwrap();
        assert_eq!(config.control_dir(), dir.path().join(".lockstep"));
        assert_eq!(config.tree_store_path(), dir.path().join("."));
        assert_eq!(config.timeouts().metadata, Duration::from_secs(5));
        assert_eq!(config.timeouts().merge, Duration::from_secs(60));
        assert_eq!(config.project.log_level, "warn");
    }

    #[test]
    fn test_parse_partial_file() {
        let toml_str = r#"
[row_store]
path = "data/rows"

[timeouts]
merge_secs = 120
"#;
        let config: ProjectConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.row_store.path, PathBuf::from("data/rows"));
        assert_eq!(config.row_store.binary, "dolt");
        assert_eq!(config.timeouts.merge_secs, 120);
        assert_eq!(config.timeouts.metadata_secs, 5);
    }

    #[test]
    fn test_load_from_control_dir() {
        let dir = tempfile::tempdir().unwrap();
        let control = dir.path().join(CONTROL_DIR);
        std::fs::create_dir_all(&control).unwrap();
        std::fs::write(
            control.join(CONFIG_FILE),
            "[tree_store]\npath = \"content\"\n",
        )
        .unwrap();

        let config = ProjectConfig::load_for_project(dir.path()).unwrap();
        assert_eq!(config.tree_store_path(), dir.path().join("content"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = ProjectConfig::default();
        config.timeouts.merge_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeouts.merge_secs"));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timeouts\nmerge_secs = ").unwrap();
        assert!(matches!(
            ProjectConfig::load_from_file(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ProjectConfig::load_from_file("/nonexistent/config.toml"),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
