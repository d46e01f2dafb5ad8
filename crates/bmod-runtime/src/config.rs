// config.rs — Runtime configuration.
//
// RuntimeConfig decides where state lives and who may change policies. The
// `for_project()` constructor lays everything out under `.bmod/` in the
// project root; `.bmod/config.toml` may override the settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// Settings read from `.bmod/config.toml`. Every field has a default, so an
/// empty or missing file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Operator roles allowed to add or remove policies.
    #[serde(default = "default_admin_roles")]
    pub admin_roles: Vec<String>,

    /// Upper bound on one audit write, in milliseconds. 0 disables the bound.
    #[serde(default = "default_audit_timeout_ms")]
    pub audit_timeout_ms: u64,
}

fn default_admin_roles() -> Vec<String> {
    vec!["admin".to_string()]
}

fn default_audit_timeout_ms() -> u64 {
    5_000
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            admin_roles: default_admin_roles(),
            audit_timeout_ms: default_audit_timeout_ms(),
        }
    }
}

impl RuntimeSettings {
    pub fn load(path: &Path) -> Result<Self, RuntimeError> {
        let invalid = |reason: String| RuntimeError::Config {
            path: path.to_path_buf(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        toml::from_str(&content).map_err(|e| invalid(e.to_string()))
    }

    /// Load settings, falling back to defaults only when the file is absent.
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, RuntimeError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Where the runtime keeps its state, plus the loaded settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Project root the `.bmod/` directory lives in.
    pub root: PathBuf,

    /// One JSON file per policy.
    pub policies_dir: PathBuf,

    /// Append-only JSONL audit log.
    pub audit_log: PathBuf,

    /// Optional settings file.
    pub config_file: PathBuf,

    #[serde(default)]
    pub settings: RuntimeSettings,
}

impl RuntimeConfig {
    /// Standard `.bmod/` layout with default settings.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let dir = root.join(".bmod");
        Self {
            policies_dir: dir.join("policies"),
            audit_log: dir.join("audit.jsonl"),
            config_file: dir.join("config.toml"),
            settings: RuntimeSettings::default(),
            root,
        }
    }

    /// Standard layout with settings from `.bmod/config.toml`, if present.
    pub fn load(project_root: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let mut config = Self::for_project(project_root);
        config.settings = RuntimeSettings::load_or_default(&config.config_file)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn for_project_layout() {
        let config = RuntimeConfig::for_project("/work/agent");
        assert_eq!(config.policies_dir, PathBuf::from("/work/agent/.bmod/policies"));
        assert_eq!(config.audit_log, PathBuf::from("/work/agent/.bmod/audit.jsonl"));
        assert_eq!(config.settings.admin_roles, vec!["admin"]);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = RuntimeConfig::load(dir.path()).unwrap();
        assert_eq!(config.settings, RuntimeSettings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".bmod")).unwrap();
        std::fs::write(
            dir.path().join(".bmod/config.toml"),
            "admin_roles = [\"admin\", \"security-officer\"]\n",
        )
        .unwrap();

        let config = RuntimeConfig::load(dir.path()).unwrap();
        assert_eq!(config.settings.admin_roles, vec!["admin", "security-officer"]);
        assert_eq!(config.settings.audit_timeout_ms, 5_000);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".bmod")).unwrap();
        std::fs::write(dir.path().join(".bmod/config.toml"), "admin_roles = 7").unwrap();
        assert!(matches!(
            RuntimeConfig::load(dir.path()),
            Err(RuntimeError::Config { .. })
        ));
    }
}
