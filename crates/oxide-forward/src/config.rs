//! Run configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{ForwardError, Result};

/// What to do with conflicting objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DropPolicy {
    /// Ask before dropping.
    #[default]
    Ask,
    /// Drop without asking.
    Always,
    /// Never drop; run the script over the existing objects.
    Never,
}

/// Settings for a forward engineering run, usually read from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Built-in dialect name.
    pub dialect: Option<String>,
    /// Custom dialect definition; takes precedence over `dialect`.
    pub dialect_file: Option<PathBuf>,
    /// Schema to qualify object names with.
    pub target_schema: Option<String>,
    /// Database URL of the target.
    pub database_url: Option<String>,
    /// Conflict handling.
    pub drop_policy: DropPolicy,
}

impl ForwardConfig {
    /// Loads configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| ForwardError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolves the configured dialect; `generic` when none is set.
    pub fn load_dialect(&self) -> Result<Dialect> {
        match (&self.dialect_file, &self.dialect) {
            (Some(path), _) => Dialect::from_file(path),
            (None, Some(name)) => Dialect::builtin(name),
            (None, None) => Dialect::builtin("generic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"dialect": "oracle", "target_schema": "SALES", "drop_policy": "ALWAYS"}}"#
        )
        .unwrap();

        let config = ForwardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.dialect.as_deref(), Some("oracle"));
        assert_eq!(config.target_schema.as_deref(), Some("SALES"));
        assert_eq!(config.drop_policy, DropPolicy::Always);
        assert_eq!(config.load_dialect().unwrap().name, "oracle");
    }

    #[test]
    fn test_defaults() {
        let config: ForwardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.drop_policy, DropPolicy::Ask);
        assert_eq!(config.load_dialect().unwrap().name, "generic");
    }

    #[test]
    fn test_dialect_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.json");
        std::fs::write(
            &path,
            r#"{"name": "tiny", "types": [{"name": "TXT", "code": "VARCHAR", "max_precision": 80}]}"#,
        )
        .unwrap();

        let config = ForwardConfig {
            dialect: Some("oracle".to_string()),
            dialect_file: Some(path),
            ..ForwardConfig::default()
        };
        assert_eq!(config.load_dialect().unwrap().name, "tiny");
    }

    #[test]
    fn test_parse_error_names_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = ForwardConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ForwardError::Parse { .. }));
    }
}
