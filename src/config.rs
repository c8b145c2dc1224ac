use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ml::{Hyperparameters, ModelError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("test_size must lie strictly between 0 and 1, got {0}")]
    TestSize(f64),

    #[error(transparent)]
    Hyperparameters(#[from] ModelError),
}

/// Parameters of one training-workflow run.
///
/// Every field has a default, so a config file only lists what it changes:
///
/// ```json
/// { "hyperparameters": { "C": 1.0 }, "random_state": 7 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    pub data_path: PathBuf,
    pub hyperparameters: Hyperparameters,
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/penguins.csv"),
            hyperparameters: Hyperparameters::new(0.1, 5000),
            test_size: 0.2,
            random_state: 42,
        }
    }
}

impl WorkflowConfig {
    /// Read a JSON config file. Does not validate; call [`WorkflowConfig::validate`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Row-count dependent checks happen at split time
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ConfigError::TestSize(self.test_size));
        }
        self.hyperparameters.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_workflow_signature() {
        let cfg = WorkflowConfig::default();
        assert_eq!(cfg.hyperparameters.c, 0.1);
        assert_eq!(cfg.hyperparameters.max_iter, 5000);
        assert_eq!(cfg.test_size, 0.2);
        assert_eq!(cfg.random_state, 42);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflow.json");
        std::fs::write(
            &path,
            r#"{ "hyperparameters": { "C": 1.0 }, "random_state": 7 }"#,
        )
        .unwrap();

        let cfg = WorkflowConfig::from_file(&path).unwrap();
        assert_eq!(cfg.random_state, 7);
        assert_eq!(cfg.hyperparameters.c, 1.0);
        // nested defaults come from Hyperparameters, not the workflow
        assert_eq!(cfg.hyperparameters.max_iter, 100);
        assert_eq!(cfg.test_size, 0.2);
    }

    #[test]
    fn test_unknown_field_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflow.json");
        std::fs::write(&path, r#"{ "seed": 1 }"#).unwrap();
        assert!(matches!(
            WorkflowConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            WorkflowConfig::from_file(&dir.path().join("nope.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = WorkflowConfig {
            test_size: 1.0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::TestSize(_))));

        let cfg = WorkflowConfig {
            hyperparameters: Hyperparameters::new(0.1, 0),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Hyperparameters(_))));
    }
}
