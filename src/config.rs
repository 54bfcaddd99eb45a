//! Harvest run configuration.
//!
//! A harvest run is described by a JSON file:
//!
//! ```json
//! {
//!   "languages": ["java", "py"],
//!   "max_workers": 8,
//!   "output_dir": "data",
//!   "missing_repo": "drop"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::enumerator::DEFAULT_INITIAL_UPPER_BOUND;
use crate::error::{Result, SonarError};
use crate::resolver::MissingRepoPolicy;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarvestConfig {
    /// Languages to enumerate, as SonarCloud language keys.
    pub languages: Vec<String>,

    /// Concurrent repository lookups.
    pub max_workers: usize,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Ceiling of the finite `ncloc` ranges.
    #[serde(default = "default_initial_upper_bound")]
    pub initial_upper_bound: u64,

    #[serde(default)]
    pub missing_repo: MissingRepoPolicy,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_initial_upper_bound() -> u64 {
    DEFAULT_INITIAL_UPPER_BOUND
}

impl HarvestConfig {
    /// Read, parse and validate a config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|err| SonarError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let config = Self::from_json(&contents).map_err(|err| match err {
            SonarError::ParseError(err) => SonarError::Config {
                path: path.to_path_buf(),
                message: err.to_string(),
            },
            other => other,
        })?;

        tracing::debug!(path = %path.display(), languages = ?config.languages, "loaded config");
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: HarvestConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.languages.iter().all(|l| l.trim().is_empty()) {
            return Err(SonarError::ConfigMissing(
                "at least one language in 'languages'".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(SonarError::ConfigMissing(
                "'max_workers' must be at least 1".to_string(),
            ));
        }
        if self.initial_upper_bound == 0 {
            return Err(SonarError::ConfigMissing(
                "'initial_upper_bound' must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarvestConfig::from_json(r#"{"languages": ["java"], "max_workers": 4}"#).unwrap();
        assert_eq!(config.languages, vec!["java"]);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.initial_upper_bound, 100_000);
        assert_eq!(config.missing_repo, MissingRepoPolicy::Keep);
    }

    #[test]
    fn test_all_fields() {
        let config = HarvestConfig::from_json(
            r#"{
                "languages": ["py", "js"],
                "max_workers": 2,
                "output_dir": "/tmp/out",
                "initial_upper_bound": 5000,
                "missing_repo": "drop"
            }"#,
        )
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.initial_upper_bound, 5000);
        assert_eq!(config.missing_repo, MissingRepoPolicy::Drop);
    }

    #[test]
    fn test_missing_required_field() {
        let err = HarvestConfig::from_json(r#"{"languages": ["java"]}"#).unwrap_err();
        assert!(matches!(err, SonarError::ParseError(_)));
    }

    #[test]
    fn test_validation() {
        let err = HarvestConfig::from_json(r#"{"languages": [], "max_workers": 1}"#).unwrap_err();
        assert!(matches!(err, SonarError::ConfigMissing(_)));

        let err =
            HarvestConfig::from_json(r#"{"languages": ["java"], "max_workers": 0}"#).unwrap_err();
        assert!(matches!(err, SonarError::ConfigMissing(_)));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let err = HarvestConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, SonarError::Config { .. }));

        std::fs::write(&path, "{not json").unwrap();
        let err = HarvestConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, SonarError::Config { .. }));

        std::fs::write(&path, r#"{"languages": ["go"], "max_workers": 3}"#).unwrap();
        let config = HarvestConfig::from_path(&path).unwrap();
        assert_eq!(config.languages, vec!["go"]);
    }
}
