// src/config/loader.rs
//! Layered configuration loader
//!
//! Layers, lowest priority first: built-in defaults, each TOML file that
//! exists on the search path, then `NF__SECTION__FIELD` environment variables.

use crate::config::{constants::paths, NeurofeedbackConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
    #[error("Configuration parse error: {0}")]
    ParseError(String),
    #[error("Configuration validation errors: {}", .0.join("; "))]
    ValidationError(Vec<String>),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Configuration loader
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    required_path: Option<PathBuf>,
    env_overrides: Option<HashMap<String, String>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create loader searching the default locations
    pub fn new() -> Self {
        Self {
            config_paths: Self::discover_config_paths(),
            required_path: None,
            env_overrides: None,
        }
    }

    /// Create loader with custom optional paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            required_path: None,
            env_overrides: None,
        }
    }

    /// Add a file that must exist; it takes priority over the search path
    pub fn with_required_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.required_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replace the process environment with an explicit map of overrides
    pub fn with_env_overrides(mut self, vars: HashMap<String, String>) -> Self {
        self.env_overrides = Some(vars);
        self
    }

    /// Load the merged configuration
    ///
    /// Consistency checks that need the source's sample rate happen later,
    /// in [`NeurofeedbackConfig::validate_consistency`].
    pub fn load(&self) -> Result<NeurofeedbackConfig, ConfigError> {
        let defaults = toml::to_string(&NeurofeedbackConfig::default())?;
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(&defaults, config::FileFormat::Toml));

        for path in &self.config_paths {
            debug!(path = %path.display(), exists = path.exists(), "config search path");
            builder = builder.add_source(config::File::from(path.as_path()).required(false));
        }

        if let Some(path) = &self.required_path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }

        let environment = config::Environment::with_prefix(paths::ENV_PREFIX)
            .separator(paths::ENV_SEPARATOR)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("signal.channels")
            .source(self.env_overrides.clone());

        let config: NeurofeedbackConfig = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load and validate against a known sample rate
    pub fn load_validated(&self, sample_rate_hz: f32) -> Result<NeurofeedbackConfig, ConfigError> {
        let config = self.load()?;
        config
            .validate_consistency(sample_rate_hz)
            .map_err(ConfigError::ValidationError)?;
        Ok(config)
    }

    /// Export a configuration to a TOML file
    pub fn export_config<P: AsRef<Path>>(config: &NeurofeedbackConfig, path: P) -> Result<(), ConfigError> {
        let toml_content = toml::to_string_pretty(config)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(paths::CONFIG_FILE_NAME)];
        if let Ok(home) = std::env::var("HOME") {
            paths.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("neurofeedback")
                    .join(paths::CONFIG_FILE_NAME),
            );
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::metric::MetricKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn isolated_loader(paths: Vec<PathBuf>) -> ConfigLoader {
        ConfigLoader::with_paths(paths).with_env_overrides(HashMap::new())
    }

    fn toml_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_files() {
        let config = isolated_loader(vec![PathBuf::from("/nonexistent/neurofeedback.toml")])
            .load()
            .unwrap();
        assert_eq!(config.event.bounds_width, 0.04);
        assert_eq!(config.signal.channels, vec![0]);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = toml_file(
            "[baseline]\ndrift_threshold = 0.2\n\n[metric]\nkind = \"beta_concentration\"\n",
        );
        let config = isolated_loader(vec![file.path().to_path_buf()]).load().unwrap();

        assert_eq!(config.baseline.drift_threshold, 0.2);
        assert_eq!(config.metric.kind, MetricKind::BetaConcentration);
        assert_eq!(config.event.cooldown_s, 5.0);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = toml_file("[event]\nbounds_width = 0.2\n");
        let mut vars = HashMap::new();
        vars.insert("NF__EVENT__BOUNDS_WIDTH".to_string(), "0.3".to_string());
        vars.insert("NF__SIGNAL__CHANNELS".to_string(), "1,2".to_string());

        let config = ConfigLoader::with_paths(vec![file.path().to_path_buf()])
            .with_env_overrides(vars)
            .load()
            .unwrap();

        assert!((config.event.bounds_width - 0.3).abs() < 1e-6);
        assert_eq!(config.signal.channels, vec![1, 2]);
    }

    #[test]
    fn test_missing_required_file() {
        let result = isolated_loader(Vec::new())
            .with_required_file("/nonexistent/required.toml")
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_validated_rejects_inconsistent_file() {
        let file = toml_file("[signal]\nepoch_length_s = 10.0\n");
        let result = isolated_loader(vec![file.path().to_path_buf()]).load_validated(256.0);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_export_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exported.toml");
        let mut original = NeurofeedbackConfig::default();
        original.event.cooldown_s = 2.5;

        ConfigLoader::export_config(&original, &path).unwrap();
        let loaded = isolated_loader(vec![path]).load().unwrap();
        assert_eq!(loaded.event.cooldown_s, 2.5);
    }
}
