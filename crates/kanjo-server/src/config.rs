//! Server configuration

use crate::cli::Cli;
use kanjo_classifiers::ModelConfig;
use kanjo_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Sentiment model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Listen address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Debug logging
    #[serde(default)]
    pub debug: bool,

    /// Load the model at startup rather than on the first request
    #[serde(default)]
    pub eager_load: bool,

    /// Expose Prometheus metrics on /metrics
    #[serde(default)]
    pub metrics: bool,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        config.apply_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Apply CLI flags and environment variables on top of the file values
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(model) = &cli.model {
            self.model.identifier = model.clone();
        }
        if let Some(revision) = &cli.revision {
            self.model.revision = revision.clone();
        }
        if let Some(device) = &cli.device {
            self.model.device = device.clone();
        }
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }

        // Flags can only switch features on
        self.debug |= cli.debug;
        self.eager_load |= cli.eager_load;
        self.metrics |= cli.metrics;
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        if self.host.trim().is_empty() {
            return Err(Error::config("host must not be empty"));
        }
        if self.port == 0 {
            return Err(Error::config("port must be between 1 and 65535"));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            host: default_host(),
            port: default_port(),
            debug: false,
            eager_load: false,
            metrics: false,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Built by hand: parsing would pick up any exported KANJO_* variables
    fn no_overrides() -> Cli {
        Cli {
            config: "kanjo.yaml".to_string(),
            model: None,
            revision: None,
            device: None,
            host: None,
            port: None,
            debug: false,
            eager_load: false,
            metrics: false,
        }
    }

    #[test]
    fn test_defaults_when_file_missing() {
        let config = ServerConfig::load("/nonexistent/kanjo.yaml", &no_overrides()).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.model.identifier, kanjo_classifiers::DEFAULT_MODEL_ID);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert!(!config.eager_load);
    }

    #[test]
    fn test_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
model:
  identifier: "./models/sentiment"
  max_length: 128
host: "0.0.0.0"
port: 8080
eager_load: true
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path().to_str().unwrap(), &no_overrides()).unwrap();
        assert_eq!(config.model.identifier, "./models/sentiment");
        assert_eq!(config.model.max_length, 128);
        assert_eq!(config.model.revision, "main");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert!(config.eager_load);
        assert!(!config.debug);
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: 8080\nmodel:\n  identifier: from-file").unwrap();

        let args = Cli {
            model: Some("from-cli".to_string()),
            port: Some(9000),
            debug: true,
            ..no_overrides()
        };
        let config = ServerConfig::load(file.path().to_str().unwrap(), &args).unwrap();

        assert_eq!(config.model.identifier, "from-cli");
        assert_eq!(config.port, 9000);
        assert!(config.debug);
    }

    #[test]
    fn test_flags_cannot_switch_file_features_off() {
        let mut config = ServerConfig {
            eager_load: true,
            metrics: true,
            ..Default::default()
        };

        config.apply_overrides(&no_overrides());

        assert!(config.eager_load);
        assert!(config.metrics);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: [not a port").unwrap();

        let err = ServerConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validation() {
        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.model.identifier = String::new();
        assert!(config.validate().is_err());
    }
}
