use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Error types for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO-related errors (file access, permissions, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Missing or unusable storage configuration. Fatal at process
    /// startup, never recoverable per-request.
    #[error("Storage configuration error: {0}")]
    Storage(String),

    /// Other validation errors
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Configuration for a RecordBase node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Path where the node stores its data
    pub storage_path: PathBuf,
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Seconds between scheduled schema compilations
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_update_interval_secs() -> u64 {
    300
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("data"),
            bind_address: default_bind_address(),
            update_interval_secs: default_update_interval_secs(),
        }
    }
}

impl NodeConfig {
    /// Create a new node configuration with the specified storage path
    pub fn new(storage_path: PathBuf) -> Self {
        Self {
            storage_path,
            ..Default::default()
        }
    }

    /// Load a configuration from a TOML file and validate it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_path.as_os_str().is_empty() {
            return Err(ConfigError::Storage(
                "storage_path must not be empty".to_string(),
            ));
        }
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "bind_address must not be empty".to_string(),
            ));
        }
        if self.update_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "update_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let config: NodeConfig = toml::from_str(r#"storage_path = "/tmp/recordbase""#).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert_eq!(config.update_interval_secs, 300);
    }

    #[test]
    fn zero_interval_rejected() {
        let config: NodeConfig = toml::from_str(
            r#"
storage_path = "/tmp/recordbase"
update_interval_secs = 0
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn empty_storage_path_is_fatal() {
        let config: NodeConfig = toml::from_str(r#"storage_path = """#).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Storage(_))));
    }
}
