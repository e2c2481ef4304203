//! Configuration management for vecsearch
//!
//! Configuration is loaded once at startup and passed into the core as an
//! immutable value; nothing reads process-wide state at call time.

use crate::error::{Result, VecSearchError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Embedding provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMode {
    /// Local/remote embedding service speaking `/embed` + `/embed/batch`
    Service,
    /// Direct OpenAI-compatible embeddings endpoint
    Openai,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub provider: ProviderConfig,
    pub indexing: IndexingConfig,
    pub search: SearchConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub mode: ProviderMode,
    /// Base URL of the embedding service (service mode)
    pub service_url: String,
    /// Base URL of the OpenAI-compatible API (openai mode)
    pub api_base_url: String,
    /// Environment variable holding the API key (openai mode)
    pub api_key_env: String,
    /// Model identifier recorded with every embedding
    pub model: String,
    /// Fixed embedding dimension for the model
    pub dimension: usize,
    /// Timeout for single-embedding calls, seconds
    pub timeout_secs: u64,
    /// Timeout for batch calls, seconds; defaults to 2x the single timeout
    #[serde(default)]
    pub batch_timeout_secs: Option<u64>,
    /// Maximum characters per input after sanitization (openai mode)
    pub max_input_chars: usize,
}

impl ProviderConfig {
    /// Effective batch timeout (batch payloads are larger)
    pub fn batch_timeout(&self) -> u64 {
        self.batch_timeout_secs.unwrap_or(self.timeout_secs * 2)
    }
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Catalog page size, also the embedding batch size
    pub batch_size: usize,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub default_threshold: f32,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VecSearchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| VecSearchError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate configuration
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VecSearchError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| VecSearchError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: VECSEARCH_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("VECSEARCH_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "PROVIDER__MODE" => {
                self.provider.mode = match value {
                    "service" => ProviderMode::Service,
                    "openai" => ProviderMode::Openai,
                    _ => {
                        return Err(VecSearchError::InvalidConfigValue {
                            path: path.to_string(),
                            message: format!("Unknown provider mode '{}'", value),
                        })
                    }
                };
            }
            "PROVIDER__SERVICE_URL" => {
                self.provider.service_url = value.to_string();
            }
            "PROVIDER__MODEL" => {
                self.provider.model = value.to_string();
            }
            "STORAGE__DB_PATH" => {
                self.storage.db_path = PathBuf::from(value);
            }
            "INDEXING__BATCH_SIZE" => {
                self.indexing.batch_size =
                    value.parse().map_err(|_| VecSearchError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as integer", value),
                    })?;
            }
            "SEARCH__DEFAULT_THRESHOLD" => {
                self.search.default_threshold =
                    value.parse().map_err(|_| VecSearchError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as float", value),
                    })?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            VecSearchError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("vecsearch").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| VecSearchError::Config("Cannot determine home directory".to_string()))?;

        Ok(home_dir.join(".vecsearch"))
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("~/.vecsearch");

        Self {
            storage: StorageConfig {
                db_path: data_dir.join("vecsearch.db"),
            },
            provider: ProviderConfig {
                mode: ProviderMode::Service,
                service_url: "http://localhost:8001".to_string(),
                api_base_url: "https://api.openai.com/v1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                model: "text-embedding-ada-002".to_string(),
                dimension: 1536,
                timeout_secs: 30,
                batch_timeout_secs: None,
                max_input_chars: 8000,
            },
            indexing: IndexingConfig { batch_size: 100 },
            search: SearchConfig {
                default_limit: 20,
                default_threshold: 0.7,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_validates() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn batch_timeout_defaults_to_double() {
        let config = Config::default();
        assert_eq!(config.provider.batch_timeout(), 60);

        let mut config = config;
        config.provider.batch_timeout_secs = Some(45);
        assert_eq!(config.provider.batch_timeout(), 45);
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.indexing.batch_size = 42;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.indexing.batch_size, 42);
        assert_eq!(loaded.provider.mode, ProviderMode::Service);
    }

    #[test]
    fn missing_file_is_reported() {
        let result = Config::load(Path::new("/nonexistent/config.toml"));
        assert!(matches!(
            result,
            Err(VecSearchError::ConfigNotFound { .. })
        ));
    }
}
