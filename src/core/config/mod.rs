//! core::config
//!
//! Client configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order; the first file found wins:
//! 1. An explicit path passed by the caller
//! 2. `<config_dir>/model-registry/config.toml` (canonical write location)
//! 3. `~/.model-registry/config.toml` (compatibility, warns)
//!
//! Missing files are not an error; defaults are used. Environment variables
//! are not consulted.
//!
//! # Example
//!
//! ```no_run
//! use model_registry::core::config::ClientConfig;
//!
//! let result = ClientConfig::load(None).unwrap();
//! let config = result.config;
//!
//! println!("Store: {} at {}", config.store(), config.base_url());
//! println!("Page size: {}", config.page_size());
//! ```

pub mod schema;

pub use schema::{ClientConfig, ClientSettings, ServerConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::store::http::DEFAULT_USER_AGENT;
use crate::store::CallOptions;

/// Default listing page size.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default per-call deadline in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("config directory not found")]
    NoConfigDir,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: ClientConfig,
    /// The file it was loaded from, if any.
    pub path: Option<PathBuf>,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

impl ClientConfig {
    /// Load configuration from an explicit path or the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path cannot be read, or if a config
    /// file exists but cannot be parsed or fails validation.
    pub fn load(explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::read_config(path)?;
            config.validate()?;
            return Ok(ConfigLoadResult {
                config,
                path: Some(path.to_path_buf()),
                warnings: Vec::new(),
            });
        }

        let canonical = Self::config_path().ok();
        let compat = dirs::home_dir().map(|home| home.join(".model-registry/config.toml"));
        Self::load_first(canonical.as_deref(), compat.as_deref())
    }

    /// Load the first existing file among the canonical and compatibility paths.
    fn load_first(
        canonical: Option<&Path>,
        compat: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let found = match (canonical, compat) {
            (Some(path), _) if path.exists() => Some(path.to_path_buf()),
            (_, Some(path)) if path.exists() => {
                warnings.push(ConfigWarning {
                    message: match canonical {
                        Some(c) => format!(
                            "Using deprecated config location. Please move to '{}'",
                            c.display()
                        ),
                        None => "Using deprecated config location".to_string(),
                    },
                    path: path.to_path_buf(),
                });
                Some(path.to_path_buf())
            }
            _ => None,
        };

        let config = match &found {
            Some(path) => Self::read_config(path)?,
            None => ClientConfig::default(),
        };
        config.validate()?;

        Ok(ConfigLoadResult {
            config,
            path: found,
            warnings,
        })
    }

    /// Read and parse a config file.
    fn read_config(path: &Path) -> Result<ClientConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical config path.
    ///
    /// Returns `<config_dir>/model-registry/config.toml`.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("model-registry/config.toml"))
    }

    /// Write this config atomically to `path`.
    ///
    /// Creates parent directories if needed. Writes to a temp file in the
    /// same directory, then renames it into place.
    pub fn write_atomic(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Get the server address.
    ///
    /// Defaults to `http://localhost` if not configured.
    pub fn address(&self) -> &str {
        self.server
            .address
            .as_deref()
            .unwrap_or("http://localhost")
            .trim_end_matches('/')
    }

    /// Get the server port.
    ///
    /// Defaults to 443 for `https` addresses and 8080 otherwise.
    pub fn port(&self) -> u16 {
        self.server.port.unwrap_or_else(|| {
            if self.address().starts_with("https://") {
                443
            } else {
                8080
            }
        })
    }

    /// Get the full store base URL (`address:port`).
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.address(), self.port())
    }

    /// Get the store provider name.
    ///
    /// Defaults to "http" if not configured.
    pub fn store(&self) -> &str {
        self.client.store.as_deref().unwrap_or("http")
    }

    /// Get the listing page size.
    ///
    /// Defaults to 100 if not configured.
    pub fn page_size(&self) -> usize {
        self.client.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Get the per-call deadline.
    ///
    /// Defaults to 30 seconds if not configured.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.client.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Get the User-Agent for the HTTP store.
    pub fn user_agent(&self) -> &str {
        self.client
            .user_agent
            .as_deref()
            .unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Per-call options derived from this config.
    pub fn call_options(&self) -> CallOptions {
        CallOptions::with_timeout(self.timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.address(), "http://localhost");
        assert_eq!(config.port(), 8080);
        assert_eq!(config.base_url(), "http://localhost:8080");
        assert_eq!(config.store(), "http");
        assert_eq!(config.page_size(), 100);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.user_agent(), DEFAULT_USER_AGENT);
        assert_eq!(
            config.call_options().timeout,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn https_defaults_to_443() {
        let config = ClientConfig {
            server: ServerConfig {
                address: Some("https://registry.example.com/".into()),
                port: None,
            },
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://registry.example.com:443");
    }

    #[test]
    fn load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [server]
            address = "http://store.internal"
            port = 9090

            [client]
            page_size = 10
            "#,
        )
        .unwrap();

        let result = ClientConfig::load(Some(&path)).unwrap();
        assert_eq!(result.path.as_deref(), Some(path.as_path()));
        assert_eq!(result.config.base_url(), "http://store.internal:9090");
        assert_eq!(result.config.page_size(), 10);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn load_explicit_missing_fails() {
        let temp = TempDir::new().unwrap();
        let result = ClientConfig::load(Some(&temp.path().join("missing.toml")));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn load_invalid_value_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[client]\nstore = \"carrier-pigeon\"\n").unwrap();

        let result = ClientConfig::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn load_malformed_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[server\naddress = ").unwrap();

        let result = ClientConfig::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn load_first_prefers_canonical() {
        let temp = TempDir::new().unwrap();
        let canonical = temp.path().join("canonical.toml");
        let compat = temp.path().join("compat.toml");
        fs::write(&canonical, "[client]\npage_size = 1\n").unwrap();
        fs::write(&compat, "[client]\npage_size = 2\n").unwrap();

        let result = ClientConfig::load_first(Some(&canonical), Some(&compat)).unwrap();
        assert_eq!(result.config.page_size(), 1);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn load_first_compat_warns() {
        let temp = TempDir::new().unwrap();
        let canonical = temp.path().join("canonical.toml");
        let compat = temp.path().join("compat.toml");
        fs::write(&compat, "[client]\npage_size = 2\n").unwrap();

        let result = ClientConfig::load_first(Some(&canonical), Some(&compat)).unwrap();
        assert_eq!(result.config.page_size(), 2);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("deprecated"));
    }

    #[test]
    fn load_first_nothing_found_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let result = ClientConfig::load_first(
            Some(&temp.path().join("a.toml")),
            Some(&temp.path().join("b.toml")),
        )
        .unwrap();
        assert!(result.path.is_none());
        assert_eq!(result.config, ClientConfig::default());
    }

    #[test]
    fn write_atomic_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");

        let config = ClientConfig {
            server: ServerConfig {
                address: Some("https://registry.example.com".into()),
                port: Some(8443),
            },
            client: ClientSettings {
                store: Some("memory".into()),
                ..Default::default()
            },
        };
        config.write_atomic(&path).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());
        let loaded = ClientConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.config, config);
    }

    #[test]
    fn write_atomic_refuses_invalid() {
        let temp = TempDir::new().unwrap();
        let config = ClientConfig {
            client: ClientSettings {
                page_size: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.write_atomic(&temp.path().join("c.toml")).is_err());
    }
}
