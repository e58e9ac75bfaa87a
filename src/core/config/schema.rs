//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Client Config
//!
//! ```toml
//! [server]
//! address = "https://registry.example.com"
//! port = 443
//!
//! [client]
//! store = "http"
//! page_size = 100
//! timeout_secs = 30
//! user_agent = "my-pipeline/1.0"
//! ```
//!
//! # Validation
//!
//! Config values are validated after parsing so that a bad file fails at
//! load time, not on the first store call.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Where the metadata store lives
    pub server: ServerConfig,

    /// Client behaviour
    pub client: ClientSettings,
}

impl ClientConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.client.validate()
    }
}

/// Store server location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Base address including scheme, e.g. `https://registry.example.com`
    pub address: Option<String>,

    /// Port; defaults depend on the scheme
    pub port: Option<u16>,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(address) = &self.address {
            if !(address.starts_with("http://") || address.starts_with("https://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "server address '{}' must start with http:// or https://",
                    address
                )));
            }
        }

        if self.port == Some(0) {
            return Err(ConfigError::InvalidValue("port cannot be 0".to_string()));
        }

        Ok(())
    }
}

/// Client-side settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSettings {
    /// Store backend ("http" or "memory")
    pub store: Option<String>,

    /// Page size hint for listings
    pub page_size: Option<usize>,

    /// Per-call deadline in seconds
    pub timeout_secs: Option<u64>,

    /// User-Agent sent by the HTTP store
    pub user_agent: Option<String>,
}

impl ClientSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(store) = &self.store {
            let valid = crate::store::valid_store_names();
            if !valid.contains(&store.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid store '{}', must be one of: {}",
                    store,
                    valid.join(", ")
                )));
            }
        }

        if self.page_size == Some(0) {
            return Err(ConfigError::InvalidValue(
                "page_size must be at least 1".to_string(),
            ));
        }

        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "timeout_secs must be at least 1".to_string(),
            ));
        }

        if let Some(agent) = &self.user_agent {
            if agent.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "user_agent cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn parse_full_config() {
        let config: ClientConfig = toml::from_str(
            r#"
            [server]
            address = "https://registry.example.com"
            port = 8443

            [client]
            store = "memory"
            page_size = 25
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, Some(8443));
        assert_eq!(config.client.store.as_deref(), Some("memory"));
        assert_eq!(config.client.page_size, Some(25));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<ClientConfig, _> = toml::from_str(
            r#"
            [client]
            retries = 3
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn address_without_scheme_rejected() {
        let config = ClientConfig {
            server: ServerConfig {
                address: Some("registry.example.com".into()),
                port: None,
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn zero_values_rejected() {
        for settings in [
            ClientSettings {
                page_size: Some(0),
                ..Default::default()
            },
            ClientSettings {
                timeout_secs: Some(0),
                ..Default::default()
            },
        ] {
            assert!(settings.validate().is_err());
        }
        let server = ServerConfig {
            address: None,
            port: Some(0),
        };
        assert!(server.validate().is_err());
    }

    #[test]
    fn unknown_store_rejected() {
        let settings = ClientSettings {
            store: Some("grpc".into()),
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("http, memory"));
    }
}
