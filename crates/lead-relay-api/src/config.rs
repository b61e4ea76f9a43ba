//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use axum::http::HeaderValue;
use lead_relay_core::{CrmClientConfig, LeadSourceTable, NormalizationConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Service configuration
///
/// Every section carries serde defaults, so an empty configuration source
/// yields a working relay for the deployed sites.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Origin allow-list
    pub cors: CorsConfig,

    /// Outbound CRM webhook settings
    pub crm: CrmConfig,

    /// Host → lead-source code mapping
    pub lead_sources: LeadSourceTable,

    /// Payload normalization settings
    pub normalization: NormalizationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check the configuration for values that would make the relay unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.cors.validate()?;
        self.crm.validate()?;

        if self.lead_sources.default_code.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "lead_sources.default_code".to_string(),
            });
        }

        Ok(())
    }

    /// Apply the `PORT` environment variable, which takes precedence over
    /// every other source.
    pub fn apply_port_override(&mut self, value: Option<&str>) -> Result<(), ConfigError> {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(());
        };

        self.server.port = raw.parse().map_err(|_| ConfigError::Invalid {
            message: format!("PORT must be a port number, got '{}'", raw),
        })?;
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "server.host".to_string(),
            });
        }
        if self.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Origin allow-list configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins (scheme + host) allowed to post submissions. Requests without
    /// an `Origin` header are always allowed.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "https://heritage-based-european-citizenship.lawoffice.org.il".to_string(),
                "https://german-austrian-citizenship.lawoffice.org.il".to_string(),
                // Spelling served by the live German/Austrian site.
                "https://german-austiran-citizenship.lawoffice.org.il".to_string(),
            ],
        }
    }
}

impl CorsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for origin in &self.allowed_origins {
            if origin.trim().is_empty() || HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::Invalid {
                    message: format!("cors.allowed_origins contains an invalid origin: '{}'", origin),
                });
            }
        }
        Ok(())
    }
}

/// CRM webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmConfig {
    /// Catch-hook endpoint
    pub base_url: String,

    /// Account identifier sent as `uid`
    pub uid: String,

    /// Outbound request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for CrmConfig {
    fn default() -> Self {
        let defaults = CrmClientConfig::default();
        Self {
            base_url: defaults.base_url,
            uid: defaults.uid,
            timeout_seconds: defaults.timeout.as_secs(),
        }
    }
}

impl CrmConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::Invalid {
                    message: format!("crm.base_url is not an http(s) URL: '{}'", self.base_url),
                })
            }
        }
        if self.uid.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "crm.uid".to_string(),
            });
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "crm.timeout_seconds must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Client settings for [`lead_relay_core::CrmWebhookClient`].
    pub fn client_config(&self) -> CrmClientConfig {
        CrmClientConfig::default()
            .with_base_url(self.base_url.clone())
            .with_uid(self.uid.clone())
            .with_timeout(Duration::from_secs(self.timeout_seconds))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level, used when `RUST_LOG` is not set
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}
