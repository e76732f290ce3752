//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use setback::{DEFAULT_TARGET_SCORE, TableConfig};
use std::{net::SocketAddr, str::FromStr};

const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus exporter address, if metrics are enabled
    pub metrics_bind: Option<SocketAddr>,
    /// The table this server hosts
    pub table: TableConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `target_override` - Optional target score override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        target_override: Option<i32>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND")?.unwrap_or(SocketAddr::from(([127, 0, 0, 1], 8080))),
        };
        let metrics_bind = parse_addr("METRICS_BIND")?;

        let defaults = TableConfig::default();
        let table = TableConfig {
            name: std::env::var("TABLE_NAME").unwrap_or(defaults.name),
            target_score: match target_override {
                Some(target) => target,
                None => parse_env_or("TARGET_SCORE", DEFAULT_TARGET_SCORE)?,
            },
            inbox_capacity: parse_env_or("INBOX_CAPACITY", defaults.inbox_capacity)?,
            outbound_capacity: parse_env_or("OUTBOUND_CAPACITY", defaults.outbound_capacity)?,
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            table,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.table.validate().map_err(|e| ConfigError::Invalid {
            var: e.field.to_uppercase(),
            reason: e.reason.to_string(),
        })?;

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server address ({})", self.bind),
            });
        }

        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            metrics_bind: None,
            table: TableConfig::default(),
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Reads an optional socket address. Unset is `None`; set but malformed is an error.
fn parse_addr(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("'{value}' is not an IP:PORT address (e.g. {DEFAULT_BIND})"),
            }),
        _ => Ok(None),
    }
}

/// Reads a variable, falling back to `default` when it is unset or blank.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    parse_value(key, std::env::var(key).ok(), default)
}

fn parse_value<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match raw {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("'{value}' is not a valid number"),
            })
        }
        _ => Ok(default),
    }
}
