//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub federation: FederationConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Server identity configuration
///
/// There is no HTTP listener in this crate; `domain` is the domain this
/// instance considers its own when classifying identifiers.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Public domain (e.g., "social.example.com")
    pub domain: String,
    /// Protocol used when building discovery URLs ("http" or "https").
    /// Plain http is only meaningful for local development instances.
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://social.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Outbound federation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// User-Agent sent on WebFinger/actor/collection requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Upper bound for each network call, in seconds
    pub request_timeout_seconds: u64,
    /// Maximum in-flight actor resolutions per request
    pub max_concurrent_fetches: usize,
    /// Maximum pages followed when walking a remote followers collection
    pub max_collection_pages: usize,
}

impl FederationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn default_user_agent() -> String {
    format!("Muster/{}", env!("CARGO_PKG_VERSION"))
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Actor cache TTL in seconds (default: 3600)
    pub actor_ttl_seconds: u64,
}

impl CacheConfig {
    pub fn actor_ttl(&self) -> Duration {
        Duration::from_secs(self.actor_ttl_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (MUSTER_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.protocol", "https")?
            .set_default("database.path", "data/muster.db")?
            .set_default("federation.request_timeout_seconds", 10)?
            .set_default("federation.max_concurrent_fetches", 10)?
            .set_default("federation.max_collection_pages", 10)?
            .set_default("cache.actor_ttl_seconds", 3600)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (MUSTER_*)
            .add_source(
                Environment::with_prefix("MUSTER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.server.domain.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "server.domain must not be empty".to_string(),
            ));
        }

        match self.server.protocol.as_str() {
            "http" | "https" => {}
            other => {
                return Err(crate::error::AppError::Config(format!(
                    "server.protocol must be http or https, got {:?}",
                    other
                )));
            }
        }

        if self.federation.request_timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "federation.request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.federation.max_concurrent_fetches == 0 {
            return Err(crate::error::AppError::Config(
                "federation.max_concurrent_fetches must be greater than 0".to_string(),
            ));
        }

        if self.federation.max_collection_pages == 0 {
            return Err(crate::error::AppError::Config(
                "federation.max_collection_pages must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
