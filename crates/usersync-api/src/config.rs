//! Configuration management for the user sync service.

use std::{fmt, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use usersync_core::{connection::mask_database_url, PgConnector};

use crate::{crypto::DEFAULT_TOLERANCE_SECONDS, provider::ClientConfig};

const CONFIG_FILE: &str = "config.toml";

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// `WEBHOOK_SECRET` and `CLERK_API_KEY` have no usable default; loading fails
/// without them so the service never starts unable to verify or write back.
///
/// # Example
///
/// ```no_run
/// use usersync_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
/// println!("Server will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    // Webhook
    /// Signing secret shared with the webhook sender (`whsec_...`).
    ///
    /// Environment variable: `WEBHOOK_SECRET`
    #[serde(default, alias = "WEBHOOK_SECRET")]
    pub webhook_secret: String,
    /// Accepted clock skew for signed timestamps, in seconds.
    ///
    /// Environment variable: `WEBHOOK_TOLERANCE_SECONDS`
    #[serde(default = "default_tolerance", alias = "WEBHOOK_TOLERANCE_SECONDS")]
    pub webhook_tolerance_seconds: u64,

    // Identity provider
    /// Secret key for the provider's management API.
    ///
    /// Environment variable: `CLERK_API_KEY`
    #[serde(default, alias = "CLERK_API_KEY")]
    pub clerk_api_key: String,
    /// Base URL of the provider's management API.
    ///
    /// Environment variable: `CLERK_API_URL`
    #[serde(default = "default_clerk_api_url", alias = "CLERK_API_URL")]
    pub clerk_api_url: String,
    /// Optional timeout for calls to the provider, in seconds. Unset means
    /// no deadline.
    ///
    /// Environment variable: `PROVIDER_TIMEOUT`
    #[serde(default, alias = "PROVIDER_TIMEOUT")]
    pub provider_timeout: Option<u64>,

    // Database
    /// PostgreSQL connection URL. Only needed once a webhook touches the
    /// database.
    ///
    /// Environment variable: `DATABASE_URL`
    #[serde(default, alias = "DATABASE_URL")]
    pub database_url: Option<String>,
    /// Maximum number of database connections in the pool.
    ///
    /// Environment variable: `DATABASE_MAX_CONNECTIONS`
    #[serde(default = "default_max_connections", alias = "DATABASE_MAX_CONNECTIONS")]
    pub database_max_connections: u32,
    /// Database connection acquire timeout in seconds.
    ///
    /// Environment variable: `DATABASE_CONNECTION_TIMEOUT`
    #[serde(default = "default_acquire_timeout", alias = "DATABASE_CONNECTION_TIMEOUT")]
    pub database_connection_timeout: u64,

    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,

    // Logging
    /// Log filter directive.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides, then validate it.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    /// The layered provider stack used by [`Config::load`].
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""))
    }

    /// Extracts and validates configuration from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Connector settings for the database connection cache.
    pub fn to_connector(&self) -> PgConnector {
        PgConnector {
            max_connections: self.database_max_connections,
            acquire_timeout: Duration::from_secs(self.database_connection_timeout),
        }
    }

    /// HTTP client settings for the identity provider.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.clerk_api_url.trim_end_matches('/').to_string(),
            api_key: self.clerk_api_key.clone(),
            timeout: self.provider_timeout.map(Duration::from_secs),
            user_agent: concat!("usersync/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Get database URL with password masked for logging.
    pub fn database_url_masked(&self) -> String {
        self.database_url.as_deref().map_or_else(|| "<unset>".to_string(), mask_database_url)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.webhook_secret.trim().is_empty() || self.clerk_api_key.trim().is_empty() {
            anyhow::bail!(
                "WEBHOOK_SECRET and CLERK_API_KEY must be set in the environment or {CONFIG_FILE}"
            );
        }

        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.database_max_connections == 0 {
            anyhow::bail!("database max_connections must be greater than 0");
        }

        if self.provider_timeout == Some(0) {
            anyhow::bail!("provider_timeout must be greater than 0 when set");
        }

        if !self.clerk_api_url.starts_with("http://") && !self.clerk_api_url.starts_with("https://")
        {
            anyhow::bail!("clerk_api_url must be an http(s) URL");
        }

        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("webhook_secret", &"***")
            .field("webhook_tolerance_seconds", &self.webhook_tolerance_seconds)
            .field("clerk_api_key", &"***")
            .field("clerk_api_url", &self.clerk_api_url)
            .field("provider_timeout", &self.provider_timeout)
            .field("database_url", &self.database_url_masked())
            .field("database_max_connections", &self.database_max_connections)
            .field("database_connection_timeout", &self.database_connection_timeout)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            webhook_tolerance_seconds: default_tolerance(),
            clerk_api_key: String::new(),
            clerk_api_url: default_clerk_api_url(),
            provider_timeout: None,
            database_url: None,
            database_max_connections: default_max_connections(),
            database_connection_timeout: default_acquire_timeout(),
            host: default_host(),
            port: default_port(),
            rust_log: default_log_level(),
        }
    }
}

fn default_tolerance() -> u64 {
    DEFAULT_TOLERANCE_SECONDS
}

fn default_clerk_api_url() -> String {
    "https://api.clerk.dev/v1".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    10
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info,usersync=debug,tower_http=debug".to_string()
}
