//! Lazily-initialized, shared database connection.
//!
//! [`ConnectionCache`] is owned by the application and injected into every
//! collaborator that needs the database. The first caller establishes the
//! connection; every later caller gets the cached handle without I/O.
//!
//! Guarantees:
//! - at most one connect attempt is in flight at a time, even under a
//!   multi-threaded runtime (concurrent callers wait on the same attempt)
//! - a failed attempt is never cached; the next call tries again
//! - a missing database URL fails with [`CoreError::Configuration`] before
//!   any I/O is attempted

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::error::{CoreError, Result};

/// Establishes a connection handle from a connection string.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Handle returned to callers. Cloning must be cheap and share the
    /// underlying connection.
    type Connection: Clone + Send + Sync + 'static;

    /// Opens a new connection.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Connection` if the target is unreachable or
    /// rejects the connection.
    async fn connect(&self, url: &str) -> Result<Self::Connection>;
}

/// Process-lifetime cache holding at most one live connection.
pub struct ConnectionCache<C: Connector> {
    connector: C,
    url: Option<String>,
    connection: OnceCell<C::Connection>,
}

impl<C: Connector> ConnectionCache<C> {
    /// Creates an empty cache. No connection is attempted until [`get`].
    ///
    /// [`get`]: ConnectionCache::get
    pub fn new(connector: C, url: Option<String>) -> Self {
        Self { connector, url, connection: OnceCell::new() }
    }

    /// Returns the live connection, establishing it on first use.
    ///
    /// # Errors
    ///
    /// - `CoreError::Configuration` if no database URL was configured
    /// - `CoreError::Connection` if the connect attempt failed
    pub async fn get(&self) -> Result<C::Connection> {
        if let Some(connection) = self.connection.get() {
            debug!("Already connected to the database");
            return Ok(connection.clone());
        }

        let url = self
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| CoreError::Configuration("database URL is not set".to_string()))?;

        let connection = self
            .connection
            .get_or_try_init(|| async {
                match self.connector.connect(url).await {
                    Ok(connection) => {
                        info!(database_url = %mask_database_url(url), "Connected to the database");
                        Ok(connection)
                    },
                    Err(e) => {
                        error!(error = %e, "Failed to connect to the database");
                        Err(e)
                    },
                }
            })
            .await?;

        Ok(connection.clone())
    }

    /// Whether a live connection is currently cached.
    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    /// The cached connection, without connecting.
    pub fn current(&self) -> Option<C::Connection> {
        self.connection.get().cloned()
    }
}

/// Production connector building a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgConnector {
    /// Maximum pool size
    pub max_connections: u32,
    /// How long to wait for a pooled connection
    pub acquire_timeout: Duration,
}

impl Default for PgConnector {
    fn default() -> Self {
        Self { max_connections: 10, acquire_timeout: Duration::from_secs(10) }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Connection = PgPool;

    async fn connect(&self, url: &str) -> Result<PgPool> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| CoreError::Connection(e.to_string()))
    }
}

/// Returns the database URL with the password replaced for logging.
pub fn mask_database_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(scheme_end) = url.find("://") {
            let Some(credentials) = url.get(scheme_end + 3..at_pos) else {
                return "postgresql://***".to_string();
            };
            if let Some((user, _password)) = credentials.split_once(':') {
                return format!("{}://{}:***@{}", &url[..scheme_end], user, &url[at_pos + 1..]);
            }
            return url.to_string();
        }
    }
    if url.contains("://") {
        return url.to_string();
    }
    "postgresql://***".to_string()
}
