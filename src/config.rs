//! Store configuration: query templates, hash scheme, dialect, pool bounds.
//!
//! All of this is supplied per deployment by the host. Validation happens
//! once at configuration load time so that template and dialect mistakes
//! fail fast instead of surfacing as query-time driver errors.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::credential::HashScheme;
use crate::error::UserStoreError;
use crate::models::Dialect;

/// The SQL query templates the store executes, one per logical operation.
///
/// Templates are opaque strings in the deployment's own dialect, using
/// positional placeholders. The placeholder count of each template must
/// match the parameters its operation binds (`find_by_id`,
/// `find_by_username`, `search`, and `find_password_hash` each take one);
/// a mismatch surfaces as a logged driver error at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Lists every user; also the base query for pagination
    pub list_all: String,
    /// Returns the total user count as a single scalar row
    pub count: String,
    /// Finds one user by its identifier
    pub find_by_id: String,
    /// Finds one user by username
    pub find_by_username: String,
    /// Searches users by a free-text term
    pub search: String,
    /// Returns the stored password hash for a username as a single column
    pub find_password_hash: String,
}

impl QueryConfig {
    /// Validates that every template is present.
    ///
    /// # Errors
    /// Returns a configuration error naming the first empty template.
    pub fn validate(&self) -> crate::Result<()> {
        let templates = [
            ("list_all", &self.list_all),
            ("count", &self.count),
            ("find_by_id", &self.find_by_id),
            ("find_by_username", &self.find_by_username),
            ("search", &self.search),
            ("find_password_hash", &self.find_password_hash),
        ];
        for (name, template) in templates {
            if template.trim().is_empty() {
                return Err(UserStoreError::configuration(format!(
                    "query template '{name}' must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Bounds used when the store constructs its own connection pool.
///
/// Pooling policy beyond these bounds (and the pool itself, when the host
/// hands one in) belongs to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// How long to wait for a connection before the source reports absence
    pub acquire_timeout: Duration,
    /// Idle connection timeout
    pub idle_timeout: Duration,
    /// Maximum connection lifetime
    pub max_lifetime: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(3600),
        }
    }
}

impl ConnectionConfig {
    /// Validates pool bounds.
    ///
    /// # Errors
    /// Returns a configuration error if bounds are zero or unsafe.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_connections == 0 {
            return Err(UserStoreError::configuration(
                "max_connections must be greater than 0",
            ));
        }
        if self.max_connections > 100 {
            return Err(UserStoreError::configuration(
                "max_connections should not exceed 100 for safety",
            ));
        }
        if self.acquire_timeout.is_zero() {
            return Err(UserStoreError::configuration(
                "acquire_timeout must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Builder method to set the pool size.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Builder method to set the acquire timeout.
    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }
}

/// Complete store configuration for one deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Target engine dialect
    pub dialect: Dialect,
    /// How stored password hashes are verified
    pub scheme: HashScheme,
    /// The SQL templates, in the deployment's dialect
    pub queries: QueryConfig,
    /// Pool bounds for store-constructed pools
    #[serde(default)]
    pub connection: ConnectionConfig,
}

impl StoreConfig {
    /// Creates a configuration with default pool bounds.
    pub fn new(dialect: Dialect, scheme: HashScheme, queries: QueryConfig) -> Self {
        Self {
            dialect,
            scheme,
            queries,
            connection: ConnectionConfig::default(),
        }
    }

    /// Validates the whole configuration.
    ///
    /// # Errors
    /// Returns the first configuration error found.
    pub fn validate(&self) -> crate::Result<()> {
        self.queries.validate()?;
        self.connection.validate()
    }
}
