//! The user store: query execution and the identity lookup API.
//!
//! A [`UserStore`] pairs an engine-specific [`QueryExecutor`] with the
//! deployment's [`StoreConfig`]. The executor owns one connection, one
//! prepared statement, and one result set per call; the store owns the
//! fail-soft boundary: any `Unavailable`, `Execution`, or `Contract` error
//! coming out of the executor is logged in full right here and collapsed to
//! the operation's empty shape. Callers cannot distinguish "not found" from
//! "failed" through return values, only through the logs. That trade is
//! deliberate and documented on each operation.

use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::error::{Result, UserStoreError};
use crate::models::{Dialect, GenericRow, Page};

#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgresql")]
pub use postgres::PostgresExecutor;

#[cfg(feature = "mysql")]
pub use mysql::MySqlExecutor;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteExecutor;

/// Search terms shorter than this are rejected without querying.
const MIN_SEARCH_TERM_CHARS: usize = 2;

/// Executes query templates against one database engine.
///
/// One implementation exists per bundled engine. Each call acquires a
/// connection from the executor's connection source, rewrites the template
/// for pagination *before* binding, binds the string parameters
/// positionally, executes, transforms the result set, and releases the
/// connection on every exit path. No statement caching, no batching.
///
/// # Object Safety
/// The trait is object-safe; the store holds a `Box<dyn QueryExecutor>`
/// selected once from configuration.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Fetches every row of the (optionally paginated) template as generic
    /// records. Column labels are discovered once per result set.
    async fn fetch_rows(
        &self,
        template: &str,
        page: Option<Page>,
        params: &[&str],
    ) -> Result<Vec<GenericRow>>;

    /// Reads column 1 of the first row as an integer.
    ///
    /// # Errors
    /// Zero rows, or a first column with no integer reading, is a
    /// [`UserStoreError::Contract`] violation: the configured template does
    /// not match the operation's contract.
    async fn fetch_int(&self, template: &str, params: &[&str]) -> Result<i64>;

    /// Reads column 1 of the first row as a boolean.
    ///
    /// # Errors
    /// Same contract as [`QueryExecutor::fetch_int`].
    async fn fetch_bool(&self, template: &str, params: &[&str]) -> Result<bool>;

    /// Reads column 1 of the first row as text.
    ///
    /// # Errors
    /// Same contract as [`QueryExecutor::fetch_int`].
    async fn fetch_string(&self, template: &str, params: &[&str]) -> Result<String>;

    /// Reads column 1 of the first row as text, treating zero rows (or a
    /// NULL value) as a legitimate absence rather than a contract
    /// violation. Used for the stored-hash lookup, where an unknown user
    /// means "no match".
    async fn fetch_optional_string(
        &self,
        template: &str,
        params: &[&str],
    ) -> Result<Option<String>>;

    /// Runs the dialect's liveness statement over a fresh connection.
    async fn ping(&self) -> Result<()>;
}

/// Database-backed identity store.
///
/// Construct one with [`UserStore::connect`], or with
/// [`UserStore::with_executor`] when the host owns the pool.
pub struct UserStore {
    executor: Box<dyn QueryExecutor>,
    config: StoreConfig,
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("dialect", &self.config.dialect)
            .finish_non_exhaustive()
    }
}

impl UserStore {
    /// Creates a store for the configured dialect, constructing a pool from
    /// `connection_string`.
    ///
    /// PostgreSQL and MySQL pools are lazy: an unreachable server shows up
    /// as an absent connection at query time, not as a construction error.
    ///
    /// # Errors
    /// Fails at configuration time if the configuration is invalid, the
    /// connection string does not fit the dialect, or the dialect has no
    /// bundled executor (feature not compiled in, or SQL Server / Oracle,
    /// which are pagination-only; supply your own executor via
    /// [`UserStore::with_executor`]).
    pub async fn connect(connection_string: &str, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let executor: Box<dyn QueryExecutor> = match config.dialect {
            #[cfg(feature = "postgresql")]
            Dialect::PostgreSQL => Box::new(postgres::PostgresExecutor::connect(
                connection_string,
                &config.connection,
            )?),
            #[cfg(not(feature = "postgresql"))]
            Dialect::PostgreSQL => {
                return Err(UserStoreError::unsupported(
                    "PostgreSQL executor",
                    "compile with the postgresql feature enabled",
                ));
            }
            #[cfg(feature = "mysql")]
            Dialect::MySQL => Box::new(mysql::MySqlExecutor::connect(
                connection_string,
                &config.connection,
            )?),
            #[cfg(not(feature = "mysql"))]
            Dialect::MySQL => {
                return Err(UserStoreError::unsupported(
                    "MySQL executor",
                    "compile with the mysql feature enabled",
                ));
            }
            #[cfg(feature = "sqlite")]
            Dialect::SQLite => Box::new(
                sqlite::SqliteExecutor::connect(connection_string, &config.connection).await?,
            ),
            #[cfg(not(feature = "sqlite"))]
            Dialect::SQLite => {
                return Err(UserStoreError::unsupported(
                    "SQLite executor",
                    "compile with the sqlite feature enabled",
                ));
            }
            Dialect::SqlServer | Dialect::Oracle => {
                return Err(UserStoreError::unsupported(
                    format!("{} executor", config.dialect),
                    "pagination is supported but no driver is bundled; \
                     supply an executor with UserStore::with_executor",
                ));
            }
        };
        Ok(Self { executor, config })
    }

    /// Creates a store over a caller-supplied executor.
    ///
    /// The executor's engine must match `config.dialect`; the store does not
    /// verify this.
    ///
    /// # Errors
    /// Fails if the configuration is invalid.
    pub fn with_executor(executor: Box<dyn QueryExecutor>, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { executor, config })
    }

    /// The configured dialect.
    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// Verifies connectivity by running the dialect's liveness statement.
    ///
    /// # Errors
    /// Returns the underlying error instead of fail-softing, so hosts can
    /// surface misconfiguration at startup.
    pub async fn test_connection(&self) -> Result<()> {
        self.executor.ping().await
    }

    /// Lists every user.
    ///
    /// Failures are logged and yield an empty list.
    pub async fn list_all_users(&self) -> Vec<GenericRow> {
        let template = &self.config.queries.list_all;
        swallow(
            "list_all_users",
            template,
            self.executor.fetch_rows(template, None, &[]).await,
        )
        .unwrap_or_default()
    }

    /// Lists the users in the half-open window `[offset, offset + limit)`
    /// of the list-all query's ordering.
    ///
    /// A malformed window (`limit == 0`) is logged and yields an empty
    /// list, as do failures.
    pub async fn list_users_paged(&self, offset: u64, limit: u64) -> Vec<GenericRow> {
        let page = match Page::new(offset, limit) {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(offset, limit, error = %e, "rejecting malformed page request");
                return Vec::new();
            }
        };
        let template = &self.config.queries.list_all;
        swallow(
            "list_users_paged",
            template,
            self.executor.fetch_rows(template, Some(page), &[]).await,
        )
        .unwrap_or_default()
    }

    /// Counts users. Failures are logged and yield 0.
    pub async fn count_users(&self) -> i64 {
        let template = &self.config.queries.count;
        swallow(
            "count_users",
            template,
            self.executor.fetch_int(template, &[]).await,
        )
        .unwrap_or(0)
    }

    /// Finds one user by identifier. Absent users and failures both yield
    /// `None`; only the logs tell them apart.
    pub async fn find_user_by_id(&self, id: &str) -> Option<GenericRow> {
        let template = &self.config.queries.find_by_id;
        swallow(
            "find_user_by_id",
            template,
            self.executor.fetch_rows(template, None, &[id]).await,
        )
        .and_then(|rows| rows.into_iter().next())
    }

    /// Finds one user by username. Absent users and failures both yield
    /// `None`.
    pub async fn find_user_by_username(&self, username: &str) -> Option<GenericRow> {
        let template = &self.config.queries.find_by_username;
        swallow(
            "find_user_by_username",
            template,
            self.executor.fetch_rows(template, None, &[username]).await,
        )
        .and_then(|rows| rows.into_iter().next())
    }

    /// Searches users by a free-text term.
    ///
    /// Terms shorter than two characters are rejected before any connection
    /// is acquired and yield an empty list.
    pub async fn search_users(&self, term: &str) -> Vec<GenericRow> {
        if term.chars().count() < MIN_SEARCH_TERM_CHARS {
            tracing::info!("ignoring search term with less than two characters");
            return Vec::new();
        }
        let template = &self.config.queries.search;
        swallow(
            "search_users",
            template,
            self.executor.fetch_rows(template, None, &[term]).await,
        )
        .unwrap_or_default()
    }

    /// Verifies `password` against the stored hash for `username`.
    ///
    /// The hash is fetched fresh on every call and never cached. An absent
    /// hash (unknown user, NULL column, or a lookup failure) rejects the
    /// credentials. Comparison runs on the blocking thread pool.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> bool {
        let template = &self.config.queries.find_password_hash;
        let stored = swallow(
            "verify_credentials",
            template,
            self.executor
                .fetch_optional_string(template, &[username])
                .await,
        )
        .flatten();
        let Some(stored) = stored else {
            tracing::debug!("no stored password hash for user; rejecting credentials");
            return false;
        };

        let scheme = self.config.scheme;
        let candidate = password.to_string();
        match tokio::task::spawn_blocking(move || scheme.verify(&candidate, &stored)).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!(error = %e, "credential verification task failed");
                false
            }
        }
    }

    /// Password updates are not supported by this store.
    ///
    /// # Errors
    /// Always fails with [`UserStoreError::NotImplemented`], never a
    /// silent no-op.
    pub async fn update_credentials(&self, _username: &str, _password: &str) -> Result<()> {
        Err(UserStoreError::not_implemented("password update"))
    }
}

/// The fail-soft boundary: logs the typed failure with full detail and
/// converts it to an absent result.
fn swallow<T>(operation: &'static str, template: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(UserStoreError::Unavailable) => {
            tracing::warn!(operation, "no database connection; returning empty result");
            None
        }
        Err(e @ UserStoreError::Contract { .. }) => {
            tracing::error!(operation, template, error = %e, "query template violates its contract");
            None
        }
        Err(e) => {
            tracing::error!(operation, template, error = %e, source = ?std::error::Error::source(&e), "query failed; returning empty result");
            None
        }
    }
}
