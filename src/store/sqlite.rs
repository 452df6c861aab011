//! SQLite query executor.
//!
//! SQLite is file-based, so connection handling differs from the pooled
//! network engines: pools are opened eagerly (an unopenable file is a
//! configuration error, not a transient condition), stay small, and are
//! capped at a single connection for in-memory databases, where every
//! connection would otherwise see its own empty database.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool};
use std::str::FromStr;

use super::QueryExecutor;
use crate::config::ConnectionConfig;
use crate::error::{Result, UserStoreError};
use crate::models::{Dialect, GenericRow, Page};
use crate::source::ConnectionSource;

/// Executes query templates against a SQLite pool.
pub struct SqliteExecutor {
    source: ConnectionSource<Sqlite>,
}

impl SqliteExecutor {
    /// Opens the database and creates an executor.
    ///
    /// Accepts `sqlite://` URLs, bare file paths, and `:memory:`. The
    /// database is opened read-only: this store never writes.
    ///
    /// # Errors
    /// Returns error if the connection string is invalid or the database
    /// cannot be opened.
    pub async fn connect(connection_string: &str, config: &ConnectionConfig) -> Result<Self> {
        let normalized = normalize_connection_string(connection_string);

        let options = SqliteConnectOptions::from_str(&normalized)
            .map_err(|e| {
                UserStoreError::configuration(format!("invalid SQLite connection string: {e}"))
            })?
            .read_only(true);

        let max_connections = if is_in_memory(&normalized) {
            1
        } else {
            config.max_connections.max(1)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(options)
            .await
            .map_err(|e| {
                UserStoreError::connection_failed("failed to open SQLite database", e)
            })?;

        Ok(Self::with_pool(pool))
    }

    /// Creates an executor over an existing pool owned by the host.
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self {
            source: ConnectionSource::new(pool),
        }
    }

    async fn run(
        &self,
        template: &str,
        page: Option<Page>,
        params: &[&str],
    ) -> Result<Vec<SqliteRow>> {
        let Some(mut conn) = self.source.acquire().await else {
            return Err(UserStoreError::Unavailable);
        };

        let sql = match page {
            Some(page) => Dialect::SQLite.paginate(template, &page),
            None => template.to_string(),
        };

        let mut query = sqlx::query(&sql);
        for param in params {
            query = query.bind(*param);
        }

        query
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| UserStoreError::execution_failed("SQLite query failed", e))
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn fetch_rows(
        &self,
        template: &str,
        page: Option<Page>,
        params: &[&str],
    ) -> Result<Vec<GenericRow>> {
        let rows = self.run(template, page, params).await?;
        Ok(rows_to_records(&rows))
    }

    async fn fetch_int(&self, template: &str, params: &[&str]) -> Result<i64> {
        let rows = self.run(template, None, params).await?;
        let row = first_row(&rows)?;
        row.try_get::<i64, _>(0).map_err(|_| {
            UserStoreError::contract("first column of scalar query is not an integer")
        })
    }

    async fn fetch_bool(&self, template: &str, params: &[&str]) -> Result<bool> {
        let rows = self.run(template, None, params).await?;
        let row = first_row(&rows)?;
        if let Ok(value) = row.try_get::<bool, _>(0) {
            return Ok(value);
        }
        // SQLite has no boolean storage class; integers are the convention.
        if let Ok(value) = row.try_get::<i64, _>(0) {
            return Ok(value != 0);
        }
        Err(UserStoreError::contract(
            "first column of scalar query is not a boolean",
        ))
    }

    async fn fetch_string(&self, template: &str, params: &[&str]) -> Result<String> {
        let rows = self.run(template, None, params).await?;
        let row = first_row(&rows)?;
        decode_column(row, 0).ok_or_else(|| {
            UserStoreError::contract("first column of scalar query has no text rendering")
        })
    }

    async fn fetch_optional_string(
        &self,
        template: &str,
        params: &[&str],
    ) -> Result<Option<String>> {
        let rows = self.run(template, None, params).await?;
        Ok(rows.first().and_then(|row| decode_column(row, 0)))
    }

    async fn ping(&self) -> Result<()> {
        self.run(Dialect::SQLite.health_query(), None, &[])
            .await
            .map(|_| ())
    }
}

fn first_row(rows: &[SqliteRow]) -> Result<&SqliteRow> {
    rows.first()
        .ok_or_else(|| UserStoreError::contract("scalar query returned no rows"))
}

/// Builds generic records from the result set. Column labels are read once
/// from the first row's metadata, then reused for every row.
fn rows_to_records(rows: &[SqliteRow]) -> Vec<GenericRow> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let labels: Vec<String> = first
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();

    rows.iter()
        .map(|row| {
            let mut record = GenericRow::with_capacity(labels.len());
            for (index, label) in labels.iter().enumerate() {
                if let Some(value) = decode_column(row, index) {
                    record.insert(label.clone(), value);
                }
            }
            record
        })
        .collect()
}

/// Renders a column value as a string following SQLite's storage classes.
fn decode_column(row: &SqliteRow, index: usize) -> Option<String> {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value;
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<chrono::NaiveDateTime>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return value.map(hex::encode);
    }
    tracing::trace!(column = index, "column value has no string rendering; treating as absent");
    None
}

fn is_in_memory(connection_string: &str) -> bool {
    connection_string.contains(":memory:") || connection_string.contains("mode=memory")
}

/// Normalizes bare file paths and `:memory:` to the `sqlite:` URL form.
fn normalize_connection_string(connection_string: &str) -> String {
    if connection_string == ":memory:" {
        return "sqlite::memory:".to_string();
    }
    if connection_string.starts_with("sqlite:") {
        return connection_string.to_string();
    }
    format!("sqlite://{connection_string}")
}
