//! MySQL query executor.
//!
//! Mirrors the PostgreSQL executor with MySQL's placeholder and pagination
//! syntax and its looser result typing (booleans arrive as TINYINT, counts
//! as signed or unsigned 64-bit integers).

use async_trait::async_trait;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{Column, MySql, MySqlPool, Row};
use url::Url;

use super::QueryExecutor;
use crate::config::ConnectionConfig;
use crate::error::{Result, UserStoreError, redact_database_url};
use crate::models::{Dialect, GenericRow, Page};
use crate::source::ConnectionSource;

/// Executes query templates against a MySQL pool.
pub struct MySqlExecutor {
    source: ConnectionSource<MySql>,
}

impl MySqlExecutor {
    /// Creates an executor with a lazily-constructed connection pool.
    ///
    /// # Errors
    /// Returns error if the connection string is not a valid MySQL URL or
    /// the pool options are rejected.
    pub fn connect(connection_string: &str, config: &ConnectionConfig) -> Result<Self> {
        validate_connection_string(connection_string)?;

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections.min(100))
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .test_before_acquire(true)
            .connect_lazy(connection_string)
            .map_err(|e| {
                UserStoreError::connection_failed(
                    format!(
                        "failed to create MySQL pool for {}",
                        redact_database_url(connection_string)
                    ),
                    e,
                )
            })?;

        Ok(Self::with_pool(pool))
    }

    /// Creates an executor over an existing pool owned by the host.
    pub fn with_pool(pool: MySqlPool) -> Self {
        Self {
            source: ConnectionSource::new(pool),
        }
    }

    async fn run(
        &self,
        template: &str,
        page: Option<Page>,
        params: &[&str],
    ) -> Result<Vec<MySqlRow>> {
        let Some(mut conn) = self.source.acquire().await else {
            return Err(UserStoreError::Unavailable);
        };

        let sql = match page {
            Some(page) => Dialect::MySQL.paginate(template, &page),
            None => template.to_string(),
        };

        let mut query = sqlx::query(&sql);
        for param in params {
            query = query.bind(*param);
        }

        query
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| UserStoreError::execution_failed("MySQL query failed", e))
    }
}

#[async_trait]
impl QueryExecutor for MySqlExecutor {
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
        if let Ok(value) = row.try_get::<i64, _>(0) {
            return Ok(value);
        }
        if let Ok(value) = row.try_get::<u64, _>(0) {
            return Ok(i64::try_from(value).unwrap_or(i64::MAX));
        }
        if let Ok(value) = row.try_get::<i32, _>(0) {
            return Ok(i64::from(value));
        }
        Err(UserStoreError::contract(
            "first column of scalar query is not an integer",
        ))
    }

    async fn fetch_bool(&self, template: &str, params: &[&str]) -> Result<bool> {
        let rows = self.run(template, None, params).await?;
        let row = first_row(&rows)?;
        if let Ok(value) = row.try_get::<bool, _>(0) {
            return Ok(value);
        }
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
        self.run(Dialect::MySQL.health_query(), None, &[])
            .await
            .map(|_| ())
    }
}

fn first_row(rows: &[MySqlRow]) -> Result<&MySqlRow> {
    rows.first()
        .ok_or_else(|| UserStoreError::contract("scalar query returned no rows"))
}

/// Builds generic records from the result set. Column labels are read once
/// from the first row's metadata, then reused for every row.
fn rows_to_records(rows: &[MySqlRow]) -> Vec<GenericRow> {
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

/// Renders a column value as a string, trying types in order of likelihood.
fn decode_column(row: &MySqlRow, index: usize) -> Option<String> {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value;
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<u64>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index) {
        return value.map(|v| v.to_rfc3339());
    }
    if let Ok(value) = row.try_get::<Option<chrono::NaiveDateTime>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<chrono::NaiveDate>, _>(index) {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return value.map(hex::encode);
    }
    tracing::trace!(column = index, "column value has no string rendering; treating as absent");
    None
}

/// Validates connection string format before a pool is constructed.
fn validate_connection_string(connection_string: &str) -> Result<()> {
    let url = Url::parse(connection_string).map_err(|e| {
        UserStoreError::configuration(format!("invalid MySQL connection string format: {e}"))
    })?;

    if url.scheme() != "mysql" {
        return Err(UserStoreError::configuration(
            "connection string must use mysql:// scheme",
        ));
    }

    if url.host_str().is_none() {
        return Err(UserStoreError::configuration(
            "connection string must specify a host",
        ));
    }

    Ok(())
}
