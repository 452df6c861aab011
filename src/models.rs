//! Core data model: supported dialects, page windows, and generic records.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::UserStoreError;

/// One result record: a mapping from column label (as reported by the
/// driver) to the string rendering of its value.
///
/// SQL NULLs and values with no string rendering are absent from the map,
/// not present as empty strings.
pub type GenericRow = HashMap<String, String>;

/// Relational engines this store understands.
///
/// The set is closed: unknown dialect names fail at configuration time,
/// never at query time. Every dialect participates in pagination rewriting;
/// only a subset ships a bundled query executor (see `store::UserStore`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    PostgreSQL,
    MySQL,
    SQLite,
    SqlServer,
    Oracle,
}

impl Dialect {
    /// The engine-specific liveness statement used by connection tests.
    pub fn health_query(self) -> &'static str {
        match self {
            Self::Oracle => "SELECT 1 FROM DUAL",
            _ => "SELECT 1",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PostgreSQL => write!(f, "PostgreSQL"),
            Self::MySQL => write!(f, "MySQL"),
            Self::SQLite => write!(f, "SQLite"),
            Self::SqlServer => write!(f, "SQL Server"),
            Self::Oracle => write!(f, "Oracle"),
        }
    }
}

impl FromStr for Dialect {
    type Err = UserStoreError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::PostgreSQL),
            // MySQL syntax covers MariaDB deployments
            "mysql" | "mariadb" => Ok(Self::MySQL),
            "sqlite" | "sqlite3" => Ok(Self::SQLite),
            "mssql" | "sqlserver" | "sql server" => Ok(Self::SqlServer),
            "oracle" => Ok(Self::Oracle),
            _ => Err(UserStoreError::configuration(format!(
                "unknown database dialect '{name}'"
            ))),
        }
    }
}

/// A half-open window `[offset, offset + limit)` over an ordered result set.
///
/// The ordering of the base query is the caller's responsibility; the store
/// only rewrites the query so the engine returns the requested window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Number of rows to skip
    pub offset: u64,
    /// Maximum number of rows to return (always greater than zero)
    pub limit: u64,
}

impl Page {
    /// Creates a page window, rejecting a zero limit.
    ///
    /// # Errors
    /// Returns a configuration error if `limit` is zero.
    pub fn new(offset: u64, limit: u64) -> crate::Result<Self> {
        if limit == 0 {
            return Err(UserStoreError::configuration(
                "page limit must be greater than zero",
            ));
        }
        Ok(Self { offset, limit })
    }

    /// The exclusive upper bound of the window.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.limit)
    }
}
