//! Database-backed identity lookup and credential verification.
//!
//! This crate implements the read side of a federated user store: it executes
//! externally supplied SQL query templates against a relational database,
//! normalizes heterogeneous result sets into generic string records, paginates
//! result sets across differing SQL dialects, and verifies candidate passwords
//! against stored hashes using a configurable hash scheme.
//!
//! # Security Guarantees
//! - All database operations are read-only; password updates are rejected
//! - Connection URLs are redacted before they appear in errors or logs
//! - Stored hashes are fetched fresh on every verification and never cached
//! - Adaptive hash verification runs on the blocking thread pool
//!
//! # Architecture
//! The crate follows these patterns:
//! - A pooled connection source whose absence is a legitimate empty state
//! - An object-safe query executor per database engine, selected once from
//!   configuration through a dialect factory
//! - A fail-soft public API: execution failures are logged in full at the
//!   point of conversion and collapsed to empty results

pub mod config;
pub mod credential;
pub mod error;
pub mod logging;
pub mod models;
mod paging;
#[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
pub mod source;
pub mod store;

// Re-export commonly used types
pub use config::{ConnectionConfig, QueryConfig, StoreConfig};
pub use credential::{DigestAlgorithm, HashScheme};
pub use error::{Result, UserStoreError};
pub use models::{Dialect, GenericRow, Page};
pub use store::{QueryExecutor, UserStore};
