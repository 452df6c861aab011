//! Dialect-specific pagination rewriting.
//!
//! The rewriter takes a caller-supplied query template and a page window and
//! produces the engine-specific paginated form. It is a pure string
//! transformation applied *before* parameter binding: the window bounds are
//! formatted as integer literals so the relative order and count of the
//! template's positional placeholders never change.

use crate::models::{Dialect, Page};

impl Dialect {
    /// Rewrites `sql` so the engine returns only the rows in `page`.
    ///
    /// The base query's filtering and ordering are preserved. For SQL Server
    /// the base query must carry its own ORDER BY, which `OFFSET ... FETCH`
    /// requires; supplying one is the caller's responsibility.
    pub fn paginate(self, sql: &str, page: &Page) -> String {
        match self {
            Self::PostgreSQL | Self::SQLite => {
                format!("{sql} LIMIT {} OFFSET {}", page.limit, page.offset)
            }
            Self::MySQL => format!("{sql} LIMIT {}, {}", page.offset, page.limit),
            Self::SqlServer => format!(
                "{sql} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                page.offset, page.limit
            ),
            // Classic ROWNUM double-wrap: the inner bound caps the scan at
            // offset + limit, the outer predicate drops the leading rows.
            Self::Oracle => format!(
                "SELECT * FROM (SELECT inner_.*, ROWNUM rnum_ FROM ({sql}) inner_ WHERE ROWNUM <= {}) WHERE rnum_ > {}",
                page.end(),
                page.offset
            ),
        }
    }
}
