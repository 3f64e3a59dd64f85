//! Target-dialect descriptions: bind markers, placeholder prefix, paging.

use crate::page::{self, PagingStrategy};

/// How a target database receives parameters and pages results.
///
/// Implementations are stateless unit structs; `resolve` looks one up by
/// its registry key.
pub trait Dialect: Send + Sync {
    /// Registry key, lowercase.
    fn name(&self) -> &'static str;

    /// Marker emitted for the `ordinal`-th bound parameter (1-based).
    fn bind_marker(&self, ordinal: usize) -> String {
        let _ = ordinal;
        "?".to_string()
    }

    /// Prefix character introducing named placeholders in template text.
    fn placeholder_prefix(&self) -> char {
        ':'
    }

    /// Pagination strategy for this dialect.
    fn paging(&self) -> &'static dyn PagingStrategy {
        &page::LIMIT_OFFSET
    }
}

pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }
}

pub struct Mysql;

impl Dialect for Mysql {
    fn name(&self) -> &'static str {
        "mysql"
    }
}

pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn bind_marker(&self, ordinal: usize) -> String {
        format!("${ordinal}")
    }
}

pub struct Oracle;

impl Dialect for Oracle {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn paging(&self) -> &'static dyn PagingStrategy {
        &page::ROWNUM_WINDOW
    }
}

pub struct SqlServer;

impl Dialect for SqlServer {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn paging(&self) -> &'static dyn PagingStrategy {
        &page::FETCH_NEXT
    }
}

static DIALECTS: [&dyn Dialect; 5] = [&Sqlite, &Mysql, &Postgres, &Oracle, &SqlServer];

/// Looks up a dialect by name, case-insensitive.
#[must_use]
pub fn resolve(name: &str) -> Option<&'static dyn Dialect> {
    DIALECTS
        .iter()
        .find(|dialect| dialect.name().eq_ignore_ascii_case(name))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_dialects() {
        assert!(resolve("Postgres").is_some());
        assert!(resolve("ORACLE").is_some());
        assert!(resolve("access").is_none());
    }

    #[test]
    fn test_bind_markers() {
        assert_eq!(Sqlite.bind_marker(1), "?");
        assert_eq!(Sqlite.bind_marker(4), "?");
        assert_eq!(Postgres.bind_marker(1), "$1");
        assert_eq!(Postgres.bind_marker(12), "$12");
    }

    #[test]
    fn test_paging_assignment() {
        assert_eq!(Sqlite.paging().name(), "limit-offset");
        assert_eq!(Oracle.paging().name(), "rownum-window");
        assert_eq!(SqlServer.paging().name(), "fetch-next");
    }
}
