//! Pagination strategies keyed by dialect.
//!
//! A strategy rewrites an already rendered statement to fetch one page.
//! Strategies that need runtime bounds emit named placeholders with stable
//! key names and return the matching arguments, so the wrapped text can go
//! through a second render pass.

use serde::{Deserialize, Serialize};

use crate::args::ArgBag;
use crate::value::Value;

/// A page request. Page numbers and sizes below 1 are clamped to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_no: u64,
    page_size: u64,
}

impl PageRequest {
    #[must_use]
    pub fn new(page_no: u64, page_size: u64) -> Self {
        Self {
            page_no: page_no.max(1),
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub const fn page_no(&self) -> u64 {
        self.page_no
    }

    #[must_use]
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Zero-based index of the first row on this page. Saturates rather
    /// than overflowing on absurd page numbers.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page_no - 1).saturating_mul(self.page_size)
    }
}

/// A row bound as a bindable value, clamped into `i64` range.
fn row_bound(n: u64) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

/// Rewritten SQL plus the named arguments it expects.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedSql {
    pub sql: String,
    pub args: ArgBag,
}

/// How one family of databases pages a query.
pub trait PagingStrategy: Send + Sync {
    /// Strategy name, for logs.
    fn name(&self) -> &'static str;

    /// Rewrites `sql` to fetch exactly the requested page.
    fn wrap(&self, sql: &str, page: &PageRequest) -> PagedSql;

    /// Wraps `sql` in a row-counting query.
    fn count_sql(&self, sql: &str) -> String {
        format!("select count(*) from ({sql}) page_count_")
    }

    /// Pages needed for `records` rows: ceiling division, zero for zero.
    fn page_count(&self, records: u64, page_size: u64) -> u64 {
        if records == 0 || page_size == 0 {
            0
        } else {
            records.div_ceil(page_size)
        }
    }
}

/// `limit N offset M` with literal bounds.
#[derive(Debug, Clone, Copy)]
pub struct LimitOffset;

impl PagingStrategy for LimitOffset {
    fn name(&self) -> &'static str {
        "limit-offset"
    }

    fn wrap(&self, sql: &str, page: &PageRequest) -> PagedSql {
        PagedSql {
            sql: format!("{sql} limit {} offset {}", page.page_size(), page.offset()),
            args: ArgBag::new(),
        }
    }
}

/// Oracle-style ROWNUM window. Emits `:row_start` (exclusive floor) and
/// `:row_end` (inclusive ceiling).
#[derive(Debug, Clone, Copy)]
pub struct RownumWindow;

impl PagingStrategy for RownumWindow {
    fn name(&self) -> &'static str {
        "rownum-window"
    }

    fn wrap(&self, sql: &str, page: &PageRequest) -> PagedSql {
        let mut args = ArgBag::new();
        args.set("row_end", row_bound(page.offset().saturating_add(page.page_size())));
        args.set("row_start", row_bound(page.offset()));
        PagedSql {
            sql: format!(
                "select * from (select page_.*, rownum rn_ from ({sql}) page_ \
                 where rownum <= :row_end) where rn_ > :row_start"
            ),
            args,
        }
    }
}

/// `offset .. rows fetch next .. rows only`. Emits `:row_offset` and
/// `:page_size`.
#[derive(Debug, Clone, Copy)]
pub struct FetchNext;

impl PagingStrategy for FetchNext {
    fn name(&self) -> &'static str {
        "fetch-next"
    }

    fn wrap(&self, sql: &str, page: &PageRequest) -> PagedSql {
        let mut args = ArgBag::new();
        args.set("row_offset", row_bound(page.offset()));
        args.set("page_size", row_bound(page.page_size()));
        PagedSql {
            sql: format!("{sql} offset :row_offset rows fetch next :page_size rows only"),
            args,
        }
    }
}

pub static LIMIT_OFFSET: LimitOffset = LimitOffset;
pub static ROWNUM_WINDOW: RownumWindow = RownumWindow;
pub static FETCH_NEXT: FetchNext = FetchNext;

static STRATEGIES: [(&str, &dyn PagingStrategy); 7] = [
    ("sqlite", &LIMIT_OFFSET),
    ("mysql", &LIMIT_OFFSET),
    ("postgres", &LIMIT_OFFSET),
    ("oracle", &ROWNUM_WINDOW),
    ("sqlserver", &FETCH_NEXT),
    ("mssql", &FETCH_NEXT),
    ("db2", &FETCH_NEXT),
];

/// Looks up the strategy registered for a dialect key, case-insensitive.
#[must_use]
pub fn resolve(dialect_key: &str) -> Option<&'static dyn PagingStrategy> {
    STRATEGIES
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(dialect_key))
        .map(|(_, strategy)| *strategy)
}

/// One page of results plus paging metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page_no: u64,
    pub page_size: u64,
    /// Total matching rows across all pages.
    pub records: u64,
    /// Total pages for `records` rows.
    pub pages: u64,
    pub rows: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_offset_inlines_bounds() {
        let wrapped = LIMIT_OFFSET.wrap("select * from t", &PageRequest::new(3, 10));
        assert_eq!(wrapped.sql, "select * from t limit 10 offset 20");
        assert!(wrapped.args.is_empty());
    }

    #[test]
    fn test_page_count_is_ceiling() {
        assert_eq!(LIMIT_OFFSET.page_count(25, 10), 3);
        assert_eq!(LIMIT_OFFSET.page_count(30, 10), 3);
        assert_eq!(LIMIT_OFFSET.page_count(1, 10), 1);
        assert_eq!(LIMIT_OFFSET.page_count(0, 10), 0);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert!(resolve("SQLite").is_some());
        assert_eq!(resolve("ORACLE").map(PagingStrategy::name), Some("rownum-window"));
        assert!(resolve("sybase").is_none());
    }

    #[test]
    fn test_rownum_window_emits_row_bounds() {
        let wrapped = ROWNUM_WINDOW.wrap("select * from t", &PageRequest::new(2, 10));
        assert!(wrapped.sql.contains(":row_end"));
        assert!(wrapped.sql.contains(":row_start"));
        assert_eq!(wrapped.args.get("row_start"), Some(&Value::Int(10)));
        assert_eq!(wrapped.args.get("row_end"), Some(&Value::Int(20)));
    }

    #[test]
    fn test_fetch_next_emits_offset_and_size() {
        let wrapped = FETCH_NEXT.wrap("select * from t order by id", &PageRequest::new(1, 5));
        assert_eq!(
            wrapped.sql,
            "select * from t order by id offset :row_offset rows fetch next :page_size rows only"
        );
        assert_eq!(wrapped.args.get("row_offset"), Some(&Value::Int(0)));
        assert_eq!(wrapped.args.get("page_size"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_huge_page_request_saturates() {
        let page = PageRequest::new(u64::MAX, u64::MAX);
        assert_eq!(page.offset(), u64::MAX);

        let wrapped = ROWNUM_WINDOW.wrap("select * from t", &page);
        assert_eq!(wrapped.args.get("row_start"), Some(&Value::Int(i64::MAX)));
        assert_eq!(wrapped.args.get("row_end"), Some(&Value::Int(i64::MAX)));

        let wrapped = FETCH_NEXT.wrap("select * from t", &page);
        assert_eq!(wrapped.args.get("row_offset"), Some(&Value::Int(i64::MAX)));
        assert_eq!(wrapped.args.get("page_size"), Some(&Value::Int(i64::MAX)));
    }

    #[test]
    fn test_request_clamps_to_one() {
        let page = PageRequest::new(0, 0);
        assert_eq!(page.page_no(), 1);
        assert_eq!(page.page_size(), 1);
        assert_eq!(page.offset(), 0);
    }
}
