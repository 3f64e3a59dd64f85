//! Fluent WHERE-clause builder.
//!
//! The builder collects conditions in call order and emits a clause whose
//! placeholders use template syntax (`:name`), so its output can be pasted
//! into template text or rendered directly. Every emitted placeholder key
//! is the column name suffixed with the condition's position, nested group
//! positions included, which keeps keys distinct no matter how often a
//! column repeats.
//!
//! ```
//! use sqlweave_core::Where;
//!
//! let (clause, args) = Where::new()
//!     .eq("status", 1)
//!     .gt("age", 18)
//!     .build()?;
//! assert_eq!(clause, "status = :status_1 and age > :age_2");
//! assert_eq!(args.len(), 2);
//! # Ok::<(), sqlweave_core::DslError>(())
//! ```

use std::fmt;

use crate::args::ArgBag;
use crate::error::DslError;
use crate::value::{ToValue, Value};

/// Connective between two adjacent conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
            Self::Like => write!(f, "like"),
            Self::NotLike => write!(f, "not like"),
        }
    }
}

#[derive(Debug, Clone)]
enum Cond {
    Cmp {
        column: String,
        op: CmpOp,
        value: Value,
    },
    Between {
        column: String,
        low: Value,
        high: Value,
        negated: bool,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    NullCheck {
        column: String,
        negated: bool,
    },
    Group(Vec<(Connective, Cond)>),
    Raw {
        sql: String,
        args: ArgBag,
    },
}

/// A WHERE clause under construction.
///
/// Conditions join with `and` unless [`Where::or`] was called immediately
/// before. A condition whose value is [`Value::Ignore`] is dropped at build
/// time, so optional filters can be threaded through without branching.
#[derive(Debug, Clone)]
pub struct Where {
    conds: Vec<(Connective, Cond)>,
    next: Connective,
    prefix: char,
}

impl Default for Where {
    fn default() -> Self {
        Self::new()
    }
}

impl Where {
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefix(':')
    }

    /// Starts a builder whose placeholders use `prefix` instead of `:`.
    #[must_use]
    pub fn with_prefix(prefix: char) -> Self {
        Self {
            conds: Vec::new(),
            next: Connective::And,
            prefix,
        }
    }

    fn push(mut self, cond: Cond) -> Self {
        let link = self.next;
        self.next = Connective::And;
        self.conds.push((link, cond));
        self
    }

    fn cmp(self, column: &str, op: CmpOp, value: impl ToValue) -> Self {
        self.push(Cond::Cmp {
            column: column.to_string(),
            op,
            value: value.to_value(),
        })
    }

    /// Adds an equality condition (column = value).
    #[must_use]
    pub fn eq(self, column: &str, value: impl ToValue) -> Self {
        self.cmp(column, CmpOp::Eq, value)
    }

    /// Adds an inequality condition (column != value).
    #[must_use]
    pub fn ne(self, column: &str, value: impl ToValue) -> Self {
        self.cmp(column, CmpOp::Ne, value)
    }

    /// Adds a greater-than condition (column > value).
    #[must_use]
    pub fn gt(self, column: &str, value: impl ToValue) -> Self {
        self.cmp(column, CmpOp::Gt, value)
    }

    /// Adds a greater-than-or-equal condition (column >= value).
    #[must_use]
    pub fn gte(self, column: &str, value: impl ToValue) -> Self {
        self.cmp(column, CmpOp::Gte, value)
    }

    /// Adds a less-than condition (column < value).
    #[must_use]
    pub fn lt(self, column: &str, value: impl ToValue) -> Self {
        self.cmp(column, CmpOp::Lt, value)
    }

    /// Adds a less-than-or-equal condition (column <= value).
    #[must_use]
    pub fn lte(self, column: &str, value: impl ToValue) -> Self {
        self.cmp(column, CmpOp::Lte, value)
    }

    /// Adds a pattern match. Use `%` for wildcards.
    #[must_use]
    pub fn like(self, column: &str, pattern: &str) -> Self {
        self.cmp(column, CmpOp::Like, pattern)
    }

    #[must_use]
    pub fn not_like(self, column: &str, pattern: &str) -> Self {
        self.cmp(column, CmpOp::NotLike, pattern)
    }

    /// Adds a contains match (like %text%).
    #[must_use]
    pub fn contains(self, column: &str, text: &str) -> Self {
        self.cmp(column, CmpOp::Like, format!("%{text}%"))
    }

    /// Adds a starts-with match (like text%).
    #[must_use]
    pub fn startswith(self, column: &str, text: &str) -> Self {
        self.cmp(column, CmpOp::Like, format!("{text}%"))
    }

    /// Adds an ends-with match (like %text).
    #[must_use]
    pub fn endswith(self, column: &str, text: &str) -> Self {
        self.cmp(column, CmpOp::Like, format!("%{text}"))
    }

    /// Adds a range condition (low <= column <= high).
    ///
    /// Dropped at build time when either bound is [`Value::Ignore`].
    #[must_use]
    pub fn between(self, column: &str, low: impl ToValue, high: impl ToValue) -> Self {
        self.push(Cond::Between {
            column: column.to_string(),
            low: low.to_value(),
            high: high.to_value(),
            negated: false,
        })
    }

    #[must_use]
    pub fn not_between(self, column: &str, low: impl ToValue, high: impl ToValue) -> Self {
        self.push(Cond::Between {
            column: column.to_string(),
            low: low.to_value(),
            high: high.to_value(),
            negated: true,
        })
    }

    /// Adds a membership condition with one placeholder per element.
    ///
    /// Building fails when `values` is empty.
    #[must_use]
    pub fn in_list<V: ToValue>(self, column: &str, values: Vec<V>) -> Self {
        self.push(Cond::In {
            column: column.to_string(),
            values: values.into_iter().map(ToValue::to_value).collect(),
            negated: false,
        })
    }

    #[must_use]
    pub fn not_in_list<V: ToValue>(self, column: &str, values: Vec<V>) -> Self {
        self.push(Cond::In {
            column: column.to_string(),
            values: values.into_iter().map(ToValue::to_value).collect(),
            negated: true,
        })
    }

    #[must_use]
    pub fn is_null(self, column: &str) -> Self {
        self.push(Cond::NullCheck {
            column: column.to_string(),
            negated: false,
        })
    }

    #[must_use]
    pub fn is_not_null(self, column: &str) -> Self {
        self.push(Cond::NullCheck {
            column: column.to_string(),
            negated: true,
        })
    }

    /// Adds a verbatim SQL fragment with the arguments its placeholders need.
    ///
    /// The fragment is the caller's responsibility; placeholder keys in it
    /// must not collide with generated ones, so avoid the `_<number>` suffix
    /// shape.
    #[must_use]
    pub fn raw(self, sql: &str, args: ArgBag) -> Self {
        self.push(Cond::Raw {
            sql: sql.to_string(),
            args,
        })
    }

    /// Joins the next condition with `or` instead of `and`.
    #[must_use]
    pub fn or(mut self) -> Self {
        self.next = Connective::Or;
        self
    }

    /// Adds a parenthesized sub-clause built by `f`.
    ///
    /// Keys inside the group extend this condition's position, so
    /// `city_3_1` is the first condition of a group in position three.
    #[must_use]
    pub fn group(self, f: impl FnOnce(Self) -> Self) -> Self {
        let inner = f(Self::with_prefix(self.prefix));
        self.push(Cond::Group(inner.conds))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conds.is_empty()
    }

    /// Builds the clause text and its argument bag.
    ///
    /// The leading connective is stripped, so the result drops straight in
    /// after `where`. An all-ignored builder yields an empty clause.
    pub fn build(&self) -> Result<(String, ArgBag), DslError> {
        let mut args = ArgBag::new();
        let sql = emit_level(&self.conds, &[], self.prefix, &mut args)?;
        Ok((strip_connective(&sql).to_string(), args))
    }
}

fn emit_level(
    conds: &[(Connective, Cond)],
    path: &[usize],
    prefix: char,
    args: &mut ArgBag,
) -> Result<String, DslError> {
    let mut sql = String::new();
    for (index, (link, cond)) in conds.iter().enumerate() {
        let mut sub_path = path.to_vec();
        sub_path.push(index + 1);
        if let Some(piece) = emit_cond(cond, &sub_path, prefix, args)? {
            sql.push_str(&format!(" {link} {piece}"));
        }
    }
    Ok(sql)
}

fn emit_cond(
    cond: &Cond,
    path: &[usize],
    prefix: char,
    args: &mut ArgBag,
) -> Result<Option<String>, DslError> {
    match cond {
        Cond::Cmp { column, op, value } => {
            if matches!(value, Value::Ignore) {
                return Ok(None);
            }
            let key = key_for(column, path, &[]);
            args.set(key.clone(), value.clone());
            Ok(Some(format!("{column} {op} {prefix}{key}")))
        }
        Cond::Between {
            column,
            low,
            high,
            negated,
        } => {
            if matches!(low, Value::Ignore) || matches!(high, Value::Ignore) {
                return Ok(None);
            }
            let low_key = key_for(column, path, &[1]);
            let high_key = key_for(column, path, &[2]);
            args.set(low_key.clone(), low.clone());
            args.set(high_key.clone(), high.clone());
            let keyword = if *negated { "not between" } else { "between" };
            Ok(Some(format!(
                "{column} {keyword} {prefix}{low_key} and {prefix}{high_key}"
            )))
        }
        Cond::In {
            column,
            values,
            negated,
        } => {
            if values.is_empty() {
                return Err(DslError::EmptyInList(column.clone()));
            }
            let live: Vec<&Value> = values
                .iter()
                .filter(|value| !matches!(value, Value::Ignore))
                .collect();
            if live.is_empty() {
                return Ok(None);
            }
            let mut markers = Vec::new();
            for (element, value) in live.into_iter().enumerate() {
                let key = key_for(column, path, &[element + 1]);
                args.set(key.clone(), value.clone());
                markers.push(format!("{prefix}{key}"));
            }
            let keyword = if *negated { "not in" } else { "in" };
            Ok(Some(format!("{column} {keyword} ({})", markers.join(", "))))
        }
        Cond::NullCheck { column, negated } => {
            let keyword = if *negated { "is not null" } else { "is null" };
            Ok(Some(format!("{column} {keyword}")))
        }
        Cond::Group(inner) => {
            let body = emit_level(inner, path, prefix, args)?;
            if body.is_empty() {
                return Ok(None);
            }
            Ok(Some(format!("({})", strip_connective(&body))))
        }
        Cond::Raw { sql, args: extra } => {
            args.extend(extra.clone());
            Ok(Some(sql.clone()))
        }
    }
}

/// Placeholder key for `column` at a builder position.
///
/// Column text is reduced to identifier characters so expressions like
/// `t.age` or `lower(name)` still produce bindable keys.
fn key_for(column: &str, path: &[usize], tail: &[usize]) -> String {
    let mut key: String = column
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    for index in path.iter().chain(tail) {
        key.push('_');
        key.push_str(&index.to_string());
    }
    key
}

fn strip_connective(sql: &str) -> &str {
    let sql = sql.trim_start();
    if let Some(rest) = sql.strip_prefix("and ") {
        rest
    } else if let Some(rest) = sql.strip_prefix("or ") {
        rest
    } else {
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_chain() {
        let (sql, args) = Where::new().eq("status", 1).gt("age", 18).build().unwrap();
        assert_eq!(sql, "status = :status_1 and age > :age_2");
        assert_eq!(args.get("status_1"), Some(&Value::Int(1)));
        assert_eq!(args.get("age_2"), Some(&Value::Int(18)));
    }

    #[test]
    fn test_or_toggle_applies_once() {
        let (sql, _) = Where::new()
            .eq("a", 1)
            .or()
            .eq("b", 2)
            .eq("c", 3)
            .build()
            .unwrap();
        assert_eq!(sql, "a = :a_1 or b = :b_2 and c = :c_3");
    }

    #[test]
    fn test_repeated_column_keys_stay_distinct() {
        let (sql, args) = Where::new().gt("age", 18).lt("age", 65).build().unwrap();
        assert_eq!(sql, "age > :age_1 and age < :age_2");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_group_namespaces_inner_keys() {
        let (sql, args) = Where::new()
            .eq("status", 1)
            .gt("age", 18)
            .group(|w| w.eq("city", "ams").or().eq("city", "rtm"))
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "status = :status_1 and age > :age_2 and (city = :city_3_1 or city = :city_3_2)"
        );
        assert_eq!(args.get("city_3_1"), Some(&Value::Text("ams".to_string())));
        assert_eq!(args.get("city_3_2"), Some(&Value::Text("rtm".to_string())));
    }

    #[test]
    fn test_or_before_group() {
        let (sql, _) = Where::new()
            .eq("a", 1)
            .or()
            .group(|w| w.eq("b", 2).eq("c", 3))
            .build()
            .unwrap();
        assert_eq!(sql, "a = :a_1 or (b = :b_2_1 and c = :c_2_2)");
    }

    #[test]
    fn test_ignore_drops_condition_and_connective() {
        let (sql, args) = Where::new()
            .eq("a", Value::Ignore)
            .eq("b", 2)
            .build()
            .unwrap();
        assert_eq!(sql, "b = :b_2");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_all_ignored_group_is_omitted() {
        let (sql, _) = Where::new()
            .eq("a", 1)
            .group(|w| w.eq("b", Value::Ignore).eq("c", Value::Ignore))
            .build()
            .unwrap();
        assert_eq!(sql, "a = :a_1");
    }

    #[test]
    fn test_between_expands_both_bounds() {
        let (sql, args) = Where::new().between("price", 10, 100).build().unwrap();
        assert_eq!(sql, "price between :price_1_1 and :price_1_2");
        assert_eq!(args.get("price_1_1"), Some(&Value::Int(10)));
        assert_eq!(args.get("price_1_2"), Some(&Value::Int(100)));
    }

    #[test]
    fn test_between_with_ignored_bound_is_dropped() {
        let (sql, args) = Where::new()
            .between("price", Value::Ignore, 100)
            .eq("status", 1)
            .build()
            .unwrap();
        assert_eq!(sql, "status = :status_2");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_in_list_one_placeholder_per_element() {
        let (sql, args) = Where::new()
            .in_list("id", vec![10, 20, 30])
            .build()
            .unwrap();
        assert_eq!(sql, "id in (:id_1_1, :id_1_2, :id_1_3)");
        assert_eq!(args.get("id_1_3"), Some(&Value::Int(30)));
    }

    #[test]
    fn test_empty_in_list_is_an_error() {
        let err = Where::new().in_list::<i64>("id", vec![]).build().unwrap_err();
        assert_eq!(err, DslError::EmptyInList("id".to_string()));
    }

    #[test]
    fn test_null_checks_bind_nothing() {
        let (sql, args) = Where::new()
            .is_null("deleted_at")
            .is_not_null("email")
            .build()
            .unwrap();
        assert_eq!(sql, "deleted_at is null and email is not null");
        assert!(args.is_empty());
    }

    #[test]
    fn test_contains_wraps_pattern() {
        let (_, args) = Where::new().contains("email", "@corp").build().unwrap();
        assert_eq!(args.get("email_1"), Some(&Value::Text("%@corp%".to_string())));
    }

    #[test]
    fn test_raw_merges_its_args() {
        let (sql, args) = Where::new()
            .eq("a", 1)
            .raw("length(name) > :min_len", ArgBag::new().with("min_len", 4))
            .build()
            .unwrap();
        assert_eq!(sql, "a = :a_1 and length(name) > :min_len");
        assert_eq!(args.get("min_len"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_leading_connective_on_first_raw_is_stripped() {
        let (sql, _) = Where::new()
            .raw("and flags = 0", ArgBag::new())
            .eq("a", 1)
            .build()
            .unwrap();
        assert_eq!(sql, "flags = 0 and a = :a_1");
    }

    #[test]
    fn test_custom_prefix() {
        let (sql, _) = Where::with_prefix('@').eq("a", 1).build().unwrap();
        assert_eq!(sql, "a = @a_1");
    }

    #[test]
    fn test_empty_builder_builds_empty_clause() {
        let (sql, args) = Where::new().build().unwrap();
        assert!(sql.is_empty());
        assert!(args.is_empty());
    }

    #[test]
    fn test_sanitized_column_key() {
        let (sql, args) = Where::new().eq("lower(name)", "bob").build().unwrap();
        assert_eq!(sql, "lower(name) = :lower_name__1");
        assert!(args.contains("lower_name__1"));
    }
}
