//! Fragment tree to executable SQL.

use crate::args::ArgBag;
use crate::dialect::Dialect;
use crate::error::RenderError;
use crate::template::expr;
use crate::template::fragment::Fragment;
use crate::template::pipes;
use crate::value::Value;

/// Rendered SQL: driver text plus the bound parameters in emission order.
///
/// Parameter names are kept for diagnostics; drivers bind by position.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    pub sql: String,
    pub params: Vec<(String, Value)>,
}

impl RenderedSql {
    /// The parameter values alone, in bind order.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.params.iter().map(|(_, value)| value.clone()).collect()
    }
}

pub(crate) fn render(
    fragments: &[Fragment],
    args: &ArgBag,
    dialect: &dyn Dialect,
    first_ordinal: usize,
) -> Result<RenderedSql, RenderError> {
    let mut out = RenderedSql {
        sql: String::new(),
        params: Vec::new(),
    };
    let mut ordinal = first_ordinal;
    walk(fragments, args, dialect, &mut out, &mut ordinal)?;
    Ok(out)
}

fn walk(
    fragments: &[Fragment],
    args: &ArgBag,
    dialect: &dyn Dialect,
    out: &mut RenderedSql,
    ordinal: &mut usize,
) -> Result<(), RenderError> {
    for fragment in fragments {
        match fragment {
            Fragment::Text(text) => out.sql.push_str(text),
            Fragment::Placeholder { name, pipes } => {
                emit_placeholder(name, pipes, args, dialect, out, ordinal)?;
            }
            Fragment::Branch {
                when,
                then,
                otherwise,
            } => {
                let branch = if expr::evaluate(when, args)? {
                    then
                } else {
                    otherwise
                };
                walk(branch, args, dialect, out, ordinal)?;
            }
        }
    }
    Ok(())
}

fn emit_placeholder(
    name: &str,
    chain: &[String],
    args: &ArgBag,
    dialect: &dyn Dialect,
    out: &mut RenderedSql,
    ordinal: &mut usize,
) -> Result<(), RenderError> {
    let value = args.get(name).cloned().unwrap_or(Value::Null);
    match value {
        Value::Ignore => {}
        Value::List(items) => {
            if items.is_empty() {
                // `in ()` is invalid SQL; an empty list matches nothing
                out.sql.push_str("null");
                return Ok(());
            }
            for (index, item) in items.into_iter().enumerate() {
                if index > 0 {
                    out.sql.push_str(", ");
                }
                let item = match apply_chain(item, chain)? {
                    Value::Ignore => Value::Null,
                    other => other,
                };
                push_param(name, item, dialect, out, ordinal);
            }
        }
        value => {
            let value = apply_chain(value, chain)?;
            push_param(name, value, dialect, out, ordinal);
        }
    }
    Ok(())
}

fn apply_chain(mut value: Value, chain: &[String]) -> Result<Value, RenderError> {
    for pipe in chain {
        value = pipes::apply(pipe, value)?;
    }
    Ok(value)
}

fn push_param(
    name: &str,
    value: Value,
    dialect: &dyn Dialect,
    out: &mut RenderedSql,
    ordinal: &mut usize,
) {
    out.sql.push_str(&dialect.bind_marker(*ordinal));
    out.params.push((name.to_string(), value));
    *ordinal += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Postgres, Sqlite};
    use crate::template::Template;

    fn render_sqlite(source: &str, args: &ArgBag) -> RenderedSql {
        Template::parse(source).unwrap().render(args, &Sqlite).unwrap()
    }

    #[test]
    fn test_roundtrip_without_conditionals() {
        let args = ArgBag::new().with("id", 7).with("name", "bob");
        let rendered = render_sqlite("select * from t where id = :id and name = :name", &args);
        assert_eq!(rendered.sql, "select * from t where id = ? and name = ?");
        assert_eq!(
            rendered.params,
            vec![
                ("id".to_string(), Value::Int(7)),
                ("name".to_string(), Value::Text("bob".to_string())),
            ]
        );
    }

    #[test]
    fn test_conditional_selects_branch() {
        let source = "select x\n--#if :a != null\nfrom yes\n--#else\nfrom no\n--#fi";
        let with = render_sqlite(source, &ArgBag::new().with("a", 1));
        assert_eq!(with.sql, "select x\nfrom yes\n");
        let without = render_sqlite(source, &ArgBag::new());
        assert_eq!(without.sql, "select x\nfrom no\n");
    }

    #[test]
    fn test_false_condition_without_else_adds_nothing() {
        let source = "select x\n--#if :a != null\nwhere a = :a\n--#fi";
        let rendered = render_sqlite(source, &ArgBag::new());
        assert_eq!(rendered.sql, "select x\n");
        assert!(rendered.params.is_empty());
    }

    #[test]
    fn test_ignore_drops_placeholder_and_param() {
        let args = ArgBag::new().with("a", Value::Ignore).with("b", 2);
        let rendered = render_sqlite("update t set a = :a, b = :b", &args);
        assert_eq!(rendered.sql, "update t set a = , b = ?");
        assert_eq!(rendered.params, vec![("b".to_string(), Value::Int(2))]);
    }

    #[test]
    fn test_missing_placeholder_binds_null() {
        let rendered = render_sqlite("select :ghost", &ArgBag::new());
        assert_eq!(rendered.sql, "select ?");
        assert_eq!(rendered.params, vec![("ghost".to_string(), Value::Null)]);
    }

    #[test]
    fn test_pipes_apply_left_to_right() {
        let args = ArgBag::new().with("name", "  bo  ");
        let rendered = render_sqlite("where name like :name|trim|contains", &args);
        assert_eq!(
            rendered.params,
            vec![("name".to_string(), Value::Text("%bo%".to_string()))]
        );
    }

    #[test]
    fn test_unknown_pipe_fails() {
        let template = Template::parse("select :a|shout").unwrap();
        let err = template.render(&ArgBag::new().with("a", 1), &Sqlite).unwrap_err();
        assert!(matches!(err, RenderError::UnknownPipe(_)));
    }

    #[test]
    fn test_list_expansion() {
        let args = ArgBag::new().with("ids", Value::list([1, 2, 3]));
        let rendered = render_sqlite("where id in (:ids)", &args);
        assert_eq!(rendered.sql, "where id in (?, ?, ?)");
        assert_eq!(rendered.params.len(), 3);
        assert_eq!(rendered.params[2].1, Value::Int(3));
    }

    #[test]
    fn test_empty_list_renders_null_literal() {
        let args = ArgBag::new().with("ids", Value::List(Vec::new()));
        let rendered = render_sqlite("where id in (:ids)", &args);
        assert_eq!(rendered.sql, "where id in (null)");
        assert!(rendered.params.is_empty());
    }

    #[test]
    fn test_postgres_markers_are_numbered() {
        let args = ArgBag::new().with("a", 1).with("b", 2);
        let template = Template::parse("select :a, :b").unwrap();
        let rendered = template.render(&args, &Postgres).unwrap();
        assert_eq!(rendered.sql, "select $1, $2");
    }

    #[test]
    fn test_render_from_continues_numbering() {
        let args = ArgBag::new().with("c", 3);
        let template = Template::parse("and c = :c").unwrap();
        let rendered = template.render_from(&args, &Postgres, 3).unwrap();
        assert_eq!(rendered.sql, "and c = $3");
    }

    #[test]
    fn test_expression_error_carries_text() {
        let template = Template::parse("--#if :a >\nx\n--#fi").unwrap();
        let err = template.render(&ArgBag::new(), &Sqlite).unwrap_err();
        let RenderError::Expression { expr, .. } = err else {
            panic!("expected an expression error, got {err:?}");
        };
        assert_eq!(expr, ":a >");
    }

    #[test]
    fn test_repeated_placeholder_binds_twice() {
        let args = ArgBag::new().with("v", 5);
        let rendered = render_sqlite("select :v + :v", &args);
        assert_eq!(rendered.sql, "select ? + ?");
        assert_eq!(rendered.params.len(), 2);
    }
}
