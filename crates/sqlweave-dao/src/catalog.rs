//! Statement catalog: named templates registered up front.
//!
//! Instead of discovering statements per call, an application registers
//! every template at startup under a stable id, either programmatically or
//! from `.sql` files. Registration parses immediately, so a malformed
//! template fails at startup rather than mid-request. Parsed trees live in
//! a shared [`TemplateCache`]; `reload` and `remove` invalidate explicitly.
//!
//! A statement file holds either a single statement (id = file stem) or
//! several sections introduced by `--!<name>` header lines:
//!
//! ```sql
//! --!find
//! select id, name from users where id = :id
//!
//! --!insert update
//! insert into users (id, name) values (:id, :name)
//! ```
//!
//! Section ids are namespaced by the file stem (`users.find` for a `find`
//! section in `users.sql`). A header may end with `query` or `update`;
//! `query` is the default.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use sqlweave_core::template::ParseOptions;
use sqlweave_core::{ParseError, Template, TemplateCache};

use crate::error::{DaoError, Result};

/// Whether a statement returns rows or an affected-row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Query,
    Update,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Update => write!(f, "update"),
        }
    }
}

struct Registered {
    kind: StatementKind,
    source: String,
}

/// Registry of statement ids to parsed templates.
#[derive(Default)]
pub struct SqlCatalog {
    cache: TemplateCache,
    statements: HashMap<String, Registered>,
}

impl SqlCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: ParseOptions) -> Self {
        Self {
            cache: TemplateCache::with_options(options),
            statements: HashMap::new(),
        }
    }

    /// Registers `source` under `id`, parsing it immediately.
    ///
    /// Re-registering an id replaces the previous statement.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        kind: StatementKind,
        source: impl Into<String>,
    ) -> Result<()> {
        let id = id.into();
        let source = source.into();
        self.cache.invalidate(&id);
        self.cache.get_or_parse(&id, &source)?;
        debug!(id, %kind, "Registered statement");
        self.statements.insert(id, Registered { kind, source });
        Ok(())
    }

    /// Replaces the source of an already registered statement, keeping its
    /// kind. The new source is parsed before the old one is discarded.
    pub fn reload(&mut self, id: &str, source: impl Into<String>) -> Result<()> {
        let registered = self
            .statements
            .get_mut(id)
            .ok_or_else(|| DaoError::UnknownStatement(id.to_string()))?;
        let source = source.into();
        Template::parse(&source).map_err(|err| err.in_template(id))?;
        registered.source = source;
        self.cache.invalidate(id);
        info!(id, "Reloaded statement");
        Ok(())
    }

    /// Drops a statement and its cached parse.
    pub fn remove(&mut self, id: &str) -> Option<StatementKind> {
        self.cache.invalidate(id);
        self.statements.remove(id).map(|r| r.kind)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.statements.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Looks up a statement's kind and parsed template.
    pub fn statement(&self, id: &str) -> Result<(StatementKind, Arc<Template>)> {
        let registered = self
            .statements
            .get(id)
            .ok_or_else(|| DaoError::UnknownStatement(id.to_string()))?;
        let template = self.cache.get_or_parse(id, &registered.source)?;
        Ok((registered.kind, template))
    }

    /// As [`SqlCatalog::statement`], also checking the registered kind.
    pub fn statement_of(&self, id: &str, expected: StatementKind) -> Result<Arc<Template>> {
        let (actual, template) = self.statement(id)?;
        if actual != expected {
            return Err(DaoError::StatementKind {
                id: id.to_string(),
                expected,
                actual,
            });
        }
        Ok(template)
    }

    /// Loads one `.sql` file, returning how many statements it held.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = std::fs::read_to_string(path)?;
        let sections = split_sections(&stem, &source)?;
        let count = sections.len();
        for (id, kind, body) in sections {
            self.register(id, kind, body)?;
        }
        debug!(path = %path.display(), count, "Loaded statement file");
        Ok(count)
    }

    /// Loads every `.sql` file in `dir` (not recursive), returning the
    /// total statement count. Files load in name order, so a duplicate id
    /// resolves to the lexicographically later file.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "sql"))
            .collect();
        paths.sort();

        let mut total = 0;
        for path in &paths {
            total += self.load_file(path)?;
        }
        info!(dir = %dir.display(), files = paths.len(), statements = total, "Loaded statement directory");
        Ok(total)
    }
}

impl fmt::Debug for SqlCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlCatalog")
            .field("statements", &self.statements.len())
            .finish()
    }
}

/// Splits file text into `(id, kind, body)` statements.
///
/// A file whose first non-blank line is not a `--!` header is a single
/// headerless statement named after the file stem.
fn split_sections(
    stem: &str,
    source: &str,
) -> std::result::Result<Vec<(String, StatementKind, String)>, DaoError> {
    let headerless = source
        .lines()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| !line.trim().starts_with("--!"));
    if headerless {
        return Ok(vec![(
            stem.to_string(),
            StatementKind::Query,
            source.to_string(),
        )]);
    }

    let mut sections: Vec<(String, StatementKind, String)> = Vec::new();
    let mut current: Option<(String, StatementKind, String)> = None;

    for (index, line) in source.lines().enumerate() {
        let line_no = index + 1;
        if let Some(header) = line.trim().strip_prefix("--!") {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            let (name, kind) = parse_header(header, line_no)?;
            current = Some((format!("{stem}.{name}"), kind, String::new()));
        } else if let Some((_, _, body)) = current.as_mut() {
            body.push_str(line);
            body.push('\n');
        }
    }
    if let Some(section) = current.take() {
        sections.push(section);
    }
    Ok(sections)
}

fn parse_header(
    header: &str,
    line_no: usize,
) -> std::result::Result<(String, StatementKind), DaoError> {
    let mut words = header.split_whitespace();
    let name = words.next().filter(|n| !n.is_empty()).ok_or_else(|| {
        DaoError::Parse(ParseError::new("`--!` section header has no name", line_no))
    })?;
    let kind = match words.next() {
        None | Some("query") => StatementKind::Query,
        Some("update") => StatementKind::Update,
        Some(other) => {
            return Err(DaoError::Parse(ParseError::new(
                format!("unknown statement kind `{other}` (expected `query` or `update`)"),
                line_no,
            )));
        }
    };
    if let Some(junk) = words.next() {
        return Err(DaoError::Parse(ParseError::new(
            format!("unexpected `{junk}` after statement kind"),
            line_no,
        )));
    }
    Ok((name.to_string(), kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_parses_eagerly() {
        let mut catalog = SqlCatalog::new();
        catalog
            .register("users.find", StatementKind::Query, "select :id")
            .unwrap();
        assert!(catalog.contains("users.find"));

        let err = catalog
            .register("broken", StatementKind::Query, "--#if :a\nx")
            .unwrap_err();
        assert!(matches!(err, DaoError::Parse(_)));
        assert!(!catalog.contains("broken"));
    }

    #[test]
    fn test_statement_of_checks_kind() {
        let mut catalog = SqlCatalog::new();
        catalog
            .register("users.insert", StatementKind::Update, "insert into users values (:id)")
            .unwrap();

        assert!(catalog.statement_of("users.insert", StatementKind::Update).is_ok());
        let err = catalog
            .statement_of("users.insert", StatementKind::Query)
            .unwrap_err();
        assert!(matches!(err, DaoError::StatementKind { .. }));
        assert!(matches!(
            catalog.statement_of("ghost", StatementKind::Query).unwrap_err(),
            DaoError::UnknownStatement(_)
        ));
    }

    #[test]
    fn test_reload_swaps_source_and_keeps_kind() {
        let mut catalog = SqlCatalog::new();
        catalog
            .register("q", StatementKind::Update, "update t set a = :a")
            .unwrap();
        catalog.reload("q", "update t set b = :b").unwrap();

        let (kind, template) = catalog.statement("q").unwrap();
        assert_eq!(kind, StatementKind::Update);
        let rendered = template
            .render(
                &sqlweave_core::ArgBag::new().with("b", 1),
                &sqlweave_core::dialect::Sqlite,
            )
            .unwrap();
        assert_eq!(rendered.sql, "update t set b = ?");

        // a bad reload leaves the old statement in place
        assert!(catalog.reload("q", "--#fi").is_err());
        assert!(catalog.statement("q").is_ok());
        assert!(matches!(
            catalog.reload("ghost", "select 1").unwrap_err(),
            DaoError::UnknownStatement(_)
        ));
    }

    #[test]
    fn test_remove_forgets_statement() {
        let mut catalog = SqlCatalog::new();
        catalog
            .register("q", StatementKind::Query, "select 1")
            .unwrap();
        assert_eq!(catalog.remove("q"), Some(StatementKind::Query));
        assert_eq!(catalog.remove("q"), None);
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_split_sections() {
        let source = "--!find\nselect id from users where id = :id\n\n--!insert update\ninsert into users values (:id)\n";
        let sections = split_sections("users", source).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].0, "users.find");
        assert_eq!(sections[0].1, StatementKind::Query);
        assert_eq!(sections[1].0, "users.insert");
        assert_eq!(sections[1].1, StatementKind::Update);
        assert!(sections[1].2.contains("insert into users"));
    }

    #[test]
    fn test_headerless_file_is_one_statement() {
        let sections = split_sections("report", "select count(*) from t\n").unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].0, "report");
        assert_eq!(sections[0].1, StatementKind::Query);
    }

    #[test]
    fn test_bad_headers_are_rejected() {
        assert!(split_sections("f", "--!\nselect 1").is_err());
        assert!(split_sections("f", "--!q delete\nselect 1").is_err());
        assert!(split_sections("f", "--!q update junk\nselect 1").is_err());
    }
}
