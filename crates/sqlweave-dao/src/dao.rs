//! The DAO facade: renders templates and drives them over a session.
//!
//! Every call path follows the same discipline: render first (pure, can
//! fail without touching the database), then acquire from the session, run
//! the statement, and release before surfacing the result. Release runs on
//! the error path too, so acquires and releases stay paired.

use futures::future::BoxFuture;
use tracing::debug;

use sqlweave_core::dialect::{self, Dialect};
use sqlweave_core::{
    ArgBag, Page, PageRequest, RenderedSql, Template, TemplateCache, Value, Where,
};

use crate::catalog::{SqlCatalog, StatementKind};
use crate::driver::{ConnectionSource, DriverConnection, TxDefinition};
use crate::error::{DaoError, Result, TxError};
use crate::row::Row;
use crate::session::SqlSession;

/// Entry point tying templates, sessions, and a connection source together.
///
/// A `Dao` is cheap to share by reference; per-unit-of-work state lives in
/// the [`SqlSession`] threaded through each call.
pub struct Dao {
    source: Box<dyn ConnectionSource>,
    dialect: &'static dyn Dialect,
    catalog: SqlCatalog,
    inline: TemplateCache,
}

impl Dao {
    /// Creates a DAO over `source`, targeting the SQLite dialect.
    #[must_use]
    pub fn new(source: impl ConnectionSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            dialect: &dialect::Sqlite,
            catalog: SqlCatalog::new(),
            inline: TemplateCache::new(),
        }
    }

    /// Switches the target dialect by registry key, case-insensitive.
    pub fn with_dialect(mut self, name: &str) -> Result<Self> {
        self.dialect = dialect::resolve(name)
            .ok_or_else(|| DaoError::UnknownDialect(name.to_string()))?;
        Ok(self)
    }

    #[must_use]
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.dialect
    }

    /// Opens a fresh logical execution context.
    #[must_use]
    pub fn session(&self) -> SqlSession {
        SqlSession::new()
    }

    /// Starts a predicate builder emitting this dialect's placeholder
    /// prefix, so the built clause composes with templates for the same
    /// target.
    #[must_use]
    pub fn where_clause(&self) -> Where {
        Where::with_prefix(self.dialect.placeholder_prefix())
    }

    #[must_use]
    pub fn catalog(&self) -> &SqlCatalog {
        &self.catalog
    }

    /// Mutable catalog access for startup registration.
    pub fn catalog_mut(&mut self) -> &mut SqlCatalog {
        &mut self.catalog
    }

    /// Runs a query template, returning all rows.
    pub async fn query(
        &self,
        session: &mut SqlSession,
        source: &str,
        args: &ArgBag,
    ) -> Result<Vec<Row>> {
        let rendered = self.render_inline(source, args)?;
        self.run_query(session, &rendered).await
    }

    /// Runs a query template, returning the first row if any.
    pub async fn query_one(
        &self,
        session: &mut SqlSession,
        source: &str,
        args: &ArgBag,
    ) -> Result<Option<Row>> {
        let mut rows = self.query(session, source, args).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Runs a query template, mapping each row through `map`.
    ///
    /// A mapper rejection surfaces as [`DaoError::MapRow`] with the
    /// mapper's message.
    pub async fn query_as<T>(
        &self,
        session: &mut SqlSession,
        source: &str,
        args: &ArgBag,
        map: impl Fn(&Row) -> std::result::Result<T, String>,
    ) -> Result<Vec<T>> {
        let rows = self.query(session, source, args).await?;
        rows.iter()
            .map(|row| map(row).map_err(DaoError::MapRow))
            .collect()
    }

    /// Runs an update/insert/delete template, returning the affected count.
    pub async fn execute(
        &self,
        session: &mut SqlSession,
        source: &str,
        args: &ArgBag,
    ) -> Result<u64> {
        let rendered = self.render_inline(source, args)?;
        self.run_execute(session, &rendered).await
    }

    /// Runs a query template bounded to one page.
    ///
    /// Two statements run on one acquisition: the dialect strategy's count
    /// query over the rendered text, then (when any rows match) the
    /// strategy-wrapped page query. Strategy placeholders render in a
    /// second pass that continues the first pass's marker numbering.
    pub async fn query_paged(
        &self,
        session: &mut SqlSession,
        source: &str,
        args: &ArgBag,
        page: &PageRequest,
    ) -> Result<Page<Row>> {
        let rendered = self.render_inline(source, args)?;
        self.run_paged(session, &rendered, page).await
    }

    /// As [`Dao::query`], for a statement registered in the catalog.
    pub async fn query_stmt(
        &self,
        session: &mut SqlSession,
        id: &str,
        args: &ArgBag,
    ) -> Result<Vec<Row>> {
        let rendered = self.render_stmt(id, StatementKind::Query, args)?;
        self.run_query(session, &rendered).await
    }

    /// As [`Dao::query_one`], for a catalog statement.
    pub async fn query_one_stmt(
        &self,
        session: &mut SqlSession,
        id: &str,
        args: &ArgBag,
    ) -> Result<Option<Row>> {
        let mut rows = self.query_stmt(session, id, args).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// As [`Dao::execute`], for a catalog statement.
    pub async fn execute_stmt(
        &self,
        session: &mut SqlSession,
        id: &str,
        args: &ArgBag,
    ) -> Result<u64> {
        let rendered = self.render_stmt(id, StatementKind::Update, args)?;
        self.run_execute(session, &rendered).await
    }

    /// As [`Dao::query_paged`], for a catalog statement.
    pub async fn query_paged_stmt(
        &self,
        session: &mut SqlSession,
        id: &str,
        args: &ArgBag,
        page: &PageRequest,
    ) -> Result<Page<Row>> {
        let rendered = self.render_stmt(id, StatementKind::Query, args)?;
        self.run_paged(session, &rendered, page).await
    }

    /// Runs `work` inside a transaction on `session`.
    ///
    /// Commits when `work` returns `Ok`, rolls back when it returns `Err`
    /// and propagates the work's error. A rollback that itself fails is
    /// reported with both causes attached.
    pub async fn run_in_transaction<T>(
        &self,
        session: &mut SqlSession,
        definition: TxDefinition,
        work: impl for<'c> FnOnce(&'c mut SqlSession) -> BoxFuture<'c, Result<T>>,
    ) -> Result<T> {
        session.begin(definition);
        match work(session).await {
            Ok(value) => {
                session.commit().await?;
                Ok(value)
            }
            Err(cause) => match session.rollback().await {
                Ok(()) => Err(cause),
                Err(rollback) => Err(DaoError::Tx(TxError::RollbackAfterFailure {
                    rollback: Box::new(rollback),
                    cause: Box::new(cause),
                })),
            },
        }
    }

    fn render_inline(&self, source: &str, args: &ArgBag) -> Result<RenderedSql> {
        // inline statements cache under their own text as the identity
        let template = self.inline.get_or_parse(source, source)?;
        Ok(template.render(args, self.dialect)?)
    }

    fn render_stmt(&self, id: &str, kind: StatementKind, args: &ArgBag) -> Result<RenderedSql> {
        let template = self.catalog.statement_of(id, kind)?;
        debug!(id, "Rendering catalog statement");
        Ok(template.render(args, self.dialect)?)
    }

    async fn run_query(&self, session: &mut SqlSession, rendered: &RenderedSql) -> Result<Vec<Row>> {
        debug!(sql = %rendered.sql, params = rendered.params.len(), "Query");
        let values = rendered.values();
        let connection = session.acquire(self.source.as_ref()).await?;
        let result = connection.query(&rendered.sql, &values).await;
        let released = session.release().await;
        let rows = result?;
        released?;
        Ok(rows)
    }

    async fn run_execute(&self, session: &mut SqlSession, rendered: &RenderedSql) -> Result<u64> {
        debug!(sql = %rendered.sql, params = rendered.params.len(), "Execute");
        let values = rendered.values();
        let connection = session.acquire(self.source.as_ref()).await?;
        let result = connection.execute(&rendered.sql, &values).await;
        let released = session.release().await;
        let affected = result?;
        released?;
        Ok(affected)
    }

    async fn run_paged(
        &self,
        session: &mut SqlSession,
        rendered: &RenderedSql,
        page: &PageRequest,
    ) -> Result<Page<Row>> {
        let strategy = self.dialect.paging();
        let count_sql = strategy.count_sql(&rendered.sql);
        let base_values = rendered.values();

        // second render pass over the wrapped text; the already rendered
        // markers pass through as literal SQL
        let wrapped = strategy.wrap(&rendered.sql, page);
        let page_template = Template::parse(&wrapped.sql)
            .map_err(|err| err.in_template(strategy.name()))?;
        let second =
            page_template.render_from(&wrapped.args, self.dialect, rendered.params.len() + 1)?;
        let mut page_values = base_values.clone();
        page_values.extend(second.values());

        debug!(
            strategy = strategy.name(),
            page_no = page.page_no(),
            page_size = page.page_size(),
            "Paged query"
        );
        let connection = session.acquire(self.source.as_ref()).await?;
        let result =
            fetch_page(connection, &count_sql, &base_values, &second.sql, &page_values).await;
        let released = session.release().await;
        let (records, rows) = result?;
        released?;

        Ok(Page {
            page_no: page.page_no(),
            page_size: page.page_size(),
            records,
            pages: strategy.page_count(records, page.page_size()),
            rows,
        })
    }
}

impl std::fmt::Debug for Dao {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dao")
            .field("dialect", &self.dialect.name())
            .field("catalog", &self.catalog)
            .finish()
    }
}

async fn fetch_page(
    connection: &mut dyn DriverConnection,
    count_sql: &str,
    count_params: &[Value],
    page_sql: &str,
    page_params: &[Value],
) -> Result<(u64, Vec<Row>)> {
    let count_rows = connection.query(count_sql, count_params).await?;
    let records = count_rows
        .first()
        .and_then(|row| row.at(0))
        .and_then(Value::as_int)
        .map_or(0, |n| u64::try_from(n).unwrap_or(0));
    if records == 0 {
        return Ok((0, Vec::new()));
    }
    let rows = connection.query(page_sql, page_params).await?;
    Ok((records, rows))
}
