//! SQLite driver over an sqlx pool.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef as _};
use tracing::debug;

use sqlweave_core::Value;

use crate::driver::{ConnectionSource, DriverConnection, Isolation, TxDefinition};
use crate::error::DriverError;
use crate::row::Row;

/// Hands out pooled SQLite connections.
pub struct SqlitePoolSource {
    pool: SqlitePool,
}

impl SqlitePoolSource {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionSource for SqlitePoolSource {
    async fn acquire(&self) -> Result<Box<dyn DriverConnection>, DriverError> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(SqliteDriverConnection {
            conn,
            in_tx: false,
            query_only: false,
            read_uncommitted: false,
        }))
    }
}

struct SqliteDriverConnection {
    conn: PoolConnection<sqlx::Sqlite>,
    in_tx: bool,
    query_only: bool,
    read_uncommitted: bool,
}

#[async_trait]
impl DriverConnection for SqliteDriverConnection {
    async fn configure(&mut self, definition: &TxDefinition) -> Result<(), DriverError> {
        debug!(
            name = %definition.name,
            read_only = definition.read_only,
            "Configuring connection for transaction"
        );
        if definition.read_only {
            sqlx::query("PRAGMA query_only = ON")
                .execute(&mut *self.conn)
                .await?;
            self.query_only = true;
        }
        if definition.isolation == Isolation::ReadUncommitted {
            sqlx::query("PRAGMA read_uncommitted = true")
                .execute(&mut *self.conn)
                .await?;
            self.read_uncommitted = true;
        }
        sqlx::query("BEGIN").execute(&mut *self.conn).await?;
        self.in_tx = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        sqlx::query("COMMIT").execute(&mut *self.conn).await?;
        self.in_tx = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        sqlx::query("ROLLBACK").execute(&mut *self.conn).await?;
        self.in_tx = false;
        Ok(())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, DriverError> {
        debug!(sql = %sql, params = params.len(), "Executing statement");
        let mut query = sqlx::query(sql);
        for value in params {
            query = bind_value(query, value);
        }
        let result = query.execute(&mut *self.conn).await?;
        Ok(result.rows_affected())
    }

    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError> {
        debug!(sql = %sql, params = params.len(), "Running query");
        let mut query = sqlx::query(sql);
        for value in params {
            query = bind_value(query, value);
        }
        let rows = query.fetch_all(&mut *self.conn).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn close(mut self: Box<Self>) -> Result<(), DriverError> {
        if self.in_tx {
            sqlx::query("ROLLBACK").execute(&mut *self.conn).await?;
        }
        if self.query_only {
            sqlx::query("PRAGMA query_only = OFF")
                .execute(&mut *self.conn)
                .await?;
        }
        if self.read_uncommitted {
            sqlx::query("PRAGMA read_uncommitted = false")
                .execute(&mut *self.conn)
                .await?;
        }
        // dropping the pooled connection returns it to the pool
        Ok(())
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null | Value::Ignore => query.bind(None::<i64>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(n) => query.bind(*n),
        Value::Float(f) => query.bind(*f),
        Value::Text(text) => query.bind(text.clone()),
        Value::Blob(bytes) => query.bind(bytes.clone()),
        Value::DateTime(stamp) => query.bind(*stamp),
        // lists are expanded to one marker per element before binding
        Value::List(_) => query.bind(None::<i64>),
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row, DriverError> {
    let mut columns = Vec::with_capacity(row.columns().len());
    for (index, column) in row.columns().iter().enumerate() {
        columns.push((column.name().to_string(), decode_column(row, index)?));
    }
    Ok(Row::new(columns))
}

fn decode_column(row: &SqliteRow, index: usize) -> Result<Value, DriverError> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();
    let value = match type_name.as_str() {
        "BOOLEAN" => Value::Bool(row.try_get(index)?),
        "INTEGER" => Value::Int(row.try_get(index)?),
        "REAL" => Value::Float(row.try_get(index)?),
        "BLOB" => Value::Blob(row.try_get(index)?),
        "DATETIME" => Value::DateTime(row.try_get(index)?),
        _ => Value::Text(row.try_get(index)?),
    };
    Ok(value)
}
