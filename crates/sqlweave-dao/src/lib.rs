//! # sqlweave-dao
//!
//! Session, transaction, and statement-catalog layer over sqlweave
//! templates.
//!
//! This crate provides:
//! - [`SqlSession`] — the logical execution context: one reference-counted
//!   connection holder, a transaction depth counter, and ordered completion
//!   callbacks
//! - [`Dao`] — the facade that renders a template, acquires from the
//!   session, runs the statement, and releases on every path
//! - [`SqlCatalog`] — statements registered by id at startup, loadable from
//!   `.sql` files
//! - A driver seam ([`ConnectionSource`] / [`DriverConnection`]) with a
//!   SQLite implementation over `sqlx`
//!
//! ```
//! use sqlweave_core::ArgBag;
//! use sqlweave_dao::{Dao, SqlitePoolSource};
//!
//! # tokio_test::block_on(async {
//! let pool = sqlx::sqlite::SqlitePoolOptions::new()
//!     .max_connections(1)
//!     .connect(":memory:")
//!     .await?;
//! let dao = Dao::new(SqlitePoolSource::new(pool));
//! let mut session = dao.session();
//!
//! dao.execute(
//!     &mut session,
//!     "create table users (id integer primary key, name text)",
//!     &ArgBag::new(),
//! )
//! .await?;
//! dao.execute(
//!     &mut session,
//!     "insert into users (id, name) values (:id, :name)",
//!     &ArgBag::new().with("id", 1).with("name", "bob"),
//! )
//! .await?;
//!
//! let rows = dao
//!     .query(
//!         &mut session,
//!         "select name from users where id = :id",
//!         &ArgBag::new().with("id", 1),
//!     )
//!     .await?;
//! assert_eq!(rows[0].text("name"), Some("bob"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

pub mod catalog;
pub mod dao;
pub mod driver;
pub mod error;
pub mod holder;
pub mod row;
pub mod session;
pub mod sqlite;
pub mod tx;

pub use catalog::{SqlCatalog, StatementKind};
pub use dao::Dao;
pub use driver::{ConnectionSource, DriverConnection, Isolation, TxDefinition};
pub use error::{DaoError, DriverError, Result, TxError};
pub use holder::ConnectionHolder;
pub use row::Row;
pub use session::SqlSession;
pub use sqlite::SqlitePoolSource;
pub use tx::{TxOutcome, TxSynchronization};
