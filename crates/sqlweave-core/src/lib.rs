//! # sqlweave-core
//!
//! Dynamic SQL templates, predicate building, and pagination strategies.
//!
//! This crate provides:
//! - A line-oriented template engine whose `--#if` / `--#else` / `--#fi`
//!   directives live inside SQL comments
//! - A comparison expression language evaluated against an argument bag,
//!   lenient about missing keys
//! - A fluent WHERE builder that emits collision-free placeholder keys
//! - Dialect-aware bind markers and pluggable pagination strategies
//!
//! ## Rendering a template
//!
//! ```rust
//! use sqlweave_core::dialect::Sqlite;
//! use sqlweave_core::{ArgBag, Template};
//!
//! let template = Template::parse(
//!     "select id, name from users where 1 = 1\n\
//!      --#if :name <> blank\n\
//!      and name like :name|contains\n\
//!      --#fi",
//! )?;
//!
//! let rendered = template.render(&ArgBag::new().with("name", "bo"), &Sqlite)?;
//! assert_eq!(
//!     rendered.sql,
//!     "select id, name from users where 1 = 1\nand name like ?\n"
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Building a predicate
//!
//! ```rust
//! use sqlweave_core::Where;
//!
//! let (clause, args) = Where::new()
//!     .eq("status", "active")
//!     .group(|w| w.gt("age", 18).or().eq("verified", true))
//!     .build()?;
//!
//! assert_eq!(
//!     clause,
//!     "status = :status_1 and (age > :age_2_1 or verified = :verified_2_2)"
//! );
//! assert_eq!(args.len(), 3);
//! # Ok::<(), sqlweave_core::DslError>(())
//! ```

pub mod args;
pub mod dialect;
pub mod error;
pub mod page;
pub mod predicate;
pub mod template;
pub mod value;

pub use args::ArgBag;
pub use error::{DslError, ParseError, RenderError};
pub use page::{Page, PageRequest, PagedSql, PagingStrategy};
pub use predicate::{CmpOp, Connective, Where};
pub use template::{RenderedSql, Template, TemplateCache};
pub use value::{ToValue, Value};
