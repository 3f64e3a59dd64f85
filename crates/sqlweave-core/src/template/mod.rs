//! SQL templates with comment-directive conditionals.
//!
//! A template is plain SQL annotated two ways: `:name` placeholders that
//! become driver bind markers, and `--#if` / `--#else` / `--#fi` directive
//! lines that include or skip whole blocks based on the argument bag. The
//! directives ride inside SQL comments, so an unrendered template still
//! pastes into a database console.
//!
//! ```
//! use sqlweave_core::dialect::Sqlite;
//! use sqlweave_core::{ArgBag, Template};
//!
//! let template = Template::parse(
//!     "select name from staff where 1 = 1\n\
//!      --#if :age <> blank && :age < 90\n\
//!      and age = :age\n\
//!      --#fi",
//! )?;
//!
//! let hit = template.render(&ArgBag::new().with("age", 45), &Sqlite)?;
//! assert_eq!(hit.sql, "select name from staff where 1 = 1\nand age = ?\n");
//!
//! let miss = template.render(&ArgBag::new(), &Sqlite)?;
//! assert_eq!(miss.sql, "select name from staff where 1 = 1\n");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cache;
mod expr;
mod fragment;
mod parser;
mod pipes;
mod render;

pub use cache::TemplateCache;
pub use expr::evaluate;
pub use fragment::Fragment;
pub use parser::{ParseOptions, DEFAULT_MAX_DEPTH};
pub use render::RenderedSql;

use crate::args::ArgBag;
use crate::dialect::Dialect;
use crate::error::{ParseError, RenderError};

/// A parsed template, ready to render any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    fragments: Vec<Fragment>,
}

impl Template {
    /// Parses `source` with default limits.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        Self::parse_with(source, &ParseOptions::default())
    }

    pub fn parse_with(source: &str, options: &ParseOptions) -> Result<Self, ParseError> {
        Ok(Self {
            fragments: parser::parse(source, options)?,
        })
    }

    /// Renders against `args`, numbering bind markers from 1.
    ///
    /// The template itself is never changed; rendering twice with different
    /// bags gives independent results.
    pub fn render(&self, args: &ArgBag, dialect: &dyn Dialect) -> Result<RenderedSql, RenderError> {
        self.render_from(args, dialect, 1)
    }

    /// Renders with bind markers numbered from `first_ordinal`.
    ///
    /// Lets a caller append a second rendered piece to SQL that already
    /// holds bound parameters, keeping `$n` markers contiguous.
    pub fn render_from(
        &self,
        args: &ArgBag,
        dialect: &dyn Dialect,
        first_ordinal: usize,
    ) -> Result<RenderedSql, RenderError> {
        render::render(&self.fragments, args, dialect, first_ordinal)
    }

    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }
}
