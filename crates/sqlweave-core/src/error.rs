//! Error types for the core engines.
//!
//! Parse-time problems surface as [`ParseError`], render-time problems as
//! [`RenderError`], and structurally invalid predicate builders as
//! [`DslError`]. A template that parsed cleanly can still fail to render
//! when an expression or pipe inside it is wrong.

use std::fmt;

use thiserror::Error;

/// Error raised while parsing template source into a fragment tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// 1-based line in the template source.
    pub line: usize,
    /// Name of the registered template, when parsed through a catalog.
    pub template: Option<String>,
}

impl ParseError {
    /// Creates an error anchored at `line`.
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
            template: None,
        }
    }

    /// Attaches the name of the template the error came from.
    #[must_use]
    pub fn in_template(mut self, name: &str) -> Self {
        self.template = Some(name.to_string());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.template {
            Some(name) => write!(
                f,
                "parse error in `{name}` at line {}: {}",
                self.line, self.message
            ),
            None => write!(f, "parse error at line {}: {}", self.line, self.message),
        }
    }
}

impl std::error::Error for ParseError {}

/// Error raised while rendering a parsed template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A conditional expression was malformed or used an operator its
    /// operands do not support.
    #[error("expression `{expr}` failed: {reason}")]
    Expression { expr: String, reason: String },
    /// A placeholder referenced a pipe that is not registered.
    #[error("unknown pipe `{0}`")]
    UnknownPipe(String),
    /// A registered pipe rejected its input.
    #[error("pipe `{name}` failed: {reason}")]
    Pipe { name: String, reason: String },
}

/// Error raised when a predicate builder is structurally invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DslError {
    /// An `in` predicate was built over an empty list.
    #[error("`in` predicate on `{0}` given an empty list")]
    EmptyInList(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("unexpected `--#fi`", 4);
        assert_eq!(err.to_string(), "parse error at line 4: unexpected `--#fi`");
    }

    #[test]
    fn test_parse_error_with_template_name() {
        let err = ParseError::new("bad pipe", 2).in_template("users.find");
        assert_eq!(
            err.to_string(),
            "parse error in `users.find` at line 2: bad pipe"
        );
    }

    #[test]
    fn test_render_error_display() {
        let err = RenderError::UnknownPipe("shout".to_string());
        assert_eq!(err.to_string(), "unknown pipe `shout`");
    }
}
