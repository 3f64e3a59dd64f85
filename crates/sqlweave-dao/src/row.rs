//! Result rows as ordered column/value pairs.

use sqlweave_core::Value;

/// One result row.
///
/// Columns keep the order the database returned them in. Lookups by name
/// take the first match, so aliased duplicate columns stay addressable by
/// position.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    #[must_use]
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Value at a zero-based position.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.columns.get(index).map(|(_, value)| value)
    }

    #[must_use]
    pub fn text(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn int(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn float(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Boolean reading. Integer columns count, since SQLite stores booleans
    /// as 0 and 1.
    #[must_use]
    pub fn bool(&self, column: &str) -> Option<bool> {
        match self.get(column)? {
            Value::Bool(b) => Some(*b),
            Value::Int(n) => Some(*n != 0),
            _ => None,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        Row::new(vec![
            ("id".to_string(), Value::Int(7)),
            ("name".to_string(), Value::Text("bob".to_string())),
            ("active".to_string(), Value::Int(1)),
            ("score".to_string(), Value::Float(2.5)),
            ("note".to_string(), Value::Null),
        ])
    }

    #[test]
    fn test_typed_getters() {
        let row = sample();
        assert_eq!(row.int("id"), Some(7));
        assert_eq!(row.text("name"), Some("bob"));
        assert_eq!(row.bool("active"), Some(true));
        assert_eq!(row.float("score"), Some(2.5));
        assert_eq!(row.float("id"), Some(7.0));
    }

    #[test]
    fn test_mismatched_type_reads_none() {
        let row = sample();
        assert_eq!(row.int("name"), None);
        assert_eq!(row.text("note"), None);
        assert_eq!(row.int("missing"), None);
    }

    #[test]
    fn test_positional_access() {
        let row = sample();
        assert_eq!(row.at(0), Some(&Value::Int(7)));
        assert_eq!(row.at(9), None);
        assert_eq!(row.len(), 5);
    }
}
