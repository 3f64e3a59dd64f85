//! Parameter values shared by every engine in the crate.

use chrono::NaiveDateTime;

/// A parameter value carried in an argument bag and bound at execution time.
///
/// `Ignore` is the suppression sentinel: a placeholder resolving to it is
/// dropped by the renderer together with its bind marker, and a predicate
/// built on it is omitted by the `Where` builder. It is the one mechanism
/// for switching an optional filter off.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    DateTime(NaiveDateTime),
    /// A collection, expanded to one bind marker per element.
    List(Vec<Value>),
    /// Suppression sentinel, never bound.
    Ignore,
}

impl Value {
    /// True for `Null` and `Ignore`.
    #[must_use]
    pub const fn is_null_like(&self) -> bool {
        matches!(self, Self::Null | Self::Ignore)
    }

    /// True for `Null`, `Ignore`, empty text and empty lists.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null | Self::Ignore => true,
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// The value as an `i64`, if it is one.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Text form used by pipes and string comparisons. `None` for values
    /// with no sensible text rendering (null-likes, blobs, lists).
    #[must_use]
    pub fn text_form(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            _ => None,
        }
    }

    /// Numeric form used by comparisons. Text parses leniently.
    #[must_use]
    pub fn numeric_form(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Builds a `List` from anything convertible.
    pub fn list<V: ToValue>(items: impl IntoIterator<Item = V>) -> Self {
        Self::List(items.into_iter().map(ToValue::to_value).collect())
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(0.0)), Self::Int),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            serde_json::Value::Array(items) => Self::List(items.iter().map(Self::from).collect()),
            serde_json::Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

/// Conversion into a [`Value`], implemented for the usual suspects.
pub trait ToValue {
    fn to_value(self) -> Value;
}

impl ToValue for Value {
    fn to_value(self) -> Value {
        self
    }
}

impl ToValue for bool {
    fn to_value(self) -> Value {
        Value::Bool(self)
    }
}

impl ToValue for i32 {
    fn to_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl ToValue for i64 {
    fn to_value(self) -> Value {
        Value::Int(self)
    }
}

impl ToValue for u32 {
    fn to_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl ToValue for f32 {
    fn to_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl ToValue for f64 {
    fn to_value(self) -> Value {
        Value::Float(self)
    }
}

impl ToValue for String {
    fn to_value(self) -> Value {
        Value::Text(self)
    }
}

impl ToValue for &str {
    fn to_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(self) -> Value {
        Value::Blob(self)
    }
}

impl ToValue for &[u8] {
    fn to_value(self) -> Value {
        Value::Blob(self.to_vec())
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(self) -> Value {
        Value::DateTime(self)
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(self) -> Value {
        self.map_or(Value::Null, ToValue::to_value)
    }
}
