//! The argument bag: named values handed to templates and predicates.

use crate::value::{ToValue, Value};

/// Insertion-ordered collection of named arguments.
///
/// Lookup is by name; insertion order is irrelevant for rendering but
/// preserved so diagnostics and logs stay readable. `set` replaces an
/// existing entry in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgBag {
    entries: Vec<(String, Value)>,
}

impl ArgBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an argument.
    pub fn set(&mut self, name: impl Into<String>, value: impl ToValue) {
        let name = name.into();
        let value = value.to_value();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Chainable [`ArgBag::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl ToValue) -> Self {
        self.set(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Merges `other` into this bag, replacing duplicate names.
    pub fn extend(&mut self, other: Self) {
        for (name, value) in other.entries {
            self.set(name, value);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Builds a bag from a JSON object. `None` when `json` is not an object.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        let object = json.as_object()?;
        let mut bag = Self::new();
        for (name, value) in object {
            bag.set(name.clone(), Value::from(value));
        }
        Some(bag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut bag = ArgBag::new();
        bag.set("a", 1);
        bag.set("b", 2);
        bag.set("a", 3);
        let names: Vec<&str> = bag.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(bag.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_extend_merges_and_replaces() {
        let mut bag = ArgBag::new().with("a", 1).with("b", 2);
        bag.extend(ArgBag::new().with("b", 20).with("c", 30));
        assert_eq!(bag.len(), 3);
        assert_eq!(bag.get("b"), Some(&Value::Int(20)));
    }

    #[test]
    fn test_from_json_object() {
        let json = serde_json::json!({"name": "bob", "age": 45, "tags": []});
        let bag = ArgBag::from_json(&json).expect("object");
        assert_eq!(bag.get("name"), Some(&Value::Text("bob".to_string())));
        assert_eq!(bag.get("age"), Some(&Value::Int(45)));
        assert_eq!(bag.get("tags"), Some(&Value::List(Vec::new())));
        assert!(ArgBag::from_json(&serde_json::json!(42)).is_none());
    }
}
