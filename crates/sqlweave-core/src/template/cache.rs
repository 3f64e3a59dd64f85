//! Read-mostly cache for parsed templates.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::ParseError;
use crate::template::{ParseOptions, Template};

/// Caches parse results keyed by statement name.
///
/// Lookups take a read lock; only a miss or an invalidation takes the
/// write lock. Entries are shared as `Arc<Template>` so render never
/// holds the lock.
#[derive(Debug, Default)]
pub struct TemplateCache {
    options: ParseOptions,
    entries: RwLock<HashMap<String, Arc<Template>>>,
}

impl TemplateCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: ParseOptions) -> Self {
        Self {
            options,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached template for `key`, parsing `source` on a miss.
    ///
    /// Parse failures are reported with the key attached and are not
    /// cached, so a corrected source can be retried under the same key.
    pub fn get_or_parse(&self, key: &str, source: &str) -> Result<Arc<Template>, ParseError> {
        if let Some(found) = self.read().get(key) {
            return Ok(Arc::clone(found));
        }
        debug!(key, "template cache miss");
        let parsed = Template::parse_with(source, &self.options)
            .map_err(|err| err.in_template(key))?;
        let template = Arc::new(parsed);
        self.write().insert(key.to_string(), Arc::clone(&template));
        Ok(template)
    }

    /// Drops the entry for `key`, forcing a re-parse on next use.
    pub fn invalidate(&self, key: &str) {
        self.write().remove(key);
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Template>>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Template>>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_returns_same_template() {
        let cache = TemplateCache::new();
        let first = cache.get_or_parse("q", "select :a").unwrap();
        let second = cache.get_or_parse("q", "ignored on a hit").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_forces_reparse() {
        let cache = TemplateCache::new();
        let first = cache.get_or_parse("q", "select :a").unwrap();
        cache.invalidate("q");
        let second = cache.get_or_parse("q", "select :b").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_parse_failure_names_the_key() {
        let cache = TemplateCache::new();
        let err = cache.get_or_parse("broken", "--#fi").unwrap_err();
        assert!(err.to_string().contains("broken"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_empties_the_cache() {
        let cache = TemplateCache::new();
        cache.get_or_parse("a", "select 1").unwrap();
        cache.get_or_parse("b", "select 2").unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
