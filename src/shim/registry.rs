//! Dotted-path registry with exact and prefix keys
//!
//! A key ending in `.` is a *prefix* key and answers for every name that
//! starts with it; any other key only answers for itself. Exact keys always
//! win, and among matching prefixes the longest one wins, so
//! `edx.ui.lms.sequence.` beats `edx.ui.lms.` for
//! `edx.ui.lms.sequence.tab_selected`.

use std::collections::BTreeMap;
use thiserror::Error;

/// Separator between hierarchical name segments
pub const SEPARATOR: char = '.';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Key {0} not found in registry")]
    NotFound(String),
}

/// Mapping from dotted names or name prefixes to handlers
#[derive(Debug, Clone)]
pub struct PrefixRegistry<H> {
    exact: BTreeMap<String, H>,
    prefixes: BTreeMap<String, H>,
}

impl<H> Default for PrefixRegistry<H> {
    fn default() -> Self {
        Self {
            exact: BTreeMap::new(),
            prefixes: BTreeMap::new(),
        }
    }
}

impl<H> PrefixRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_prefix(key: &str) -> bool {
        key.ends_with(SEPARATOR)
    }

    /// Store a handler, returning the one previously stored under `key`
    pub fn set(&mut self, key: impl Into<String>, handler: H) -> Option<H> {
        let key = key.into();
        if Self::is_prefix(&key) {
            self.prefixes.insert(key, handler)
        } else {
            self.exact.insert(key, handler)
        }
    }

    /// Resolve `key` to its most specific handler
    pub fn get(&self, key: &str) -> Result<&H, RegistryError> {
        self.lookup(key)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    /// Resolve `key`, returning `None` on a miss
    pub fn lookup(&self, key: &str) -> Option<&H> {
        if let Some(handler) = self.exact.get(key) {
            return Some(handler);
        }
        self.matching_prefix(key).map(|(_, handler)| handler)
    }

    /// The longest registered prefix that `key` starts with.
    ///
    /// Matching prefixes of one key are nested, so length alone decides;
    /// the lexicographic comparison only keeps the choice total.
    pub fn matching_prefix(&self, key: &str) -> Option<(&str, &H)> {
        self.prefixes
            .iter()
            .filter(|(prefix, _)| key.starts_with(prefix.as_str()))
            .max_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
            .map(|(prefix, handler)| (prefix.as_str(), handler))
    }

    /// Remove the handler stored under exactly `key`
    pub fn remove(&mut self, key: &str) -> Result<H, RegistryError> {
        let table = if Self::is_prefix(key) {
            &mut self.prefixes
        } else {
            &mut self.exact
        };
        table
            .remove(key)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    /// Whether `key` resolves to any handler
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Whether `key` itself is stored, as opposed to merely resolving
    pub fn is_registered(&self, key: &str) -> bool {
        if Self::is_prefix(key) {
            self.prefixes.contains_key(key)
        } else {
            self.exact.contains_key(key)
        }
    }

    /// Exact keys followed by prefix keys, each group sorted
    pub fn keys(&self) -> Vec<&str> {
        self.exact
            .keys()
            .chain(self.prefixes.keys())
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty()
    }
}

impl<K: Into<String>, H> Extend<(K, H)> for PrefixRegistry<H> {
    fn extend<I: IntoIterator<Item = (K, H)>>(&mut self, iter: I) {
        for (key, handler) in iter {
            self.set(key, handler);
        }
    }
}

impl<K: Into<String>, H> FromIterator<(K, H)> for PrefixRegistry<H> {
    fn from_iter<I: IntoIterator<Item = (K, H)>>(iter: I) -> Self {
        let mut registry = Self::new();
        registry.extend(iter);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registry() -> PrefixRegistry<&'static str> {
        [
            ("edx.ui.lms.", "lms"),
            ("edx.ui.lms.sequence.", "sequence"),
            ("edx.ui.lms.sequence.tab_selected", "tab"),
            ("edx.video.", "video"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_keys_ending_in_separator_are_prefixes() {
        let registry = registry();
        assert_eq!(registry.get("edx.video.played"), Ok(&"video"));
        assert_eq!(registry.get("edx.video.transcript.shown"), Ok(&"video"));
        // A prefix does not answer for the bare name without its separator
        assert!(registry.get("edx.video").is_err());
    }

    #[test]
    fn test_exact_match_wins_over_prefix() {
        let registry = registry();
        assert_eq!(registry.get("edx.ui.lms.sequence.tab_selected"), Ok(&"tab"));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let registry = registry();
        assert_eq!(registry.get("edx.ui.lms.sequence.next_selected"), Ok(&"sequence"));
        assert_eq!(registry.get("edx.ui.lms.outline.selected"), Ok(&"lms"));
    }

    #[test]
    fn test_longest_prefix_wins_when_lexicographic_order_disagrees() {
        // "edx.b." sorts after "edx.a.c." but only one of them matches
        let registry: PrefixRegistry<u8> =
            [("edx.", 0), ("edx.b.", 1), ("edx.a.c.", 2), ("edx.a.", 3)].into_iter().collect();

        assert_eq!(registry.get("edx.a.c.d"), Ok(&2));
        assert_eq!(registry.get("edx.a.z"), Ok(&3));
        assert_eq!(registry.get("edx.b.x"), Ok(&1));
        assert_eq!(registry.get("edx.zzz"), Ok(&0));
    }

    #[test]
    fn test_miss_is_not_found() {
        let registry = registry();
        assert_eq!(
            registry.get("edx.course.enrollment.activated"),
            Err(RegistryError::NotFound("edx.course.enrollment.activated".to_string()))
        );
        assert!(!registry.contains("edx.course.enrollment.activated"));
        assert_eq!(registry.lookup("problem_check"), None);
    }

    #[test]
    fn test_set_replaces_existing_handler() {
        let mut registry = registry();
        assert_eq!(registry.set("edx.video.", "replacement"), Some("video"));
        assert_eq!(registry.get("edx.video.played"), Ok(&"replacement"));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_remove() {
        let mut registry = registry();
        assert_eq!(registry.remove("edx.ui.lms.sequence.tab_selected"), Ok("tab"));
        assert_eq!(registry.get("edx.ui.lms.sequence.tab_selected"), Ok(&"sequence"));

        assert_eq!(registry.remove("edx.ui.lms.sequence."), Ok("sequence"));
        assert_eq!(registry.get("edx.ui.lms.sequence.tab_selected"), Ok(&"lms"));

        // Removing a prefix key needs the exact stored form
        assert!(registry.remove("edx.ui.lms").is_err());
    }

    #[test]
    fn test_contains_versus_is_registered() {
        let registry = registry();
        assert!(registry.contains("edx.video.played"));
        assert!(!registry.is_registered("edx.video.played"));
        assert!(registry.is_registered("edx.video."));
    }

    #[test]
    fn test_keys_lists_exact_then_prefix() {
        let registry = registry();
        assert_eq!(
            registry.keys(),
            vec![
                "edx.ui.lms.sequence.tab_selected",
                "edx.ui.lms.",
                "edx.ui.lms.sequence.",
                "edx.video.",
            ]
        );
        assert!(!registry.is_empty());
        assert!(PrefixRegistry::<u8>::new().is_empty());
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-c]{1,2}"
    }

    proptest! {
        #[test]
        fn prop_most_specific_prefix_resolves(
            segments in prop::collection::vec(segment(), 2..6),
            registered in prop::collection::vec(any::<bool>(), 5),
        ) {
            // Register some of the prefixes along the path of `name`
            let name = segments.join(".");
            let mut registry = PrefixRegistry::new();
            let mut expected = None;
            for depth in 1..segments.len() {
                if registered[depth - 1] {
                    let prefix = format!("{}.", segments[..depth].join("."));
                    registry.set(prefix.clone(), prefix.clone());
                    expected = Some(prefix);
                }
            }
            // Noise that never matches `name`
            registry.set("zz.", "zz.".to_string());

            prop_assert_eq!(registry.lookup(&name).cloned(), expected);
        }

        #[test]
        fn prop_exact_always_outranks_prefix(segments in prop::collection::vec(segment(), 2..5)) {
            let name = segments.join(".");
            let mut registry = PrefixRegistry::new();
            for depth in 1..segments.len() {
                registry.set(format!("{}.", segments[..depth].join(".")), "prefix");
            }
            registry.set(name.clone(), "exact");

            prop_assert_eq!(registry.get(&name), Ok(&"exact"));
        }
    }
}
