use crate::stylesheet::StyleSheet;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Supplies the units named by `:import` paths.
///
/// Resolution is split in two so a generation pass can memoize by key:
/// `locate` turns an import request into a stable key (two requests for the
/// same unit must produce the same key), and `load` materializes the unit.
/// A unit that cannot be supplied is `None`; imports of it resolve to nothing.
pub trait Resolver {
    fn locate(&self, request: &str, from: Option<&Path>) -> String {
        let _ = from;
        request.to_string()
    }

    fn load(&self, key: &str) -> Option<Arc<StyleSheet>>;
}

/// Resolves nothing. Every import is left unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyResolver;

impl Resolver for EmptyResolver {
    fn load(&self, _key: &str) -> Option<Arc<StyleSheet>> {
        None
    }
}

/// Resolves import paths verbatim against an in-memory table.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    sheets: HashMap<String, Arc<StyleSheet>>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, sheet: StyleSheet) {
        self.sheets.insert(path.into(), Arc::new(sheet));
    }

    pub fn with(mut self, path: impl Into<String>, sheet: StyleSheet) -> Self {
        self.insert(path, sheet);
        self
    }
}

impl<K: Into<String>> FromIterator<(K, StyleSheet)> for MapResolver {
    fn from_iter<I: IntoIterator<Item = (K, StyleSheet)>>(iter: I) -> Self {
        let mut resolver = Self::new();
        for (path, sheet) in iter {
            resolver.insert(path, sheet);
        }
        resolver
    }
}

impl Resolver for MapResolver {
    fn load(&self, key: &str) -> Option<Arc<StyleSheet>> {
        self.sheets.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_resolver_uses_paths_verbatim() {
        let resolver: MapResolver = [("./a.css", StyleSheet::empty("A"))].into_iter().collect();
        let key = resolver.locate("./a.css", Some(Path::new("/somewhere/b.css")));
        assert_eq!(key, "./a.css");
        assert_eq!(resolver.load(&key).map(|s| s.namespace().to_string()), Some("A".into()));
        assert!(resolver.load("./missing.css").is_none());
    }

    #[test]
    fn empty_resolver_resolves_nothing() {
        assert!(EmptyResolver.load("./a.css").is_none());
    }
}
