//! Process-wide catalog holder.
//!
//! [`CatalogStore`] is passed explicitly to whoever needs the catalog. It
//! loads the file on first use and hands out cheap [`Arc`] clones; tests
//! inject a catalog with [`CatalogStore::with_catalog`] or force a reload
//! with [`CatalogStore::clear`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::catalog::Catalog;

/// Lazily-loaded, resettable catalog.
#[derive(Debug)]
pub struct CatalogStore {
    path: Option<PathBuf>,
    slot: RwLock<Option<Arc<Catalog>>>,
}

impl CatalogStore {
    /// Store that loads from `path` on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            slot: RwLock::new(None),
        }
    }

    /// Store pre-populated with `catalog`. After [`clear`](Self::clear) it
    /// yields an empty catalog, since there is no file to reload.
    #[must_use]
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            path: None,
            slot: RwLock::new(Some(Arc::new(catalog))),
        }
    }

    /// The catalog, loading it if this is the first call since creation or
    /// the last [`clear`](Self::clear).
    pub fn get(&self) -> Arc<Catalog> {
        if let Some(catalog) = self.slot.read().as_ref() {
            return Arc::clone(catalog);
        }

        let mut slot = self.slot.write();
        // another caller may have loaded while we waited for the write lock
        if let Some(catalog) = slot.as_ref() {
            return Arc::clone(catalog);
        }
        let catalog = Arc::new(
            self.path
                .as_deref()
                .map_or_else(Catalog::empty, Catalog::load),
        );
        *slot = Some(Arc::clone(&catalog));
        catalog
    }

    /// Drop the loaded catalog; the next [`get`](Self::get) reloads it.
    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    /// Whether a catalog is currently loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }

    /// File this store loads from, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RuleCategory, RuleDescriptor};

    const ONE_RULE: &str = r#"{"rules": {"base": [{"path": "base/a.md"}]}}"#;
    const TWO_RULES: &str =
        r#"{"rules": {"base": [{"path": "base/a.md"}, {"path": "base/b.md"}]}}"#;

    #[test]
    fn loads_lazily_once() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("catalog.json");
        std::fs::write(&file, ONE_RULE).unwrap();

        let store = CatalogStore::new(&file);
        assert!(!store.is_loaded());
        assert_eq!(store.get().len(), 1);
        assert!(store.is_loaded());

        // file changes are not observed until clear()
        std::fs::write(&file, TWO_RULES).unwrap();
        assert_eq!(store.get().len(), 1);
    }

    #[test]
    fn clear_forces_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("catalog.json");
        std::fs::write(&file, ONE_RULE).unwrap();

        let store = CatalogStore::new(&file);
        assert_eq!(store.get().len(), 1);
        std::fs::write(&file, TWO_RULES).unwrap();
        store.clear();
        assert!(!store.is_loaded());
        assert_eq!(store.get().len(), 2);
    }

    #[test]
    fn injected_catalog() {
        let catalog = Catalog::new(vec![RuleDescriptor::new("x.md", RuleCategory::Base, None)]);
        let store = CatalogStore::with_catalog(catalog);
        assert!(store.is_loaded());
        assert!(store.get().contains("x.md"));
        assert!(store.path().is_none());

        store.clear();
        assert!(store.get().is_empty());
    }

    #[test]
    fn missing_file_yields_empty() {
        let store = CatalogStore::new("/nonexistent/rulecast/catalog.json");
        assert!(store.get().is_empty());
    }

    #[test]
    fn shared_arc() {
        let store = CatalogStore::with_catalog(Catalog::empty());
        let a = store.get();
        let b = store.get();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
