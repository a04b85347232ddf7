//! Menu catalog trait

use crate::menu::{CatalogEntry, FuzzyMatch, MenuItem, OptionsSchema};
use crate::Result;

/// Read-only menu catalog
///
/// Lookups are synchronous; implementations are expected to keep the menu in
/// memory and be shared across sessions behind an `Arc`.
pub trait MenuCatalog: Send + Sync {
    /// Exact (case-insensitive) lookup, `Error::CatalogMiss` otherwise
    fn lookup(&self, name: &str) -> Result<MenuItem>;

    /// Best-scoring item for an approximate name.
    ///
    /// Returns the match with its similarity score; callers apply their own
    /// acceptance threshold. `Error::CatalogMiss` when nothing scores above 0.
    fn lookup_fuzzy(&self, name: &str) -> Result<FuzzyMatch>;

    /// Every item on the menu
    fn all_items(&self) -> Vec<CatalogEntry>;

    /// Required and optional option categories of an item
    fn options_schema(&self, name: &str) -> Result<OptionsSchema> {
        self.lookup(name).map(|item| item.schema())
    }

    /// Item names, in menu order
    fn names(&self) -> Vec<String> {
        self.all_items().into_iter().map(|e| e.name).collect()
    }
}
