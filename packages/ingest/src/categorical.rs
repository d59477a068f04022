//! Shared storage for low-cardinality text columns.
//!
//! States, cities, and weather conditions repeat across hundreds of
//! thousands of rows. Interning hands every record a clone of one
//! [`Arc<str>`] per distinct value instead of a fresh allocation.

use std::collections::BTreeSet;
use std::sync::Arc;

/// Deduplicates string values into shared handles.
#[derive(Debug, Default)]
pub struct CategoryInterner {
    values: BTreeSet<Arc<str>>,
}

impl CategoryInterner {
    /// Creates an empty interner.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeSet::new(),
        }
    }

    /// Returns the shared handle for `value`, allocating it on first use.
    pub fn intern(&mut self, value: &str) -> Arc<str> {
        if let Some(existing) = self.values.get(value) {
            return Arc::clone(existing);
        }
        let handle: Arc<str> = Arc::from(value);
        self.values.insert(Arc::clone(&handle));
        handle
    }

    /// Number of distinct values seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no values have been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
