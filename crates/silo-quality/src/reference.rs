//! Reference key resolution for custom (referential) rules.

use crate::error::{QualityError, QualityResult};
use std::collections::{HashMap, HashSet};

/// Supplies the known key set for a reference table/column.
///
/// The warehouse implements this over its dimension tables; tests use
/// [`InMemoryReferences`]. A custom rule passes only when every checked
/// value exists in the resolved set.
pub trait ReferenceResolver {
    fn resolve_keys(&self, table: &str, column: &str) -> QualityResult<HashSet<String>>;
}

/// Fixed in-memory reference sets, keyed by `(table, column)`.
#[derive(Debug, Default)]
pub struct InMemoryReferences {
    sets: HashMap<(String, String), HashSet<String>>,
}

impl InMemoryReferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the key set for a reference column.
    pub fn insert<I, S>(&mut self, table: &str, column: &str, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sets.insert(
            (table.to_string(), column.to_string()),
            keys.into_iter().map(Into::into).collect(),
        );
    }
}

impl ReferenceResolver for InMemoryReferences {
    fn resolve_keys(&self, table: &str, column: &str) -> QualityResult<HashSet<String>> {
        self.sets
            .get(&(table.to_string(), column.to_string()))
            .cloned()
            .ok_or_else(|| QualityError::Reference {
                table: table.to_string(),
                column: column.to_string(),
                reason: "no reference set registered".to_string(),
            })
    }
}
