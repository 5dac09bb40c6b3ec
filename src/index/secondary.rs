//! Secondary index over one or more columns
//!
//! BTreeMap-based index wrapped in RwLock, mapping the indexed column
//! values of a tuple to the `(primary key, page)` pairs holding them.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::Index;
use crate::error::{Result, StoreError};
use crate::tuple::{Tuple, Value};

/// Location of a tuple as recorded by an index
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Primary key of the indexed tuple
    pub key: Value,
    /// Identity of the page holding it
    pub page: String,
}

/// Column-value index: indexed values → set of tuple locations
pub struct SecondaryIndex {
    name: String,
    columns: Vec<String>,
    entries: RwLock<BTreeMap<Vec<Value>, BTreeSet<IndexEntry>>>,
}

impl SecondaryIndex {
    /// Create an empty index over `columns`
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All locations whose indexed columns equal `values` (in column order)
    pub fn lookup(&self, values: &[Value]) -> Vec<IndexEntry> {
        self.entries
            .read()
            .get(values)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Indexed values currently recorded for a primary key, if any
    pub fn values_for_key(&self, key: &Value) -> Option<Vec<Value>> {
        self.entries
            .read()
            .iter()
            .find(|(_, set)| set.iter().any(|e| &e.key == key))
            .map(|(values, _)| values.clone())
    }

    /// Every entry pointing into `page`
    pub fn entries_for_page(&self, page: &str) -> Vec<IndexEntry> {
        self.entries
            .read()
            .values()
            .flat_map(|set| set.iter().filter(|e| e.page == page).cloned())
            .collect()
    }

    /// Total number of indexed tuples
    pub fn len(&self) -> usize {
        self.entries.read().values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn key_of(&self, tuple: &Tuple) -> Vec<Value> {
        self.columns
            .iter()
            .map(|c| tuple.get(c).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

impl Index for SecondaryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&self, page: &str, tuple: &Tuple) -> Result<()> {
        let values = self.key_of(tuple);
        let entry = IndexEntry {
            key: tuple.primary_key().clone(),
            page: page.to_string(),
        };

        let mut entries = self.entries.write();
        let set = entries.entry(values).or_default();
        if !set.insert(entry) {
            return Err(StoreError::index_sync(
                &self.name,
                format!("duplicate entry for key {} in page {}", tuple.primary_key(), page),
            ));
        }
        Ok(())
    }

    fn remove(&self, page: &str, tuple: &Tuple) -> Result<()> {
        let values = self.key_of(tuple);
        let entry = IndexEntry {
            key: tuple.primary_key().clone(),
            page: page.to_string(),
        };

        let mut entries = self.entries.write();
        let removed = match entries.get_mut(&values) {
            Some(set) => {
                let removed = set.remove(&entry);
                if set.is_empty() {
                    entries.remove(&values);
                }
                removed
            }
            None => false,
        };

        if !removed {
            return Err(StoreError::index_sync(
                &self.name,
                format!("no entry for key {} in page {}", tuple.primary_key(), page),
            ));
        }
        Ok(())
    }
}
