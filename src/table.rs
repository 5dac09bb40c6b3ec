//! Table Module
//!
//! Owns the ordered page directory and the registered indices, and hands
//! pages the owner context they report into.
//!
//! ## Responsibilities
//! - Validate and construct tuples through the schema
//! - Choose the page that receives an insert; split full pages
//! - Drop pages that were destroyed by a delete
//! - Route point lookups through the page bounds
//! - Create and back-fill secondary indices
//!
//! ## Page Directory
//! ```text
//!  pages[0]          pages[1]          pages[2]
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │ min..=max   │ < │ min..=max   │ < │ min..=max   │
//! └─────────────┘   └─────────────┘   └─────────────┘
//! ```
//! Every key of `pages[i]` is smaller than every key of `pages[i + 1]`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::index::{Index, SecondaryIndex};
use crate::page::search::{self, CompareOp, Constraint, LogicalOp};
use crate::page::{Page, PageOwner};
use crate::storage::PageStore;
use crate::tuple::{ColumnValues, Schema, Tuple, Value};

/// Persisted definition of a secondary index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
}

/// Everything needed to reopen a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCatalog {
    pub schema: Schema,
    /// Page identities in key order
    pub pages: Vec<String>,
    pub indices: Vec<IndexDef>,
    pub next_page_id: u64,
}

/// The part of a table that pages see
///
/// Kept apart from the page directory so a page can be mutated while the
/// context is borrowed.
pub struct TableContext {
    schema: Schema,
    indices: Vec<Arc<dyn Index>>,
    store: Arc<dyn PageStore>,
}

impl PageOwner for TableContext {
    fn name(&self) -> &str {
        self.schema.table()
    }

    fn indices(&self) -> &[Arc<dyn Index>] {
        &self.indices
    }

    fn build_tuple(&self, values: &ColumnValues) -> Result<Tuple> {
        self.schema.build_tuple(values)
    }

    fn store(&self) -> &dyn PageStore {
        self.store.as_ref()
    }
}

/// A clustered table: pages sorted by primary key plus secondary indices
///
/// ## Concurrency
/// `Table` is not synchronized; wrap it in a lock to share it (the
/// `Database` keeps each table behind a `Mutex`).
pub struct Table {
    context: TableContext,

    /// Capacity given to every page created from now on
    page_capacity: usize,

    /// Pages in ascending key order; none of them is empty
    pages: Vec<Page>,

    /// Secondary indices by name (also registered in `context.indices`)
    secondary: BTreeMap<String, Arc<SecondaryIndex>>,

    next_page_id: u64,

    /// Bumped whenever the catalog (page list, indices) changes
    version: u64,
}

impl Table {
    /// Create an empty table
    pub fn new(schema: Schema, store: Arc<dyn PageStore>, page_capacity: usize) -> Self {
        Self {
            context: TableContext {
                schema,
                indices: Vec::new(),
                store,
            },
            page_capacity,
            pages: Vec::new(),
            secondary: BTreeMap::new(),
            next_page_id: 0,
            version: 0,
        }
    }

    /// Reopen a table from its catalog
    ///
    /// Pages are loaded from the store and secondary indices rebuilt from
    /// their contents.
    pub fn open(catalog: TableCatalog, store: Arc<dyn PageStore>, page_capacity: usize) -> Result<Self> {
        let mut table = Self::new(catalog.schema, store, page_capacity);
        table.next_page_id = catalog.next_page_id;

        for name in &catalog.pages {
            let page = Page::load(&table.context, name)?;
            table.pages.push(page);
        }

        for def in catalog.indices {
            table.create_index(&def.name, def.columns)?;
        }

        table.version = 0;
        info!(
            table = table.name(),
            pages = table.pages.len(),
            tuples = table.len(),
            "table opened"
        );
        Ok(table)
    }

    /// Snapshot of the catalog for persistence
    pub fn catalog(&self) -> TableCatalog {
        TableCatalog {
            schema: self.context.schema.clone(),
            pages: self.pages.iter().map(|p| p.name().to_string()).collect(),
            indices: self
                .secondary
                .iter()
                .map(|(name, index)| IndexDef {
                    name: name.clone(),
                    columns: index.columns().to_vec(),
                })
                .collect(),
            next_page_id: self.next_page_id,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        self.context.schema.table()
    }

    pub fn schema(&self) -> &Schema {
        &self.context.schema
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_capacity(&self) -> usize {
        self.page_capacity
    }

    /// Total number of tuples
    pub fn len(&self) -> usize {
        self.pages.iter().map(Page::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Secondary index by name
    pub fn index(&self, name: &str) -> Option<Arc<SecondaryIndex>> {
        self.secondary.get(name).cloned()
    }

    /// Catalog version; changes whenever pages or indices are added/removed
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Point lookup by primary key
    pub fn get(&self, key: &Value) -> Option<&Tuple> {
        let page = self.pages.get(self.page_for_key(key))?;
        page.get(key)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a row
    ///
    /// Fails with `InvalidTuple` if the row does not fit the schema or its
    /// primary key already exists.
    pub fn insert(&mut self, values: &ColumnValues) -> Result<()> {
        let tuple = self.context.schema.build_tuple(values)?;
        let key = tuple.primary_key().clone();

        if self.get(&key).is_some() {
            return Err(StoreError::InvalidTuple(format!(
                "duplicate primary key {} in '{}'",
                key,
                self.name()
            )));
        }

        let result = match self.make_room(&key) {
            Ok(target) => self.pages[target].insert(&self.context, tuple),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            // a page opened for this insert may have been left empty
            self.discard_empty_pages();
            return Err(err);
        }
        Ok(())
    }

    /// Delete every row matching all `constraints` (equality); returns the count
    pub fn delete(&mut self, constraints: &ColumnValues) -> Result<usize> {
        let checked = self.context.schema.validate_partial(constraints)?;
        let primary_key = self.context.schema.primary_key().to_string();

        let candidates: Vec<usize> = match checked.get(&primary_key) {
            Some(key) => {
                let index = self.page_for_key(key);
                if index < self.pages.len() {
                    vec![index]
                } else {
                    Vec::new()
                }
            }
            None => (0..self.pages.len()).rev().collect(),
        };

        let mut deleted = 0;
        for index in candidates {
            let keys: Vec<Value> = self.pages[index]
                .linear_search(&checked)
                .iter()
                .map(|t| t.primary_key().clone())
                .collect();

            for key in keys {
                let result = self.pages[index].delete(&self.context, &key);
                if let Err(err) = result {
                    self.drop_destroyed(index);
                    return Err(err);
                }
                deleted += 1;
            }
            self.drop_destroyed(index);
        }

        debug!(table = self.name(), deleted, "rows deleted");
        Ok(deleted)
    }

    /// Update the row with primary key `key`
    ///
    /// Changing the primary key re-homes the row (delete + insert) so the
    /// page directory stays ordered.
    pub fn update(&mut self, key: &Value, values: &ColumnValues) -> Result<()> {
        let checked = self.context.schema.validate_partial(values)?;
        let index = self.page_for_key(key);
        let old = self
            .pages
            .get(index)
            .and_then(|p| p.get(key))
            .cloned()
            .ok_or_else(|| StoreError::KeyNotFound(format!("{} in '{}'", key, self.name())))?;

        let primary_key = self.context.schema.primary_key();
        let new_key = checked.get(primary_key).filter(|k| *k != key).cloned();

        match new_key {
            None => self.pages[index].update(&self.context, key, &checked),
            Some(new_key) => {
                if self.get(&new_key).is_some() {
                    return Err(StoreError::InvalidTuple(format!(
                        "duplicate primary key {} in '{}'",
                        new_key,
                        self.name()
                    )));
                }

                let mut merged = old.to_values();
                merged.extend(checked);
                // validate the whole row before removing anything
                self.context.schema.build_tuple(&merged)?;

                let result = self.pages[index].delete(&self.context, key);
                self.drop_destroyed(index);
                result?;

                if let Err(err) = self.insert(&merged) {
                    if let Err(undo) = self.insert(&old.to_values()) {
                        warn!(table = self.name(), key = %key, error = %undo, "failed to restore row");
                    }
                    return Err(err);
                }
                Ok(())
            }
        }
    }

    /// Create a secondary index over `columns` and back-fill it
    pub fn create_index(&mut self, name: &str, columns: Vec<String>) -> Result<()> {
        if self.secondary.contains_key(name) {
            return Err(StoreError::IndexExists(name.to_string()));
        }
        if columns.is_empty() {
            return Err(StoreError::InvalidTuple(format!(
                "index '{}' needs at least one column",
                name
            )));
        }
        if let Some(column) = columns.iter().find(|c| self.context.schema.column(c).is_none()) {
            return Err(StoreError::InvalidTuple(format!(
                "column '{}' does not exist in '{}'",
                column,
                self.name()
            )));
        }

        let index = Arc::new(SecondaryIndex::new(name, columns));
        self.register_index(index.clone())?;
        self.secondary.insert(name.to_string(), index);
        self.version += 1;

        info!(table = self.name(), index = name, "secondary index created");
        Ok(())
    }

    /// Register an arbitrary index, back-filling it from every page
    ///
    /// Only indices created through `create_index` are recorded in the
    /// catalog.
    pub fn register_index(&mut self, index: Arc<dyn Index>) -> Result<()> {
        for page in &self.pages {
            for tuple in page.tuples() {
                index.add(page.name(), tuple)?;
            }
        }
        self.context.indices.push(index);
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Rows satisfying `constraints` combined with `op`, in key order
    ///
    /// Uses the primary key or a secondary index when every column of it is
    /// pinned by an equality under `And`; otherwise scans every page.
    pub fn select(&self, constraints: &[Constraint], op: LogicalOp) -> Result<Vec<Tuple>> {
        let constraints: Vec<Constraint> = constraints
            .iter()
            .map(|c| {
                let value = self.context.schema.coerce_for_column(&c.column, &c.value)?;
                Ok(Constraint::new(c.column.clone(), c.op, value))
            })
            .collect::<Result<_>>()?;
        let constraints = constraints.as_slice();

        if op == LogicalOp::And {
            let pinned: ColumnValues = constraints
                .iter()
                .filter(|c| c.op == CompareOp::Eq)
                .map(|c| (c.column.clone(), c.value.clone()))
                .collect();

            if let Some(key) = pinned.get(self.context.schema.primary_key()) {
                return Ok(self
                    .get(key)
                    .filter(|t| search::matches(t, constraints, op))
                    .cloned()
                    .into_iter()
                    .collect());
            }

            for index in self.secondary.values() {
                let values: Option<Vec<Value>> =
                    index.columns().iter().map(|c| pinned.get(c).cloned()).collect();
                if let Some(values) = values {
                    debug!(table = self.name(), index = index.name(), "select via index");
                    let mut found: Vec<Tuple> = index
                        .lookup(&values)
                        .into_iter()
                        .filter_map(|entry| self.get(&entry.key).cloned())
                        .filter(|t| search::matches(t, constraints, op))
                        .collect();
                    found.sort_by(|a, b| a.primary_key().cmp(b.primary_key()));
                    return Ok(found);
                }
            }
        }

        Ok(self
            .pages
            .iter()
            .flat_map(|p| p.select(constraints, op))
            .collect())
    }

    /// Check ordering, bounds, capacity and secondary-index mirroring
    pub fn verify(&self) -> Result<()> {
        let mut previous: Option<&Value> = None;
        for page in &self.pages {
            if page.is_empty() || page.is_destroyed() {
                return Err(StoreError::Corruption(format!(
                    "empty page {} left in directory",
                    page.name()
                )));
            }
            if page.size() > page.capacity() {
                return Err(StoreError::Corruption(format!(
                    "page {} exceeds its capacity",
                    page.name()
                )));
            }
            for tuple in page.tuples() {
                let key = tuple.primary_key();
                if previous.map_or(false, |p| p >= key) {
                    return Err(StoreError::Corruption(format!(
                        "key {} out of order in page {}",
                        key,
                        page.name()
                    )));
                }
                previous = Some(key);
            }
            if page.min_key() != page.tuples().first().map(Tuple::primary_key)
                || page.max_key() != page.tuples().last().map(Tuple::primary_key)
            {
                return Err(StoreError::Corruption(format!(
                    "page {} has stale key bounds",
                    page.name()
                )));
            }
        }

        for index in self.secondary.values() {
            if index.len() != self.len() {
                return Err(StoreError::Corruption(format!(
                    "index '{}' holds {} entries for {} tuples",
                    index.name(),
                    index.len(),
                    self.len()
                )));
            }
            for page in &self.pages {
                for tuple in page.tuples() {
                    let values: Vec<Value> = index
                        .columns()
                        .iter()
                        .map(|c| tuple.get(c).cloned().unwrap_or(Value::Null))
                        .collect();
                    let mirrored = index
                        .lookup(&values)
                        .iter()
                        .any(|e| &e.key == tuple.primary_key() && e.page == page.name());
                    if !mirrored {
                        return Err(StoreError::Corruption(format!(
                            "index '{}' has no entry for key {} in page {}",
                            index.name(),
                            tuple.primary_key(),
                            page.name()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Index of the first page whose max key is ≥ `key` (may be `len`)
    fn page_for_key(&self, key: &Value) -> usize {
        self.pages
            .partition_point(|p| p.max_key().map_or(true, |max| max < key))
    }

    /// Make sure some page can take `key` and return its index
    ///
    /// Full pages are never overfilled: the new key goes to a neighbour, to
    /// a fresh page, or the page's last tuple is shifted out first.
    fn make_room(&mut self, key: &Value) -> Result<usize> {
        if self.pages.is_empty() {
            return self.add_page(0);
        }

        let target = self.page_for_key(key).min(self.pages.len() - 1);
        if !self.pages[target].is_full() {
            return Ok(target);
        }

        let page = &self.pages[target];
        let above = page.max_key().map_or(true, |max| key > max);
        let below = page.min_key().map_or(false, |min| key < min);

        if above {
            // only the last page can be below the key
            return self.add_page(target + 1);
        }

        if below {
            if target > 0 && !self.pages[target - 1].is_full() {
                return Ok(target - 1);
            }
            return self.add_page(target);
        }

        // key falls inside a full page: shift its last tuple to the right
        let next = target + 1;
        if next >= self.pages.len() || self.pages[next].is_full() {
            self.add_page(next)?;
        }
        let moved = self.pages[target].remove_last_tuple(&self.context)?;
        if let Err(err) = self.pages[next].insert(&self.context, moved.clone()) {
            if let Err(undo) = self.pages[target].insert(&self.context, moved) {
                warn!(table = self.name(), error = %undo, "failed to restore shifted tuple");
            }
            return Err(err);
        }
        debug!(
            table = self.name(),
            from = self.pages[target].name(),
            to = self.pages[next].name(),
            "shifted overflow tuple"
        );
        Ok(target)
    }

    /// Create a page and place it at `position` in the directory
    fn add_page(&mut self, position: usize) -> Result<usize> {
        let name = self.next_page_id.to_string();
        let page = Page::create(&self.context, name, self.page_capacity)?;
        self.next_page_id += 1;
        self.pages.insert(position, page);
        self.version += 1;
        Ok(position)
    }

    /// Delete and drop every empty page still in the directory
    fn discard_empty_pages(&mut self) {
        for index in (0..self.pages.len()).rev() {
            if !self.pages[index].is_empty() {
                continue;
            }
            if !self.pages[index].is_destroyed() {
                if let Err(err) = self.pages[index].delete_file(&self.context) {
                    warn!(
                        table = self.name(),
                        page = self.pages[index].name(),
                        error = %err,
                        "failed to remove empty page"
                    );
                }
            }
            self.pages.remove(index);
            self.version += 1;
        }
    }

    /// Remove the page at `index` if it was destroyed
    fn drop_destroyed(&mut self, index: usize) {
        if self.pages.get(index).map_or(false, Page::is_destroyed) {
            self.pages.remove(index);
            self.version += 1;
        }
    }
}
