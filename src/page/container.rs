//! Page implementation
//!
//! Sorted, fixed-capacity tuple container with lock-step index updates and
//! write-through persistence.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::search::{self, Constraint, LogicalOp};
use super::PageOwner;
use crate::error::{Result, StoreError};
use crate::index::IndexAction;
use crate::tuple::{ColumnValues, Tuple, Value};

/// A fixed-capacity page of tuples sorted by primary key
///
/// ## Invariants
/// - `tuples` is strictly ascending by primary key
/// - `min_key`/`max_key` are the keys of the first/last tuple, `None` when empty
/// - `size() <= capacity()`
/// - every tuple in `tuples` has an entry in every index of the owner
/// - after a mutating call returns `Ok`, the persisted image equals `self`
///
/// ## Concurrency
/// No internal locking. The owning table serializes access to a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Identity used as the persistence key
    name: String,

    /// Name of the owning table (back-reference, non-owning)
    table: String,

    /// Row budget, fixed at construction
    capacity: usize,

    /// Tuples in ascending primary-key order
    tuples: Vec<Tuple>,

    /// Cached primary key of the first tuple
    min_key: Option<Value>,

    /// Cached primary key of the last tuple
    max_key: Option<Value>,

    /// Set once the last tuple is deleted and the image removed
    #[serde(skip)]
    destroyed: bool,
}

impl Page {
    /// Create an empty in-memory page
    ///
    /// Nothing is persisted until `create_file` is called; see `create`.
    pub fn new(table: impl Into<String>, name: impl Into<String>, capacity: usize) -> Self {
        debug_assert!(capacity > 0, "page capacity must be positive");
        Self {
            name: name.into(),
            table: table.into(),
            capacity,
            tuples: Vec::new(),
            min_key: None,
            max_key: None,
            destroyed: false,
        }
    }

    /// Create an empty page and establish its durable slot
    pub fn create(owner: &dyn PageOwner, name: impl Into<String>, capacity: usize) -> Result<Self> {
        let page = Self::new(owner.name(), name, capacity);
        page.create_file(owner)?;
        info!(table = owner.name(), page = %page.name, capacity, "page created");
        Ok(page)
    }

    /// Reload a page from the owner's store
    ///
    /// The image is checked for ordering and cached bounds before use.
    pub fn load(owner: &dyn PageOwner, name: &str) -> Result<Self> {
        let page = owner.store().load(owner.name(), name)?;

        if page.table != owner.name() || page.name != name {
            return Err(StoreError::Corruption(format!(
                "image for page {} of '{}' claims to be page {} of '{}'",
                name,
                owner.name(),
                page.name,
                page.table
            )));
        }
        if page.tuples.len() > page.capacity {
            return Err(StoreError::Corruption(format!(
                "page {} holds {} tuples but capacity is {}",
                name,
                page.tuples.len(),
                page.capacity
            )));
        }
        if page
            .tuples
            .windows(2)
            .any(|w| w[0].primary_key() >= w[1].primary_key())
        {
            return Err(StoreError::Corruption(format!(
                "page {} is not sorted by primary key",
                name
            )));
        }
        if page.min_key.as_ref() != page.tuples.first().map(Tuple::primary_key)
            || page.max_key.as_ref() != page.tuples.last().map(Tuple::primary_key)
        {
            return Err(StoreError::Corruption(format!(
                "page {} has stale key bounds",
                name
            )));
        }

        Ok(page)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn min_key(&self) -> Option<&Value> {
        self.min_key.as_ref()
    }

    pub fn max_key(&self) -> Option<&Value> {
        self.max_key.as_ref()
    }

    pub fn size(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tuples.len() == self.capacity
    }

    /// Whether the page was emptied and its persisted image removed
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Position of `key`: `Ok(exact)` or `Err(insertion point)`
    pub fn binary_search(&self, key: &Value) -> std::result::Result<usize, usize> {
        match search::binary_search(&self.tuples, key) {
            Some(position) => Ok(position),
            None => Err(search::lower_bound(&self.tuples, key)),
        }
    }

    /// Point lookup by primary key
    pub fn get(&self, key: &Value) -> Option<&Tuple> {
        search::binary_search(&self.tuples, key).map(|p| &self.tuples[p])
    }

    /// Linear scan combining `constraints` with `op`
    pub fn select(&self, constraints: &[Constraint], op: LogicalOp) -> Vec<Tuple> {
        search::linear_search_with_operator(&self.tuples, constraints, op)
    }

    /// Linear scan matching every column/value pair by equality
    pub fn linear_search(&self, values: &ColumnValues) -> Vec<Tuple> {
        search::linear_search(&self.tuples, values)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a tuple at its sorted position
    ///
    /// Preconditions (checked by the table layer): the key is not already in
    /// the page and the page is not full.
    pub fn insert(&mut self, owner: &dyn PageOwner, tuple: Tuple) -> Result<()> {
        self.ensure_live()?;
        debug_assert!(!self.is_full(), "insert into a full page");

        let position = if self.is_empty() {
            0
        } else {
            search::lower_bound(&self.tuples, tuple.primary_key())
        };
        self.tuples.insert(position, tuple);
        self.refresh_bounds();

        if let Err(err) = self.propagate(owner, &self.tuples[position], IndexAction::Insert) {
            self.tuples.remove(position);
            self.refresh_bounds();
            return Err(err);
        }

        if let Err(err) = self.persist(owner) {
            let tuple = self.tuples.remove(position);
            self.refresh_bounds();
            self.revert(owner, &tuple, IndexAction::Insert);
            return Err(err);
        }

        debug!(
            table = %self.table,
            page = %self.name,
            key = %self.tuples[position].primary_key(),
            size = self.tuples.len(),
            "tuple inserted"
        );
        Ok(())
    }

    /// Remove the tuple with primary key `key` and return it
    ///
    /// Removing the last tuple deletes the persisted image instead of
    /// rewriting it, and the page becomes destroyed.
    pub fn delete(&mut self, owner: &dyn PageOwner, key: &Value) -> Result<Tuple> {
        self.ensure_live()?;

        let position = self.require(key)?;
        let tuple = self.tuples.remove(position);
        self.refresh_bounds();

        if let Err(err) = self.propagate(owner, &tuple, IndexAction::Delete) {
            self.tuples.insert(position, tuple);
            self.refresh_bounds();
            return Err(err);
        }

        let durable = if self.tuples.is_empty() {
            self.delete_file(owner)
        } else {
            self.persist(owner)
        };
        if let Err(err) = durable {
            self.revert(owner, &tuple, IndexAction::Delete);
            self.tuples.insert(position, tuple);
            self.refresh_bounds();
            return Err(err);
        }

        debug!(
            table = %self.table,
            page = %self.name,
            key = %key,
            size = self.tuples.len(),
            "tuple deleted"
        );
        Ok(tuple)
    }

    /// Overwrite columns of the tuple with primary key `key`
    ///
    /// `values` may name any subset of the tuple's columns but no others.
    /// The new values are validated through the owner's tuple constructor,
    /// written into the stored tuple in place, and that same tuple is
    /// re-indexed. If the primary key changes the tuple is moved to keep the
    /// page sorted; rejecting a colliding key is the table's job.
    pub fn update(&mut self, owner: &dyn PageOwner, key: &Value, values: &ColumnValues) -> Result<()> {
        self.ensure_live()?;

        let position = self.require(key)?;
        let old = self.tuples[position].clone();

        if let Some(column) = values.keys().find(|c| old.get(c).is_none()) {
            return Err(StoreError::InvalidTuple(format!(
                "update names unknown column '{}'",
                column
            )));
        }

        let mut merged = old.to_values();
        merged.extend(values.iter().map(|(c, v)| (c.clone(), v.clone())));
        let snapshot = owner.build_tuple(&merged)?;

        self.propagate(owner, &old, IndexAction::Delete)?;

        let mut updated = self.tuples.remove(position);
        updated.apply(&snapshot.to_values());
        let new_position = search::lower_bound(&self.tuples, updated.primary_key());
        self.tuples.insert(new_position, updated);
        self.refresh_bounds();

        if let Err(err) = self.propagate(owner, &self.tuples[new_position], IndexAction::Insert) {
            self.restore(new_position, position, old.clone());
            self.revert(owner, &old, IndexAction::Delete);
            return Err(err);
        }

        if let Err(err) = self.persist(owner) {
            self.revert(owner, &self.tuples[new_position], IndexAction::Insert);
            self.restore(new_position, position, old.clone());
            self.revert(owner, &old, IndexAction::Delete);
            return Err(err);
        }

        debug!(
            table = %self.table,
            page = %self.name,
            key = %self.tuples[new_position].primary_key(),
            moved = new_position != position,
            "tuple updated"
        );
        Ok(())
    }

    /// Remove and return the tuple with the highest key
    ///
    /// Used by the table to shift overflow into the next page.
    pub fn remove_last_tuple(&mut self, owner: &dyn PageOwner) -> Result<Tuple> {
        self.ensure_live()?;
        let key = self
            .max_key
            .clone()
            .ok_or_else(|| StoreError::KeyNotFound(format!("page {} is empty", self.name)))?;
        self.delete(owner, &key)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Establish the page's durable slot; called once at page birth
    pub fn create_file(&self, owner: &dyn PageOwner) -> Result<()> {
        owner
            .store()
            .create(owner.name(), &self.name, self)
            .map_err(into_persistence)
    }

    /// Remove the page's persisted image and mark the page destroyed
    ///
    /// Called once, when the page transitions to empty.
    pub fn delete_file(&mut self, owner: &dyn PageOwner) -> Result<()> {
        self.ensure_live()?;
        owner
            .store()
            .delete(owner.name(), &self.name)
            .map_err(into_persistence)?;
        self.destroyed = true;
        info!(table = owner.name(), page = %self.name, "page destroyed");
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn ensure_live(&self) -> Result<()> {
        if self.destroyed {
            return Err(StoreError::PageDestroyed(self.name.clone()));
        }
        Ok(())
    }

    fn require(&self, key: &Value) -> Result<usize> {
        search::binary_search(&self.tuples, key).ok_or_else(|| {
            StoreError::KeyNotFound(format!("{} in page {} of '{}'", key, self.name, self.table))
        })
    }

    fn refresh_bounds(&mut self) {
        self.min_key = self.tuples.first().map(|t| t.primary_key().clone());
        self.max_key = self.tuples.last().map(|t| t.primary_key().clone());
    }

    /// Put `old` back at `position` after it was moved to `current`
    fn restore(&mut self, current: usize, position: usize, old: Tuple) {
        self.tuples.remove(current);
        self.tuples.insert(position, old);
        self.refresh_bounds();
    }

    fn persist(&self, owner: &dyn PageOwner) -> Result<()> {
        owner
            .store()
            .save(owner.name(), &self.name, self)
            .map_err(into_persistence)
    }

    /// Push one event to every index, in order
    ///
    /// On the first failure the indices already updated are reverted and the
    /// error is returned; the remaining indices are not touched.
    fn propagate(&self, owner: &dyn PageOwner, tuple: &Tuple, action: IndexAction) -> Result<()> {
        let indices = owner.indices();
        for (applied, index) in indices.iter().enumerate() {
            if let Err(err) = action.apply(index.as_ref(), &self.name, tuple) {
                for done in indices[..applied].iter().rev() {
                    if let Err(undo) = action.inverse().apply(done.as_ref(), &self.name, tuple) {
                        warn!(index = done.name(), error = %undo, "failed to revert index event");
                    }
                }
                return Err(match err {
                    StoreError::IndexSync { .. } => err,
                    other => StoreError::index_sync(index.name(), other.to_string()),
                });
            }
        }
        Ok(())
    }

    /// Undo a fully propagated event on every index
    fn revert(&self, owner: &dyn PageOwner, tuple: &Tuple, action: IndexAction) {
        for index in owner.indices().iter().rev() {
            if let Err(err) = action.inverse().apply(index.as_ref(), &self.name, tuple) {
                warn!(index = index.name(), error = %err, "failed to revert index event");
            }
        }
    }
}

fn into_persistence(err: StoreError) -> StoreError {
    match err {
        StoreError::Persistence(_) => err,
        other => StoreError::Persistence(other.to_string()),
    }
}
