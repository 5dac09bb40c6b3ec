//! In-memory page store
//!
//! Keeps encoded page images in a map. Images still go through the page
//! codec, so a load returns exactly what a file-backed store would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;

use super::{codec, PageStore};
use crate::error::{Result, StoreError};
use crate::page::Page;

/// Map-backed store with write counters
#[derive(Default)]
pub struct MemoryStore {
    images: RwLock<HashMap<(String, String), Bytes>>,
    saves: AtomicU64,
    deletes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves (including creates)
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of successful deletes
    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Number of stored page images
    pub fn len(&self) -> usize {
        self.images.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.read().is_empty()
    }

    fn key(table: &str, page: &str) -> (String, String) {
        (table.to_string(), page.to_string())
    }
}

impl PageStore for MemoryStore {
    fn create(&self, table: &str, page: &str, state: &Page) -> Result<()> {
        if self.exists(table, page) {
            return Err(StoreError::Persistence(format!(
                "page {} of '{}' already exists",
                page, table
            )));
        }
        self.save(table, page, state)
    }

    fn save(&self, table: &str, page: &str, state: &Page) -> Result<()> {
        let image = codec::encode_page(state)?;
        self.images.write().insert(Self::key(table, page), image);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, table: &str, page: &str) -> Result<()> {
        match self.images.write().remove(&Self::key(table, page)) {
            Some(_) => {
                self.deletes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(StoreError::Persistence(format!(
                "no persisted image for page {} of '{}'",
                page, table
            ))),
        }
    }

    fn load(&self, table: &str, page: &str) -> Result<Page> {
        let images = self.images.read();
        let image = images.get(&Self::key(table, page)).ok_or_else(|| {
            StoreError::Persistence(format!(
                "no persisted image for page {} of '{}'",
                page, table
            ))
        })?;
        codec::decode_page(image)
    }

    fn exists(&self, table: &str, page: &str) -> bool {
        self.images.read().contains_key(&Self::key(table, page))
    }
}
