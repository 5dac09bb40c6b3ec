//! Storage Module
//!
//! Write-through persistence for pages, keyed by `(table, page)`.
//!
//! ## Responsibilities
//! - Save, delete and load the full state of a single page
//! - Establish a page's durable slot when the page is born
//! - Detect corrupted images on load (CRC32)
//!
//! ## Page File Format
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                      │
//! │   Magic: "TSPG" (4) | Version: u16 (2)                 │
//! │   PayloadLen: u32 (4) | PayloadCRC: u32 (4)            │
//! ├────────────────────────────────────────────────────────┤
//! │ Payload (variable)                                     │
//! │   bincode(Page): identity, table, capacity, bounds,    │
//! │   tuples in primary-key order                          │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! Table catalogs use the same frame with magic "TSTB".

mod codec;
mod file_store;
mod memory_store;

pub use codec::{decode_frame, decode_page, encode_frame, encode_page, CATALOG_MAGIC, PAGE_MAGIC};
pub use file_store::FileStore;
pub use memory_store::MemoryStore;

use crate::error::Result;
use crate::page::Page;

/// Durable page storage keyed by owner (table) name and page identity
///
/// One record per page. Every method is a blocking call; callers treat any
/// error as a failed mutation.
pub trait PageStore: Send + Sync {
    /// Establish the durable slot for a newly born page
    ///
    /// Fails if a record for `(table, page)` already exists.
    fn create(&self, table: &str, page: &str, state: &Page) -> Result<()>;

    /// Overwrite the persisted image of a page
    fn save(&self, table: &str, page: &str, state: &Page) -> Result<()>;

    /// Remove the persisted image of a page
    ///
    /// Fails if there is no record to remove.
    fn delete(&self, table: &str, page: &str) -> Result<()>;

    /// Load the persisted image of a page
    fn load(&self, table: &str, page: &str) -> Result<Page>;

    /// Whether a record exists for `(table, page)`
    fn exists(&self, table: &str, page: &str) -> bool;
}
