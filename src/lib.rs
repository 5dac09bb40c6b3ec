//! # TupleStore
//!
//! A disk-resident, clustered-key table store with:
//! - Fixed-capacity pages kept sorted by primary key (binary search)
//! - Secondary indices updated in lock-step with every page mutation
//! - Write-through persistence: every mutation saves the page it touched
//! - Rollback of the in-memory page and indices when a step fails
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Database                              │
//! │             (table registry, catalog files)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         Table                                │
//! │      (schema, page directory, overflow, index registry)      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────┐
//!          │            │                 │
//!          ▼            ▼                 ▼
//!   ┌─────────────┐ ┌─────────────┐ ┌─────────────┐
//!   │    Page     │─►   Index     │ │  PageStore  │
//!   │  (sorted)   │ │ (secondary) │ │ (file/mem)  │
//!   └──────┬──────┘ └─────────────┘ └──────▲──────┘
//!          │                               │
//!          └────────── write-through ──────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod tuple;
pub mod index;
pub mod storage;
pub mod page;
pub mod table;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::Config;
pub use engine::Database;
pub use page::{Page, PageOwner};
pub use table::Table;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of TupleStore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
