//! Page Module
//!
//! The page abstraction: a fixed-capacity container of tuples kept sorted
//! by primary key, mirrored into every registered index and persisted
//! after every mutation.
//!
//! ## Mutation Pipeline
//! ```text
//!   request ──► binary search ──► mutate tuples ──► recompute bounds
//!                                                        │
//!        ◄── return ◄── persist (save / delete) ◄── index events
//! ```
//!
//! Any failure in the index or persistence step rolls the page (and the
//! indices already notified) back to the state before the call, then
//! surfaces the error.

mod container;
mod printer;
pub mod search;

pub use container::Page;
pub use search::{CompareOp, Constraint, LogicalOp};

use std::sync::Arc;

use crate::error::Result;
use crate::index::Index;
use crate::storage::PageStore;
use crate::tuple::{ColumnValues, Tuple};

/// The table a page belongs to, as seen from the page
///
/// Pages never own their table; they hold its name and receive this
/// context on every call that needs indices, tuple construction or
/// persistence.
pub trait PageOwner {
    /// Table name, used as the persistence owner key
    fn name(&self) -> &str;

    /// Registered indices, in propagation order
    fn indices(&self) -> &[Arc<dyn Index>];

    /// Materialize (and validate) a tuple from column values
    fn build_tuple(&self, values: &ColumnValues) -> Result<Tuple>;

    /// Durable storage for this table's pages
    fn store(&self) -> &dyn PageStore;
}
