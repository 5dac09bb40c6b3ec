//! Index Module
//!
//! Secondary indices kept in lock-step with page mutations.
//!
//! ## Responsibilities
//! - Define the narrow `Index` capability pages push events into
//! - Provide a column-value secondary index (`SecondaryIndex`)
//!
//! ## Event Protocol
//! ```text
//! Page mutation ──► add(page, tuple) / remove(page, tuple)
//!                    applied to every registered index, in order;
//!                    the first failure stops propagation
//! ```

mod secondary;

pub use secondary::{IndexEntry, SecondaryIndex};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tuple::Tuple;

/// A capability receiving page mutation events
///
/// Implementations use interior mutability; they are shared between the
/// table that registers them and every page that reports into them.
pub trait Index: Send + Sync {
    /// Name used in error reports
    fn name(&self) -> &str;

    /// Record that `tuple` now lives in `page`
    fn add(&self, page: &str, tuple: &Tuple) -> Result<()>;

    /// Record that `tuple` no longer lives in `page`
    fn remove(&self, page: &str, tuple: &Tuple) -> Result<()>;
}

/// Direction of an index event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexAction {
    Insert,
    Delete,
}

impl IndexAction {
    /// The action that undoes this one
    pub fn inverse(self) -> Self {
        match self {
            IndexAction::Insert => IndexAction::Delete,
            IndexAction::Delete => IndexAction::Insert,
        }
    }

    /// Apply this action to a single index
    pub fn apply(self, index: &dyn Index, page: &str, tuple: &Tuple) -> Result<()> {
        match self {
            IndexAction::Insert => index.add(page, tuple),
            IndexAction::Delete => index.remove(page, tuple),
        }
    }
}
