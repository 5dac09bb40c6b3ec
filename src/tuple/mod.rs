//! Tuple Module
//!
//! Row representation shared by pages, indices and the table layer.
//!
//! ## Responsibilities
//! - Typed column values with a total order (the primary-key comparator)
//! - Named cells grouped into tuples with a designated primary-key column
//! - Schema-driven tuple construction and validation

mod schema;
mod record;
mod value;

pub use schema::{ColumnDef, ColumnType, Schema};
pub use record::{Cell, Tuple};
pub use value::Value;

use std::collections::BTreeMap;

/// Column name → value mapping used for inserts, updates and predicates
pub type ColumnValues = BTreeMap<String, Value>;
