//! Cells and tuples

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ColumnValues, Value};

/// A named column value inside a tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub column: String,
    pub value: Value,
}

impl Cell {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// An ordered sequence of cells with one designated primary-key column
///
/// Cell values may be rewritten in place; the set of columns is fixed once
/// the tuple is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    cells: Vec<Cell>,
    primary_key_column: String,
}

impl Tuple {
    /// Build a tuple from cells; the primary-key column should be among them
    pub fn new(cells: Vec<Cell>, primary_key_column: impl Into<String>) -> Self {
        Self {
            cells,
            primary_key_column: primary_key_column.into(),
        }
    }

    /// The primary-key value (`Null` if the key cell is missing)
    pub fn primary_key(&self) -> &Value {
        self.get(&self.primary_key_column).unwrap_or(&Value::Null)
    }

    pub fn primary_key_column(&self) -> &str {
        &self.primary_key_column
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Value of a column, if the tuple has it
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|c| c.column == column)
            .map(|c| &c.value)
    }

    /// Overwrite a column value in place
    ///
    /// Returns false (and changes nothing) if the column does not exist.
    pub fn set(&mut self, column: &str, value: Value) -> bool {
        match self.cells.iter_mut().find(|c| c.column == column) {
            Some(cell) => {
                cell.value = value;
                true
            }
            None => false,
        }
    }

    /// Overwrite every column present in `values`; other cells are untouched
    pub fn apply(&mut self, values: &ColumnValues) {
        for cell in self.cells.iter_mut() {
            if let Some(v) = values.get(&cell.column) {
                cell.value = v.clone();
            }
        }
    }

    /// Column → value snapshot of the whole tuple
    pub fn to_values(&self) -> ColumnValues {
        self.cells
            .iter()
            .map(|c| (c.column.clone(), c.value.clone()))
            .collect()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .cells
            .iter()
            .map(|c| format!("{}={}", c.column, c.value))
            .collect();
        write!(f, "({})", rendered.join(", "))
    }
}
