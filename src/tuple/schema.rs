//! Table schema and tuple construction
//!
//! The schema is the only place tuples are materialized from raw column
//! values, so every tuple that reaches a page has already been validated.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{Cell, ColumnValues, Tuple, Value};
use crate::error::{Result, StoreError};

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Int,
    Double,
    Text,
}

impl ColumnType {
    /// Coerce a value into this column type, or `None` if it does not fit
    ///
    /// `Int` values are widened into `Double` columns; nothing else converts.
    fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) => Some(Value::Null),
            (ColumnType::Int, Value::Int(_)) => Some(value.clone()),
            (ColumnType::Double, Value::Double(_)) => Some(value.clone()),
            (ColumnType::Double, Value::Int(v)) => Some(Value::Double(*v as f64)),
            (ColumnType::Text, Value::Text(_)) => Some(value.clone()),
            _ => None,
        }
    }

    fn parse(&self, raw: &str) -> Option<Value> {
        match self {
            ColumnType::Int => raw.trim().parse().ok().map(Value::Int),
            ColumnType::Double => raw.trim().parse().ok().map(Value::Double),
            ColumnType::Text => Some(Value::Text(raw.to_string())),
        }
    }
}

/// A column definition with an optional inclusive value range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub min: Option<Value>,
    pub max: Option<Value>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            min: None,
            max: None,
        }
    }

    /// Restrict the column to `min..=max`
    pub fn with_range(mut self, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        self.min = Some(min.into());
        self.max = Some(max.into());
        self
    }

    fn check(&self, value: &Value) -> Result<Value> {
        let coerced = self.column_type.coerce(value).ok_or_else(|| {
            StoreError::InvalidTuple(format!(
                "column '{}' expects {:?}, got {}",
                self.name,
                self.column_type,
                value.type_name()
            ))
        })?;

        if coerced.is_null() {
            return Ok(coerced);
        }
        if let Some(min) = &self.min {
            if &coerced < min {
                return Err(StoreError::InvalidTuple(format!(
                    "column '{}' value {} is below minimum {}",
                    self.name, coerced, min
                )));
            }
        }
        if let Some(max) = &self.max {
            if &coerced > max {
                return Err(StoreError::InvalidTuple(format!(
                    "column '{}' value {} is above maximum {}",
                    self.name, coerced, max
                )));
            }
        }
        Ok(coerced)
    }
}

/// Schema of a table: ordered columns plus the clustering (primary) key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    table: String,
    primary_key: String,
    columns: Vec<ColumnDef>,
}

impl Schema {
    /// Create a schema, validating column names, key column and ranges
    pub fn new(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        columns: Vec<ColumnDef>,
    ) -> Result<Self> {
        let table = table.into();
        let primary_key = primary_key.into();

        if table.is_empty() {
            return Err(StoreError::InvalidTuple("table name must not be empty".to_string()));
        }
        // the name becomes a directory under the data root
        if table == "." || table == ".." || table.contains(['/', '\\', '\0']) {
            return Err(StoreError::InvalidTuple(format!(
                "table name '{}' is not a plain directory name",
                table.escape_default()
            )));
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(StoreError::InvalidTuple(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
            if let (Some(min), Some(max)) = (&column.min, &column.max) {
                if min > max {
                    return Err(StoreError::InvalidTuple(format!(
                        "column '{}' has min {} greater than max {}",
                        column.name, min, max
                    )));
                }
            }
        }

        if !seen.contains(primary_key.as_str()) {
            return Err(StoreError::InvalidTuple(format!(
                "primary key '{}' is not a column of '{}'",
                primary_key, table
            )));
        }

        Ok(Self {
            table,
            primary_key,
            columns,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Materialize a tuple from column values
    ///
    /// Cells follow schema order; absent non-key columns become `Null`.
    pub fn build_tuple(&self, values: &ColumnValues) -> Result<Tuple> {
        let checked = self.validate_partial(values)?;

        match checked.get(&self.primary_key) {
            Some(v) if !v.is_null() => {}
            _ => {
                return Err(StoreError::InvalidTuple(format!(
                    "primary key '{}' must be provided",
                    self.primary_key
                )))
            }
        }

        let cells = self
            .columns
            .iter()
            .map(|c| {
                let value = checked.get(&c.name).cloned().unwrap_or(Value::Null);
                Cell::new(c.name.clone(), value)
            })
            .collect();

        Ok(Tuple::new(cells, self.primary_key.clone()))
    }

    /// Validate a partial mapping (update values, delete constraints)
    ///
    /// Every column must exist and every value must fit its column. Returns
    /// the values coerced to their column types.
    pub fn validate_partial(&self, values: &ColumnValues) -> Result<ColumnValues> {
        let mut checked = ColumnValues::new();
        for (name, value) in values {
            let column = self.column(name).ok_or_else(|| {
                StoreError::InvalidTuple(format!(
                    "column '{}' does not exist in '{}'",
                    name, self.table
                ))
            })?;
            if name == &self.primary_key && value.is_null() {
                return Err(StoreError::InvalidTuple(format!(
                    "primary key '{}' must not be null",
                    name
                )));
            }
            checked.insert(name.clone(), column.check(value)?);
        }
        Ok(checked)
    }

    /// Coerce a predicate value to a column's type
    ///
    /// Range limits are not applied: a predicate may compare against any
    /// value of the right type.
    pub fn coerce_for_column(&self, column: &str, value: &Value) -> Result<Value> {
        let def = self.column(column).ok_or_else(|| {
            StoreError::InvalidTuple(format!(
                "column '{}' does not exist in '{}'",
                column, self.table
            ))
        })?;
        def.column_type.coerce(value).ok_or_else(|| {
            StoreError::InvalidTuple(format!(
                "column '{}' cannot be compared with {}",
                column,
                value.type_name()
            ))
        })
    }

    /// Parse a textual clustering-key value into the key column's type
    pub fn parse_key(&self, raw: &str) -> Result<Value> {
        let column = self
            .column(&self.primary_key)
            .ok_or_else(|| StoreError::InvalidTuple("schema has no key column".to_string()))?;
        let value = column.column_type.parse(raw).ok_or_else(|| {
            StoreError::InvalidTuple(format!(
                "'{}' is not a valid {:?} key",
                raw, column.column_type
            ))
        })?;
        column.check(&value)
    }
}
