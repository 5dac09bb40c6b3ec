//! Page search helpers
//!
//! Binary search over the primary key and linear scans for everything else.

use serde::{Deserialize, Serialize};

use crate::tuple::{ColumnValues, Tuple, Value};

/// First position whose key is ≥ `key` (the insertion point)
///
/// O(log n); relies on `tuples` being sorted by primary key.
pub fn lower_bound(tuples: &[Tuple], key: &Value) -> usize {
    tuples.partition_point(|t| t.primary_key() < key)
}

/// Position of the tuple whose key equals `key`
pub fn binary_search(tuples: &[Tuple], key: &Value) -> Option<usize> {
    let position = lower_bound(tuples, key);
    match tuples.get(position) {
        Some(t) if t.primary_key() == key => Some(position),
        _ => None,
    }
}

/// Comparison applied between a column value and a constraint value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn matches(self, left: &Value, right: &Value) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
        }
    }

    /// Parse "=", "!=", "<", "<=", ">", ">="
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol {
            "=" | "==" => Some(CompareOp::Eq),
            "!=" | "<>" => Some(CompareOp::Ne),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            _ => None,
        }
    }
}

/// How the results of several constraints combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Xor,
}

impl LogicalOp {
    /// Parse "AND", "OR", "XOR" (case-insensitive)
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "AND" => Some(LogicalOp::And),
            "OR" => Some(LogicalOp::Or),
            "XOR" => Some(LogicalOp::Xor),
            _ => None,
        }
    }
}

/// `column <op> value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub column: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Constraint {
    pub fn new(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// A tuple lacking the column never matches
    pub fn matches(&self, tuple: &Tuple) -> bool {
        tuple
            .get(&self.column)
            .map(|v| self.op.matches(v, &self.value))
            .unwrap_or(false)
    }
}

/// Whether `tuple` satisfies `constraints` combined with `op`
///
/// An empty constraint list matches everything.
pub fn matches(tuple: &Tuple, constraints: &[Constraint], op: LogicalOp) -> bool {
    if constraints.is_empty() {
        return true;
    }
    let mut results = constraints.iter().map(|c| c.matches(tuple));
    match op {
        LogicalOp::And => results.all(|r| r),
        LogicalOp::Or => results.any(|r| r),
        LogicalOp::Xor => results.filter(|r| *r).count() % 2 == 1,
    }
}

/// Linear scan with an operator; result keeps page order
pub fn linear_search_with_operator(
    tuples: &[Tuple],
    constraints: &[Constraint],
    op: LogicalOp,
) -> Vec<Tuple> {
    tuples
        .iter()
        .filter(|t| matches(t, constraints, op))
        .cloned()
        .collect()
}

/// Linear scan matching every column/value pair by equality
pub fn linear_search(tuples: &[Tuple], values: &ColumnValues) -> Vec<Tuple> {
    tuples
        .iter()
        .filter(|t| values.iter().all(|(c, v)| t.get(c) == Some(v)))
        .cloned()
        .collect()
}

/// Equality constraints for every entry of `values`
pub fn equality_constraints(values: &ColumnValues) -> Vec<Constraint> {
    values
        .iter()
        .map(|(c, v)| Constraint::new(c.clone(), CompareOp::Eq, v.clone()))
        .collect()
}
