//! Column classification for UI pickers.
//!
//! Splits a dataset's columns into numeric and categorical sets, minus a
//! caller-supplied exclusion set (grouping/ID columns and the synthetic
//! grouping helper). Classification is purely dtype-based and done once per
//! dataset; no per-call probing.

use polars::prelude::*;
use std::collections::HashSet;

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Kind of a survey column, decided from its dtype alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Supports mean/median/min/max.
    Numeric,
    /// Finite set of label values; anything non-numeric lands here.
    Categorical,
}

/// Classify a single dtype.
pub fn column_kind(dtype: &DataType) -> ColumnKind {
    if is_numeric_dtype(dtype) {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

/// Column names split by kind, preserving the dataset's column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnClassification {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

/// Split a dataset's columns into numeric and categorical names.
///
/// Every column lands in exactly one of numeric / categorical / excluded;
/// both output lists preserve the dataset's original column order. An empty
/// dataset yields empty lists.
pub fn classify(df: &DataFrame, exclude: &HashSet<String>) -> ColumnClassification {
    let mut result = ColumnClassification::default();

    for column in df.get_columns() {
        let name = column.name().as_str();
        if exclude.contains(name) {
            continue;
        }
        match column_kind(column.dtype()) {
            ColumnKind::Numeric => result.numeric.push(name.to_string()),
            ColumnKind::Categorical => result.categorical.push(name.to_string()),
        }
    }

    result
}
