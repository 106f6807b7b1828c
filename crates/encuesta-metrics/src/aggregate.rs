//! Grouped descriptive statistics.
//!
//! Partitions the dataset by one or more group keys and computes the five
//! descriptive statistics the dashboard shows (`Media`, `Mediana`, `Máximo`,
//! `Mínimo`, `Cantidad`) for a numeric column. Missing values are excluded
//! from all five statistics, so `Cantidad` is always the denominator the
//! other four were computed over. Output rows are sorted by the group key
//! tuple, making repeated calls on the same input byte-identical.

use polars::prelude::*;
use tracing::debug;

use crate::classifier::is_numeric_dtype;
use crate::error::{MetricsError, Result};

/// A descriptive statistic selectable for custom aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Mean,
    Median,
    Max,
    Min,
    Count,
}

impl Statistic {
    /// All selectable statistics, in display order.
    pub const ALL: [Statistic; 5] = [
        Statistic::Mean,
        Statistic::Median,
        Statistic::Max,
        Statistic::Min,
        Statistic::Count,
    ];

    /// Display label, as shown in the dashboard's aggregation picker.
    pub fn label(&self) -> &'static str {
        match self {
            Statistic::Mean => "Media",
            Statistic::Median => "Mediana",
            Statistic::Max => "Máximo",
            Statistic::Min => "Mínimo",
            Statistic::Count => "Conteo",
        }
    }

    fn expr(&self, column: &str) -> Expr {
        match self {
            Statistic::Mean => col(column).mean(),
            Statistic::Median => col(column).median(),
            Statistic::Max => col(column).max(),
            Statistic::Min => col(column).min(),
            Statistic::Count => col(column).count(),
        }
    }
}

/// Compute the five descriptive statistics of `value_column` per group.
///
/// Output columns: the group keys followed by `Media`, `Mediana`, `Máximo`,
/// `Mínimo`, `Cantidad`. One row per observed group key tuple, sorted by
/// that tuple.
///
/// # Errors
///
/// Fails fast on caller errors: empty or missing group keys
/// ([`MetricsError::InvalidGroupKey`]), absent value column
/// ([`MetricsError::ColumnNotFound`]), or a non-numeric value column
/// ([`MetricsError::NotNumeric`]).
pub fn grouped_stats(
    df: &DataFrame,
    value_column: &str,
    group_keys: &[String],
) -> Result<DataFrame> {
    ensure_group_keys(df, group_keys)?;
    ensure_numeric(df, value_column)?;

    let stats = df
        .clone()
        .lazy()
        .group_by(key_exprs(group_keys))
        .agg([
            col(value_column).mean().alias("Media"),
            col(value_column).median().alias("Mediana"),
            col(value_column).max().alias("Máximo"),
            col(value_column).min().alias("Mínimo"),
            col(value_column).count().alias("Cantidad"),
        ])
        .sort(key_names(group_keys), sort_options())
        .collect()?;

    debug!(column = %value_column, groups = stats.height(), "grouped statistics computed");
    Ok(stats)
}

/// Compute a caller-selected set of statistics over one or more numeric
/// columns, per group.
///
/// Each output statistic column is named `"{value column} ({label})"`.
pub fn grouped_stats_custom(
    df: &DataFrame,
    value_columns: &[String],
    group_keys: &[String],
    statistics: &[Statistic],
) -> Result<DataFrame> {
    ensure_group_keys(df, group_keys)?;
    if value_columns.is_empty() {
        return Err(MetricsError::InvalidConfig(
            "at least one value column required".to_string(),
        ));
    }
    if statistics.is_empty() {
        return Err(MetricsError::InvalidConfig(
            "at least one statistic required".to_string(),
        ));
    }

    let mut aggs = Vec::with_capacity(value_columns.len() * statistics.len());
    for column in value_columns {
        ensure_numeric(df, column)?;
        for stat in statistics {
            aggs.push(
                stat.expr(column)
                    .alias(format!("{} ({})", column, stat.label())),
            );
        }
    }

    let stats = df
        .clone()
        .lazy()
        .group_by(key_exprs(group_keys))
        .agg(aggs)
        .sort(key_names(group_keys), sort_options())
        .collect()?;

    Ok(stats)
}

/// Row count per observed value of `key` (`Cantidad` column), sorted by key.
pub fn group_counts(df: &DataFrame, key: &str) -> Result<DataFrame> {
    ensure_group_keys(df, std::slice::from_ref(&key.to_string()))?;

    let counts = df
        .clone()
        .lazy()
        .group_by([col(key)])
        .agg([len().alias("Cantidad")])
        .sort([key], sort_options())
        .collect()?;

    Ok(counts)
}

pub(crate) fn ensure_group_keys(df: &DataFrame, group_keys: &[String]) -> Result<()> {
    if group_keys.is_empty() {
        return Err(MetricsError::InvalidGroupKey(
            "empty group key list".to_string(),
        ));
    }
    for key in group_keys {
        if df.column(key).is_err() {
            return Err(MetricsError::InvalidGroupKey(key.clone()));
        }
    }
    Ok(())
}

fn ensure_numeric(df: &DataFrame, column: &str) -> Result<()> {
    let col = df
        .column(column)
        .map_err(|_| MetricsError::ColumnNotFound(column.to_string()))?;
    if !is_numeric_dtype(col.dtype()) {
        return Err(MetricsError::NotNumeric(column.to_string()));
    }
    Ok(())
}

pub(crate) fn key_exprs(group_keys: &[String]) -> Vec<Expr> {
    group_keys.iter().map(|k| col(k.as_str())).collect()
}

pub(crate) fn key_names(group_keys: &[String]) -> Vec<PlSmallStr> {
    group_keys.iter().map(|k| k.as_str().into()).collect()
}

pub(crate) fn sort_options() -> SortMultipleOptions {
    SortMultipleOptions::default().with_maintain_order(true)
}
