//! Within-group percentage engine.
//!
//! For a categorical target column, computes the percentage breakdown of
//! each observed value *within* each group (the group's own row count is the
//! denominator, never the whole dataset). Supports single-key and compound
//! grouping and an optional module pre-filter supplied by the special-filter
//! registry.
//!
//! Pipeline: optional pre-filter, count per `(group keys..., target)`
//! combination, total per group key tuple, inner join, percentage. Output
//! columns: the group keys, the target column, `Cantidad`, `Total`,
//! `Porcentaje`; rows sorted by group key tuple then target value.

use polars::prelude::*;
use tracing::debug;

use crate::aggregate::{ensure_group_keys, key_exprs, key_names, sort_options};
use crate::dataset::equals_value;
use crate::error::{Result, ResultExt};

/// Row restriction applied before any grouping.
///
/// Built from a [`crate::config::SpecialFilter`] rule via
/// [`crate::config::SurveyConfig::module_filter_for_header`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFilter {
    /// Column the filter matches on (the module column).
    pub column: String,
    /// Value rows must equal to survive the filter.
    pub equals: String,
}

/// Result of a within-group percentage computation.
///
/// The two "no data" cases are distinct variants so the presentation layer
/// can say "no responses for this module" rather than "no such column".
#[derive(Debug, Clone)]
pub enum PercentageBreakdown {
    /// The computed percentage table.
    Table(DataFrame),
    /// The target column is absent from the (possibly filtered) dataset.
    ColumnMissing,
    /// The pre-filter restricted the dataset to zero rows.
    EmptyAfterFilter,
}

impl PercentageBreakdown {
    /// The table, when one was computed.
    pub fn table(self) -> Option<DataFrame> {
        match self {
            PercentageBreakdown::Table(df) => Some(df),
            _ => None,
        }
    }

    pub fn is_column_missing(&self) -> bool {
        matches!(self, PercentageBreakdown::ColumnMissing)
    }

    pub fn is_empty_after_filter(&self) -> bool {
        matches!(self, PercentageBreakdown::EmptyAfterFilter)
    }
}

/// Compute the within-group percentage breakdown of `target_column`.
///
/// `Porcentaje = round(Cantidad / Total * 100, 2)` where `Total` is the row
/// count of the target value's own group. Rows whose target value is missing
/// are excluded before both the count and the total, so percentages of each
/// group always sum to 100 (within rounding tolerance).
///
/// A filter naming a column absent from the dataset is skipped rather than
/// an error; the registry applies to datasets with and without a module
/// column alike.
///
/// # Errors
///
/// Missing group keys fail fast with [`crate::error::MetricsError::InvalidGroupKey`];
/// an absent target column or an empty filtered view are ordinary outcomes
/// reported through [`PercentageBreakdown`].
pub fn within_group_percentages(
    df: &DataFrame,
    target_column: &str,
    group_keys: &[String],
    filter: Option<&ModuleFilter>,
) -> Result<PercentageBreakdown> {
    ensure_group_keys(df, group_keys)?;

    // Step 1: optional pre-filter to one module's rows
    let view = match filter {
        Some(f) if df.column(&f.column).is_ok() => {
            let mask = equals_value(df, &f.column, &f.equals)?;
            let filtered = df.filter(&mask)?;
            debug!(
                column = %f.column,
                value = %f.equals,
                rows = filtered.height(),
                "module pre-filter applied"
            );
            filtered
        }
        _ => df.clone(),
    };

    if filter.is_some() && view.height() == 0 {
        return Ok(PercentageBreakdown::EmptyAfterFilter);
    }

    // Step 2: target column must exist in the (possibly filtered) view
    if view.column(target_column).is_err() {
        return Ok(PercentageBreakdown::ColumnMissing);
    }

    // Missing answers count toward neither Cantidad nor Total
    let answered = {
        let mask = view
            .column(target_column)?
            .as_materialized_series()
            .is_not_null();
        view.filter(&mask)?
    };

    // Steps 3-5: count per (group, target value), total per group, join
    let mut count_keys = key_exprs(group_keys);
    count_keys.push(col(target_column));

    let counts = answered
        .clone()
        .lazy()
        .group_by(count_keys)
        .agg([len().alias("Cantidad")]);

    let totals = answered
        .clone()
        .lazy()
        .group_by(key_exprs(group_keys))
        .agg([len().alias("Total")]);

    let mut sort_keys = key_names(group_keys);
    sort_keys.push(target_column.into());

    let joined = counts
        .join(
            totals,
            key_exprs(group_keys),
            key_exprs(group_keys),
            JoinArgs::new(JoinType::Inner),
        )
        .sort(sort_keys, sort_options())
        .collect()?;

    let table = with_percentage_column(joined)?;
    Ok(PercentageBreakdown::Table(table))
}

/// Append the `Porcentaje` column: `round(Cantidad / Total * 100, 2)`.
fn with_percentage_column(mut df: DataFrame) -> Result<DataFrame> {
    let cantidad = df
        .column("Cantidad")
        .context("While computing percentages")?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let total = df
        .column("Total")
        .context("While computing percentages")?
        .as_materialized_series()
        .cast(&DataType::Float64)?;

    let percentages: Vec<Option<f64>> = cantidad
        .f64()?
        .into_iter()
        .zip(total.f64()?)
        .map(|(c, t)| match (c, t) {
            (Some(c), Some(t)) if t > 0.0 => Some(round2(c / t * 100.0)),
            _ => None,
        })
        .collect();

    df.with_column(Series::new("Porcentaje".into(), percentages))?;
    Ok(df)
}

#[inline]
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cohort_df() -> DataFrame {
        df![
            "Cohort" => &["A", "A", "A", "B", "B", "B", "B", "C", "C", "C"],
            "Satisfied" => &["Yes", "No", "Yes", "Yes", "Yes", "No", "Yes", "Yes", "Yes", "No"],
        ]
        .unwrap()
    }

    fn module_df() -> DataFrame {
        df![
            "Promo" => &["P1", "P1", "P1", "P2", "P2", "P2"],
            "Modulo" => &["Módulo 4", "Módulo 4", "Módulo 1", "Módulo 4", "Módulo 1", "Módulo 1"],
            "Respuesta" => &["Sí", "No", "Sí", "Sí", "No", "Sí"],
        ]
        .unwrap()
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn f64_at(df: &DataFrame, column: &str, row: usize) -> f64 {
        df.column(column)
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Float64)
            .unwrap()
            .f64()
            .unwrap()
            .get(row)
            .unwrap()
    }

    #[test]
    fn test_cohort_scenario() {
        let table = within_group_percentages(&cohort_df(), "Satisfied", &keys(&["Cohort"]), None)
            .unwrap()
            .table()
            .unwrap();

        // Sorted by (Cohort, Satisfied): (A,No), (A,Yes), (B,No), (B,Yes), ...
        assert_eq!(table.height(), 6);
        assert_eq!(f64_at(&table, "Porcentaje", 0), 33.33);
        assert_eq!(f64_at(&table, "Porcentaje", 1), 66.67);
        assert_eq!(f64_at(&table, "Total", 1), 3.0);
        assert_eq!(f64_at(&table, "Porcentaje", 2), 25.0);
        assert_eq!(f64_at(&table, "Porcentaje", 3), 75.0);
        assert_eq!(f64_at(&table, "Total", 3), 4.0);
        assert_eq!(f64_at(&table, "Porcentaje", 4), 33.33);
        assert_eq!(f64_at(&table, "Porcentaje", 5), 66.67);
    }

    #[test]
    fn test_percentages_sum_to_100_per_group() {
        let table = within_group_percentages(&cohort_df(), "Satisfied", &keys(&["Cohort"]), None)
            .unwrap()
            .table()
            .unwrap();

        let mut sums: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
        let cohorts = table.column("Cohort").unwrap();
        for row in 0..table.height() {
            let cohort = cohorts.str().unwrap().get(row).unwrap().to_string();
            *sums.entry(cohort).or_insert(0.0) += f64_at(&table, "Porcentaje", row);
        }

        assert_eq!(sums.len(), 3);
        for (cohort, sum) in sums {
            assert!(
                (sum - 100.0).abs() <= 0.1,
                "cohort {cohort} percentages sum to {sum}"
            );
        }
    }

    #[test]
    fn test_total_equals_sum_of_counts() {
        let table = within_group_percentages(&cohort_df(), "Satisfied", &keys(&["Cohort"]), None)
            .unwrap()
            .table()
            .unwrap();

        let mut counts: std::collections::HashMap<String, (f64, f64)> =
            std::collections::HashMap::new();
        let cohorts = table.column("Cohort").unwrap();
        for row in 0..table.height() {
            let cohort = cohorts.str().unwrap().get(row).unwrap().to_string();
            let entry = counts.entry(cohort).or_insert((0.0, 0.0));
            entry.0 += f64_at(&table, "Cantidad", row);
            entry.1 = f64_at(&table, "Total", row);
        }

        for (cohort, (sum_cantidad, total)) in counts {
            assert_eq!(sum_cantidad, total, "cohort {cohort}");
        }
    }

    #[test]
    fn test_idempotent() {
        let df = cohort_df();
        let first = within_group_percentages(&df, "Satisfied", &keys(&["Cohort"]), None)
            .unwrap()
            .table()
            .unwrap();
        let second = within_group_percentages(&df, "Satisfied", &keys(&["Cohort"]), None)
            .unwrap()
            .table()
            .unwrap();
        assert!(first.equals(&second));
    }

    #[test]
    fn test_compound_group_keys() {
        let table = within_group_percentages(
            &module_df(),
            "Respuesta",
            &keys(&["Promo", "Modulo"]),
            None,
        )
        .unwrap()
        .table()
        .unwrap();

        // (P1, Módulo 4) has 2 rows: Sí and No, 50% each
        let promos = table.column("Promo").unwrap();
        let modulos = table.column("Modulo").unwrap();
        for row in 0..table.height() {
            if promos.str().unwrap().get(row) == Some("P1")
                && modulos.str().unwrap().get(row) == Some("Módulo 4")
            {
                assert_eq!(f64_at(&table, "Total", row), 2.0);
                assert_eq!(f64_at(&table, "Porcentaje", row), 50.0);
            }
        }
    }

    #[test]
    fn test_filter_matches_manual_restriction() {
        let df = module_df();
        let filter = ModuleFilter {
            column: "Modulo".to_string(),
            equals: "Módulo 4".to_string(),
        };

        let filtered = within_group_percentages(&df, "Respuesta", &keys(&["Promo"]), Some(&filter))
            .unwrap()
            .table()
            .unwrap();

        let mask = equals_value(&df, "Modulo", "Módulo 4").unwrap();
        let manual_view = df.filter(&mask).unwrap();
        let manual = within_group_percentages(&manual_view, "Respuesta", &keys(&["Promo"]), None)
            .unwrap()
            .table()
            .unwrap();

        assert!(filtered.equals(&manual));
    }

    #[test]
    fn test_empty_after_filter() {
        let filter = ModuleFilter {
            column: "Modulo".to_string(),
            equals: "Módulo 9".to_string(),
        };
        let result =
            within_group_percentages(&module_df(), "Respuesta", &keys(&["Promo"]), Some(&filter))
                .unwrap();
        assert!(result.is_empty_after_filter());
    }

    #[test]
    fn test_column_missing() {
        let result =
            within_group_percentages(&cohort_df(), "Inexistente", &keys(&["Cohort"]), None)
                .unwrap();
        assert!(result.is_column_missing());
    }

    #[test]
    fn test_filter_on_absent_column_is_skipped() {
        // Dataset without a module column: the registry rule still resolves,
        // but the filter cannot apply and is skipped
        let filter = ModuleFilter {
            column: "Modulo".to_string(),
            equals: "Módulo 4".to_string(),
        };
        let with = within_group_percentages(
            &cohort_df(),
            "Satisfied",
            &keys(&["Cohort"]),
            Some(&filter),
        )
        .unwrap()
        .table()
        .unwrap();
        let without = within_group_percentages(&cohort_df(), "Satisfied", &keys(&["Cohort"]), None)
            .unwrap()
            .table()
            .unwrap();
        assert!(with.equals(&without));
    }

    #[test]
    fn test_missing_answers_excluded_from_totals() {
        let df = df![
            "Cohort" => &["A", "A", "A", "A"],
            "Satisfied" => &[Some("Yes"), Some("Yes"), None, Some("No")],
        ]
        .unwrap();
        let table = within_group_percentages(&df, "Satisfied", &keys(&["Cohort"]), None)
            .unwrap()
            .table()
            .unwrap();

        // Null answer excluded: Total is 3, percentages still sum to 100
        assert_eq!(table.height(), 2);
        assert_eq!(f64_at(&table, "Total", 0), 3.0);
        assert_eq!(f64_at(&table, "Porcentaje", 0), 33.33); // No
        assert_eq!(f64_at(&table, "Porcentaje", 1), 66.67); // Yes
    }

    #[test]
    fn test_invalid_group_key_fails_fast() {
        let err = within_group_percentages(&cohort_df(), "Satisfied", &keys(&["Nope"]), None)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::MetricsError::InvalidGroupKey(_)
        ));
    }
}
