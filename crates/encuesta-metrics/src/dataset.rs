//! Dataset preparation glue.
//!
//! Everything between "a validated rectangular DataFrame" and "inputs the
//! computation engines accept": dropping bookkeeping columns, resolving the
//! grouping layout, synthesizing the grouping helper column, and restricting
//! rows to the promotions/modules a caller selected. Filtering always
//! produces a new DataFrame; the source is never mutated.

use polars::prelude::*;
use tracing::debug;

use crate::config::SurveyConfig;
use crate::error::{MetricsError, Result};

/// Name of the synthetic helper column combining the group keys for display.
pub const GROUPING_HELPER: &str = "_Agrupacion";

/// Grouping layout resolved from the dataset's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    /// Columns the dataset is grouped by (promotion, plus module when present).
    pub group_keys: Vec<String>,
    /// Columns excluded from analysis pickers (group keys + helper column).
    pub excluded: Vec<String>,
    /// Whether the module column exists in this dataset.
    pub has_module: bool,
}

/// Drop configured bookkeeping columns when present.
///
/// Columns listed in the configuration but absent from the dataset are
/// ignored.
pub fn drop_ignored_columns(df: &DataFrame, config: &SurveyConfig) -> DataFrame {
    let mut out = df.clone();
    for name in &config.drop_columns {
        if let Ok(dropped) = out.drop(name) {
            debug!(column = %name, "dropped bookkeeping column");
            out = dropped;
        }
    }
    out
}

/// Validate the dataset's columns and resolve the grouping layout.
///
/// The promotion column is required; its absence is a hard error. The module
/// column is optional and decides whether grouping is single-key or
/// compound.
pub fn validate(df: &DataFrame, config: &SurveyConfig) -> Result<DatasetLayout> {
    let promotion = config.promotion_header();
    if df.column(promotion).is_err() {
        return Err(MetricsError::ColumnNotFound(promotion.to_string()));
    }

    let module = config.module_header();
    let has_module = df.column(module).is_ok();

    let group_keys = if has_module {
        vec![promotion.to_string(), module.to_string()]
    } else {
        vec![promotion.to_string()]
    };

    let mut excluded = group_keys.clone();
    excluded.push(GROUPING_HELPER.to_string());

    Ok(DatasetLayout {
        group_keys,
        excluded,
        has_module,
    })
}

/// Append the grouping helper column.
///
/// The helper holds `"{promotion}"` or `"{promotion} - {module}"` per row and
/// exists only so the presentation layer has a single label per group; it is
/// excluded from every computation.
pub fn with_grouping_helper(
    df: &DataFrame,
    config: &SurveyConfig,
    layout: &DatasetLayout,
) -> Result<DataFrame> {
    let promotion = string_values(df, config.promotion_header())?;

    let helper: Vec<Option<String>> = if layout.has_module {
        let module = string_values(df, config.module_header())?;
        promotion
            .iter()
            .zip(module.iter())
            .map(|(p, m)| match (p, m) {
                (Some(p), Some(m)) => Some(format!("{p} - {m}")),
                (Some(p), None) => Some(p.clone()),
                _ => None,
            })
            .collect()
    } else {
        promotion.clone()
    };

    let mut out = df.clone();
    out.with_column(Series::new(GROUPING_HELPER.into(), helper))?;
    Ok(out)
}

/// Restrict rows to the selected promotions and (optionally) modules.
///
/// An empty selection means "no restriction" for that dimension, matching
/// the dashboard's multiselect semantics. Module selection is ignored when
/// the dataset has no module column.
pub fn apply_selection(
    df: &DataFrame,
    config: &SurveyConfig,
    layout: &DatasetLayout,
    promotions: &[String],
    modules: &[String],
) -> Result<DataFrame> {
    let mut out = df.clone();

    if !promotions.is_empty() {
        let mask = matches_any(&out, config.promotion_header(), promotions)?;
        out = out.filter(&mask)?;
    }

    if layout.has_module && !modules.is_empty() {
        let mask = matches_any(&out, config.module_header(), modules)?;
        out = out.filter(&mask)?;
    }

    debug!(rows = out.height(), "selection applied");
    Ok(out)
}

/// Row mask: column value is one of `values`. Nulls never match.
pub(crate) fn matches_any(
    df: &DataFrame,
    column: &str,
    values: &[String],
) -> Result<BooleanChunked> {
    let strings = string_values(df, column)?;
    Ok(strings
        .iter()
        .map(|v| {
            Some(
                v.as_ref()
                    .is_some_and(|s| values.iter().any(|w| w == s)),
            )
        })
        .collect())
}

/// Row mask: column value equals `value`. Nulls never match.
pub(crate) fn equals_value(df: &DataFrame, column: &str, value: &str) -> Result<BooleanChunked> {
    let strings = string_values(df, column)?;
    Ok(strings
        .iter()
        .map(|v| Some(v.as_deref() == Some(value)))
        .collect())
}

/// Materialize a column as string values, casting when necessary.
fn string_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(column)
        .map_err(|_| MetricsError::ColumnNotFound(column.to_string()))?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let ca = series.str()?;
    Ok(ca.into_iter().map(|v| v.map(|s| s.to_string())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_config() -> SurveyConfig {
        SurveyConfig::builder()
            .header("promocion", "Promo")
            .header("modulo", "Modulo")
            .build()
            .unwrap()
    }

    fn sample_df() -> DataFrame {
        df![
            "Promo" => &["P1", "P1", "P2"],
            "Modulo" => &["Módulo 1", "Módulo 4", "Módulo 4"],
            "Nota" => &[7i64, 8, 9],
            "Token" => &["a", "b", "c"],
        ]
        .unwrap()
    }

    #[test]
    fn test_drop_ignored_columns() {
        let config = test_config();
        let out = drop_ignored_columns(&sample_df(), &config);
        assert!(out.column("Token").is_err());
        // "Submitted At" is configured but absent; silently skipped
        assert_eq!(out.width(), 3);
    }

    #[test]
    fn test_validate_with_module() {
        let layout = validate(&sample_df(), &test_config()).unwrap();
        assert!(layout.has_module);
        assert_eq!(layout.group_keys, vec!["Promo", "Modulo"]);
        assert_eq!(layout.excluded, vec!["Promo", "Modulo", GROUPING_HELPER]);
    }

    #[test]
    fn test_validate_without_module() {
        let df = sample_df().drop("Modulo").unwrap();
        let layout = validate(&df, &test_config()).unwrap();
        assert!(!layout.has_module);
        assert_eq!(layout.group_keys, vec!["Promo"]);
    }

    #[test]
    fn test_validate_missing_promotion_fails() {
        let df = sample_df().drop("Promo").unwrap();
        let err = validate(&df, &test_config()).unwrap_err();
        assert!(matches!(err, MetricsError::ColumnNotFound(_)));
    }

    #[test]
    fn test_grouping_helper_compound() {
        let config = test_config();
        let df = sample_df();
        let layout = validate(&df, &config).unwrap();
        let out = with_grouping_helper(&df, &config, &layout).unwrap();

        let helper = out.column(GROUPING_HELPER).unwrap();
        let helper = helper.str().unwrap();
        assert_eq!(helper.get(0), Some("P1 - Módulo 1"));
        assert_eq!(helper.get(2), Some("P2 - Módulo 4"));
        // Source dataset untouched
        assert!(df.column(GROUPING_HELPER).is_err());
    }

    #[test]
    fn test_grouping_helper_single_key() {
        let config = test_config();
        let df = sample_df().drop("Modulo").unwrap();
        let layout = validate(&df, &config).unwrap();
        let out = with_grouping_helper(&df, &config, &layout).unwrap();

        let helper = out.column(GROUPING_HELPER).unwrap();
        assert_eq!(helper.str().unwrap().get(1), Some("P1"));
    }

    #[test]
    fn test_apply_selection() {
        let config = test_config();
        let df = sample_df();
        let layout = validate(&df, &config).unwrap();

        let out = apply_selection(
            &df,
            &config,
            &layout,
            &["P1".to_string()],
            &["Módulo 4".to_string()],
        )
        .unwrap();
        assert_eq!(out.height(), 1);

        // Empty selections leave the dataset unrestricted
        let out = apply_selection(&df, &config, &layout, &[], &[]).unwrap();
        assert_eq!(out.height(), 3);
    }
}
