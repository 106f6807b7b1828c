//! Headline KPI summary.
//!
//! The handful of numbers the dashboard shows above the tabs: total
//! responses, distinct promotions and modules, and the mean of the
//! configured headline metric. The headline metric is an explicit
//! configuration entry; when none is configured, no headline is computed.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classifier::is_numeric_dtype;
use crate::config::SurveyConfig;
use crate::dataset::DatasetLayout;
use crate::error::{MetricsError, Result};

/// Mean of the configured headline metric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineMetric {
    pub column: String,
    /// `None` when the column holds no non-missing values.
    pub mean: Option<f64>,
}

/// Top-line numbers for the current dataset view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_records: usize,
    pub promotion_count: usize,
    /// Absent when the dataset has no module column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<HeadlineMetric>,
}

/// Compute the KPI summary for a dataset view.
///
/// # Errors
///
/// A configured headline metric that is absent or non-numeric is a
/// configuration error and fails fast.
pub fn kpi_summary(
    df: &DataFrame,
    config: &SurveyConfig,
    layout: &DatasetLayout,
) -> Result<KpiSummary> {
    let promotion_count = df
        .column(config.promotion_header())
        .map_err(|_| MetricsError::ColumnNotFound(config.promotion_header().to_string()))?
        .as_materialized_series()
        .n_unique()?;

    let module_count = if layout.has_module {
        Some(
            df.column(config.module_header())?
                .as_materialized_series()
                .n_unique()?,
        )
    } else {
        None
    };

    let headline = match &config.headline_metric {
        Some(column) => {
            let series = df
                .column(column)
                .map_err(|_| MetricsError::ColumnNotFound(column.clone()))?
                .as_materialized_series();
            if !is_numeric_dtype(series.dtype()) {
                return Err(MetricsError::NotNumeric(column.clone()));
            }
            Some(HeadlineMetric {
                column: column.clone(),
                mean: series.mean(),
            })
        }
        None => None,
    };

    Ok(KpiSummary {
        total_records: df.height(),
        promotion_count,
        module_count,
        headline,
    })
}
