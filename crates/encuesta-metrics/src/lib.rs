//! Survey KPI Computation Core
//!
//! A Polars-based library computing grouped statistical summaries and
//! within-group percentage distributions for cohort survey data.
//!
//! # Overview
//!
//! The library powers a survey KPI dashboard and provides:
//!
//! - **Column Classification**: numeric vs. categorical column selection for
//!   UI pickers, with an exclusion set for grouping/ID columns
//! - **Grouped Statistics**: mean, median, max, min, count of a numeric
//!   column per group (single or compound group keys)
//! - **Within-Group Percentages**: percentage breakdown of a categorical
//!   column inside each group, with the group's own row count as denominator
//! - **Special-Filter Registry**: table-driven rules restricting specific
//!   questions to one module's respondents before computing
//! - **Dataset Preparation**: bookkeeping-column removal, layout validation,
//!   grouping helper column, promotion/module row selection
//! - **KPI Summary**: top-line record/cohort counts and the configured
//!   headline metric
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use encuesta_metrics::{
//!     classify, dataset, kpi_summary, within_group_percentages, SurveyConfig,
//! };
//! use polars::prelude::*;
//!
//! let config = SurveyConfig::default();
//!
//! let df = CsvReader::from_path("encuestas.csv")?.finish()?;
//! let df = dataset::drop_ignored_columns(&df, &config);
//! let layout = dataset::validate(&df, &config)?;
//! let df = dataset::with_grouping_helper(&df, &config, &layout)?;
//!
//! let classes = classify(&df, &layout.excluded.iter().cloned().collect());
//!
//! for column in &classes.categorical {
//!     let filter = config.module_filter_for_header(column);
//!     match within_group_percentages(&df, column, &layout.group_keys, filter.as_ref())? {
//!         encuesta_metrics::PercentageBreakdown::Table(table) => println!("{table}"),
//!         encuesta_metrics::PercentageBreakdown::ColumnMissing => {}
//!         encuesta_metrics::PercentageBreakdown::EmptyAfterFilter => {
//!             println!("no responses for this module");
//!         }
//!     }
//! }
//! ```
//!
//! # Configuration
//!
//! All column headers, the bookkeeping-column drop list, and the
//! special-filter registry live in [`SurveyConfig`], an explicitly
//! constructed value passed into every entry point. [`SurveyConfig::default`]
//! reproduces the Adalab survey table; tests and other deployments build
//! alternates with [`SurveyConfig::builder`].
//!
//! # Determinism
//!
//! Every computation is a pure function of its inputs. Grouped outputs are
//! sorted by group key tuple (then target value), so repeated calls on
//! identical input yield identical tables, row for row.

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod kpis;
pub mod percentages;

// Re-exports for convenient access
pub use aggregate::{group_counts, grouped_stats, grouped_stats_custom, Statistic};
pub use classifier::{classify, column_kind, ColumnClassification, ColumnKind};
pub use config::{ConfigValidationError, SpecialFilter, SurveyConfig, SurveyConfigBuilder};
pub use dataset::{DatasetLayout, GROUPING_HELPER};
pub use error::{MetricsError, Result as MetricsResult, ResultExt};
pub use kpis::{kpi_summary, HeadlineMetric, KpiSummary};
pub use percentages::{within_group_percentages, ModuleFilter, PercentageBreakdown};
