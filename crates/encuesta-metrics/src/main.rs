//! CLI entry point for the survey metrics core.
//!
//! A thin presentation layer over the library: loads a CSV export of the
//! survey, prepares it, and runs one of the computation modes against it.

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use encuesta_metrics::{
    classify, dataset, group_counts, grouped_stats, kpi_summary, within_group_percentages,
    PercentageBreakdown, SurveyConfig,
};
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// What to compute over the prepared dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// List numeric and categorical columns available for analysis
    Classify,
    /// Grouped descriptive statistics of a numeric column
    Stats,
    /// Within-group percentage breakdown of a categorical column
    Percentages,
    /// Top-line KPI summary
    Summary,
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Grouped statistics and within-group percentages for cohort survey data",
    long_about = "Computes grouped statistical summaries and within-group percentage\n\
                  distributions from a CSV export of the survey.\n\n\
                  EXAMPLES:\n  \
                  # What can be analyzed?\n  \
                  encuesta-metrics -i encuestas.csv -m classify\n\n  \
                  # Statistics of a numeric column per promotion/module\n  \
                  encuesta-metrics -i encuestas.csv -m stats -c \"Nota global\"\n\n  \
                  # Percentage breakdown, special filters applied automatically\n  \
                  encuesta-metrics -i encuestas.csv -m percentages -c \"¿Recomendarías Adalab a otras mujeres?\"\n\n  \
                  # KPI summary as JSON\n  \
                  encuesta-metrics -i encuestas.csv -m summary --json"
)]
struct Args {
    /// Path to the CSV file with survey responses
    #[arg(short, long)]
    input: String,

    /// Computation to run
    #[arg(short, long, value_enum)]
    mode: Mode,

    /// Column to analyze (required for stats and percentages modes)
    #[arg(short, long)]
    column: Option<String>,

    /// Group by these columns instead of the detected promotion/module keys
    #[arg(short, long)]
    group_by: Vec<String>,

    /// Restrict to these promotions (repeatable; default: all)
    #[arg(long)]
    promotion: Vec<String>,

    /// Restrict to these modules (repeatable; default: all)
    #[arg(long)]
    module: Vec<String>,

    /// Load the survey configuration from a JSON file instead of the built-in table
    #[arg(long)]
    config: Option<String>,

    /// Headline metric column for summary mode
    #[arg(long)]
    headline: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and the final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout (summary mode only)
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_csv_with_fallbacks(path: &str) -> Result<DataFrame> {
    use std::path::PathBuf;

    // Strategy 1: Standard loading with quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    // Strategy 2: Without quote handling
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(None))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()?;
    Ok(df)
}

fn load_config(args: &Args) -> Result<SurveyConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str::<SurveyConfig>(&raw)?
        }
        None => SurveyConfig::default(),
    };

    if let Some(headline) = &args.headline {
        config.headline_metric = Some(headline.clone());
    }

    config.validate().map_err(|e| anyhow!("{e}"))?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !std::path::Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = load_config(&args)?;

    info!("Loading dataset from: {}", args.input);
    let df = load_csv_with_fallbacks(&args.input)?;
    info!("Dataset loaded successfully: {:?}", df.shape());

    // Preparation: drop bookkeeping columns, resolve layout, add the
    // grouping helper, apply promotion/module selection
    let df = dataset::drop_ignored_columns(&df, &config);
    let layout = dataset::validate(&df, &config)?;
    if layout.has_module {
        info!("Grouping by promotion and module");
    } else {
        info!("Grouping by promotion only");
    }
    let df = dataset::with_grouping_helper(&df, &config, &layout)?;
    let df = dataset::apply_selection(&df, &config, &layout, &args.promotion, &args.module)?;

    if df.height() == 0 {
        warn!("Selection matched no rows");
    }

    let group_keys = if args.group_by.is_empty() {
        layout.group_keys.clone()
    } else {
        args.group_by.clone()
    };

    match args.mode {
        Mode::Classify => run_classify(&df, &layout),
        Mode::Stats => run_stats(&df, &args, &group_keys),
        Mode::Percentages => run_percentages(&df, &config, &args, &group_keys),
        Mode::Summary => run_summary(&df, &config, &layout, args.json),
    }
}

fn run_classify(df: &DataFrame, layout: &encuesta_metrics::DatasetLayout) -> Result<()> {
    let exclude: HashSet<String> = layout.excluded.iter().cloned().collect();
    let classes = classify(df, &exclude);

    println!("NUMERIC COLUMNS ({})", classes.numeric.len());
    for name in &classes.numeric {
        println!("  {name}");
    }
    println!("\nCATEGORICAL COLUMNS ({})", classes.categorical.len());
    for name in &classes.categorical {
        println!("  {name}");
    }
    Ok(())
}

fn run_stats(df: &DataFrame, args: &Args, group_keys: &[String]) -> Result<()> {
    let column = args
        .column
        .as_deref()
        .ok_or_else(|| anyhow!("--column is required for stats mode"))?;

    let stats = grouped_stats(df, column, group_keys)?;
    println!("{stats}");
    Ok(())
}

fn run_percentages(
    df: &DataFrame,
    config: &SurveyConfig,
    args: &Args,
    group_keys: &[String],
) -> Result<()> {
    let column = args
        .column
        .as_deref()
        .ok_or_else(|| anyhow!("--column is required for percentages mode"))?;

    if let Some(rule) = config.special_filter_for_header(column) {
        info!("Special filter applies: {}", rule.rationale);
    }
    let filter = config.module_filter_for_header(column);

    match within_group_percentages(df, column, group_keys, filter.as_ref())? {
        PercentageBreakdown::Table(table) => println!("{table}"),
        PercentageBreakdown::ColumnMissing => {
            return Err(anyhow!("Column '{column}' not found in dataset"));
        }
        PercentageBreakdown::EmptyAfterFilter => {
            println!("No responses for the required module; nothing to compute.");
        }
    }
    Ok(())
}

fn run_summary(
    df: &DataFrame,
    config: &SurveyConfig,
    layout: &encuesta_metrics::DatasetLayout,
    json: bool,
) -> Result<()> {
    let summary = kpi_summary(df, config, layout)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Total records:   {}", summary.total_records);
    println!("Promotions:      {}", summary.promotion_count);
    if let Some(modules) = summary.module_count {
        println!("Modules:         {modules}");
    }
    if let Some(headline) = &summary.headline {
        match headline.mean {
            Some(mean) => println!("Mean {}: {:.2}", headline.column, mean),
            None => println!("Mean {}: no data", headline.column),
        }
    }

    println!("\nRecords per promotion:");
    println!("{}", group_counts(df, config.promotion_header())?);
    if layout.has_module {
        println!("\nRecords per module:");
        println!("{}", group_counts(df, config.module_header())?);
    }
    Ok(())
}
