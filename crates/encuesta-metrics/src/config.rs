//! Configuration for the survey metrics core.
//!
//! The configuration is an explicitly constructed value passed into the
//! core's entry points; there is no mutable global state. [`SurveyConfig::default`]
//! reproduces the Adalab survey table (column headers, bookkeeping columns to
//! drop, and the special-filter registry), and the builder allows tests and
//! other deployments to swap in alternate tables.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Semantic key of the cohort ("Promoción") question.
pub const KEY_PROMOCION: &str = "promocion";
/// Semantic key of the course-unit ("Módulo") question.
pub const KEY_MODULO: &str = "modulo";

/// Default header strings, keyed by semantic question identifier.
///
/// Headers are the literal (accented, free-form) strings found in the
/// uploaded spreadsheet; the semantic keys are what the rest of the crate
/// works with, so a header rewording only touches this table.
static DEFAULT_HEADERS: Lazy<HashMap<String, String>> = Lazy::new(|| {
    [
        (
            KEY_PROMOCION,
            "Por favor, elige la promoción a la que perteneces",
        ),
        (KEY_MODULO, "Por favor, elige el módulo que vas a valorar"),
        (
            "expectativas",
            "¿Ha cumplido el Bootcamp de Data Analytics de Adalab tus expectativas?",
        ),
        (
            "expectativas_IA",
            "¿Los contenidos de los talleres han cumplido tus expectativas?",
        ),
        (
            "expectativas_PW",
            "¿Ha cumplido el Bootcamp de programación web de Adalab tus expectativas?",
        ),
        ("recomendacion", "¿Recomendarías Adalab a otras mujeres?"),
        (
            "recomendacion_IA",
            "¿Recomendarías estos talleres a otras alumnas?",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
});

/// A special-filter rule for one survey question.
///
/// Some questions are only meaningful in one module context (respondents of
/// other modules never saw them), so computing their percentages over the
/// whole dataset would dilute the denominator. A rule makes that business
/// constraint explicit and table-driven.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialFilter {
    /// Module value the computation must be restricted to.
    /// `None` means the rule is informational and no filtering is applied.
    pub module_value: Option<String>,
    /// Human-readable rationale shown to the presentation layer.
    pub rationale: String,
}

/// Configuration for the survey metrics core.
///
/// Use [`SurveyConfig::builder()`] to construct an alternate configuration,
/// or [`SurveyConfig::default()`] for the Adalab survey table.
///
/// # Example
///
/// ```rust,ignore
/// use encuesta_metrics::config::SurveyConfig;
///
/// let config = SurveyConfig::builder()
///     .header("promocion", "Cohort")
///     .header("modulo", "Unit")
///     .headline_metric("Overall score")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    /// Semantic question key -> exact spreadsheet header string.
    pub headers: HashMap<String, String>,

    /// Bookkeeping columns removed right after loading, when present.
    pub drop_columns: Vec<String>,

    /// Special-filter registry, keyed by semantic question key.
    /// At most one rule per question.
    pub special_filters: HashMap<String, SpecialFilter>,

    /// Numeric column used as the headline KPI metric.
    /// When `None`, no headline value is computed.
    pub headline_metric: Option<String>,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        let module_4 = |rationale: &str| SpecialFilter {
            module_value: Some("Módulo 4".to_string()),
            rationale: rationale.to_string(),
        };

        let special_filters = [
            (
                "expectativas".to_string(),
                module_4("Esta pregunta se calcula solo para el Módulo 4"),
            ),
            (
                "recomendacion".to_string(),
                module_4("Esta pregunta se calcula solo para el Módulo 4"),
            ),
            (
                "expectativas_PW".to_string(),
                module_4("Esta pregunta se calcula solo para el Módulo 4"),
            ),
            (
                "expectativas_IA".to_string(),
                SpecialFilter {
                    module_value: None,
                    rationale: "Esta pregunta se calcula para todos los módulos".to_string(),
                },
            ),
        ]
        .into_iter()
        .collect();

        Self {
            headers: DEFAULT_HEADERS.clone(),
            drop_columns: vec!["Submitted At".to_string(), "Token".to_string()],
            special_filters,
            headline_metric: None,
        }
    }
}

impl SurveyConfig {
    /// Create a new configuration builder pre-seeded with the defaults.
    pub fn builder() -> SurveyConfigBuilder {
        SurveyConfigBuilder::default()
    }

    /// Header string of the cohort column.
    pub fn promotion_header(&self) -> &str {
        self.headers
            .get(KEY_PROMOCION)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Header string of the module column.
    pub fn module_header(&self) -> &str {
        self.headers
            .get(KEY_MODULO)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Resolve a semantic question key to its header string.
    pub fn header(&self, question_key: &str) -> Option<&str> {
        self.headers.get(question_key).map(String::as_str)
    }

    /// Look up the special-filter rule for a semantic question key.
    ///
    /// Returns `None` when no rule is registered. A returned rule with
    /// `module_value == None` applies to all modules (informational only).
    pub fn special_filter(&self, question_key: &str) -> Option<&SpecialFilter> {
        self.special_filters.get(question_key)
    }

    /// Look up the special-filter rule for a raw column header.
    ///
    /// Headers are resolved back to semantic keys through the header table,
    /// so the same rule keeps applying when header text varies between
    /// deployments.
    pub fn special_filter_for_header(&self, header: &str) -> Option<&SpecialFilter> {
        self.special_filters.iter().find_map(|(key, rule)| {
            (self.headers.get(key).map(String::as_str) == Some(header)).then_some(rule)
        })
    }

    /// Build the row filter the percentage engine needs for a column header.
    ///
    /// Returns `None` when no rule exists or the rule carries no module
    /// value (no filtering required).
    pub fn module_filter_for_header(&self, header: &str) -> Option<crate::ModuleFilter> {
        let rule = self.special_filter_for_header(header)?;
        let module_value = rule.module_value.as_ref()?;
        Some(crate::ModuleFilter {
            column: self.module_header().to_string(),
            equals: module_value.clone(),
        })
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for key in [KEY_PROMOCION, KEY_MODULO] {
            match self.headers.get(key) {
                None => return Err(ConfigValidationError::MissingHeader(key.to_string())),
                Some(h) if h.trim().is_empty() => {
                    return Err(ConfigValidationError::MissingHeader(key.to_string()));
                }
                Some(_) => {}
            }
        }

        for key in self.special_filters.keys() {
            if !self.headers.contains_key(key) {
                return Err(ConfigValidationError::UnknownFilterKey(key.clone()));
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing or empty header for required question key '{0}'")]
    MissingHeader(String),

    #[error("Special filter registered for unknown question key '{0}'")]
    UnknownFilterKey(String),
}

/// Builder for [`SurveyConfig`] with fluent API.
///
/// Starts from the default Adalab table; every setter overrides one entry.
#[derive(Debug)]
pub struct SurveyConfigBuilder {
    config: SurveyConfig,
}

impl Default for SurveyConfigBuilder {
    fn default() -> Self {
        Self {
            config: SurveyConfig::default(),
        }
    }
}

impl SurveyConfigBuilder {
    /// Set the header string for a semantic question key.
    pub fn header(mut self, question_key: impl Into<String>, header: impl Into<String>) -> Self {
        self.config
            .headers
            .insert(question_key.into(), header.into());
        self
    }

    /// Replace the full header table.
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.config.headers = headers;
        self
    }

    /// Replace the list of bookkeeping columns dropped after loading.
    pub fn drop_columns(mut self, columns: Vec<String>) -> Self {
        self.config.drop_columns = columns;
        self
    }

    /// Register (or replace) a special-filter rule for a question key.
    pub fn special_filter(
        mut self,
        question_key: impl Into<String>,
        rule: SpecialFilter,
    ) -> Self {
        self.config
            .special_filters
            .insert(question_key.into(), rule);
        self
    }

    /// Remove every registered special-filter rule.
    pub fn clear_special_filters(mut self) -> Self {
        self.config.special_filters.clear();
        self
    }

    /// Set the headline KPI metric column.
    pub fn headline_metric(mut self, column: impl Into<String>) -> Self {
        self.config.headline_metric = Some(column.into());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<SurveyConfig, ConfigValidationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
