use crate::config::lookups::Lookups;
use crate::domain::model::DateRange;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_required_field,
    validate_resolved, Validate,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub lookups: Lookups,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    #[serde(default = "default_title")]
    pub title: String,
    /// Start date used when no explicit period start is given.
    #[serde(default = "default_start")]
    pub default_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    /// Defaults to today when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            title: default_title(),
            default_start: default_start(),
            start: None,
            end: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
    #[serde(default = "default_access_user_id")]
    pub access_user_id: i64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            access_user_id: default_access_user_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Write SUMIFS formulas (with cached values) instead of plain values.
    #[serde(default = "default_true")]
    pub formulas: bool,
    #[serde(default = "default_outflow_label")]
    pub outflow_label: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            formulas: true,
            outflow_label: default_outflow_label(),
        }
    }
}

fn default_title() -> String {
    "Relatório Consolidado".to_string()
}

fn default_start() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2025, 1, 1)
}

fn default_database_path() -> String {
    "${FECHAMENTO_DB_PATH}".to_string()
}

fn default_access_user_id() -> i64 {
    1
}

fn default_output_path() -> String {
    "./output".to_string()
}

fn default_true() -> bool {
    true
}

fn default_outflow_label() -> String {
    "Saídas".to_string()
}

impl ReportConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReportError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ReportError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay
    /// as-is so validation can name them.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
        let re = PLACEHOLDER
            .get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// Also resolves `${VAR}` in the shipped defaults, which never pass
    /// through the TOML text.
    pub fn resolve_env(&mut self) {
        self.database.path = Self::substitute_env_vars(&self.database.path);
        self.output.path = Self::substitute_env_vars(&self.output.path);
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ReportError::ConfigError {
            message: format!("TOML serialization error: {}", e),
        })
    }

    pub fn period_start(&self) -> Option<NaiveDate> {
        self.report.start.or(self.report.default_start)
    }

    pub fn period_end(&self) -> NaiveDate {
        self.report
            .end
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_resolved("database.path", &self.database.path)?;
        validate_path("database.path", &self.database.path)?;
        validate_positive_number("database.access_user_id", self.database.access_user_id, 1)?;

        validate_resolved("output.path", &self.output.path)?;
        validate_path("output.path", &self.output.path)?;

        validate_non_empty_string("summary.outflow_label", &self.summary.outflow_label)?;

        if self.lookups.companies.is_empty() {
            return Err(ReportError::MissingConfigError {
                field: "lookups.companies".to_string(),
            });
        }
        self.lookups.validate()?;

        self.date_range().map(|_| ())
    }
}

impl ConfigProvider for ReportConfig {
    fn date_range(&self) -> Result<DateRange> {
        let period_start = self.period_start();
        let start = validate_required_field("report.start", &period_start)?;
        DateRange::new(*start, self.period_end())
    }

    fn database_path(&self) -> &str {
        &self.database.path
    }

    fn access_user_id(&self) -> i64 {
        self.database.access_user_id
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn lookups(&self) -> &Lookups {
        &self.lookups
    }

    fn summary_formulas(&self) -> bool {
        self.summary.formulas
    }

    fn outflow_label(&self) -> &str {
        &self.summary.outflow_label
    }
}

impl Validate for ReportConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
