use crate::config::toml_config::ReportConfig;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::NaiveDate;
use clap::Parser;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "fechamento.toml";

#[derive(Debug, Clone, Parser)]
#[command(name = "fechamento-report")]
#[command(about = "Consolidated cash-closing report as a multi-sheet xlsx")]
pub struct CliConfig {
    /// Path to TOML configuration file [default: fechamento.toml]
    #[arg(short, long)]
    pub config: Option<String>,

    /// First day of the period (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day of the period (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Override database.path
    #[arg(long)]
    pub database: Option<String>,

    /// Override output.path
    #[arg(long)]
    pub output_path: Option<String>,

    /// CSV with account → bucket label pairs
    #[arg(long)]
    pub categories_file: Option<String>,

    /// CSV with company id → name pairs
    #[arg(long)]
    pub companies_file: Option<String>,

    /// Write summary aggregates as plain values, without formulas
    #[arg(long)]
    pub values_only: bool,

    /// Show configuration and queries without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    pub print_default_config: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliConfig {
    /// The named file, or the default location when none was given.
    pub fn config_path(&self) -> &str {
        self.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH)
    }

    /// Command line values win over the file.
    pub fn apply_overrides(&self, config: &mut ReportConfig) {
        if let Some(start) = self.start {
            config.report.start = Some(start);
        }
        if let Some(end) = self.end {
            config.report.end = Some(end);
        }
        if let Some(database) = &self.database {
            config.database.path = database.clone();
        }
        if let Some(output_path) = &self.output_path {
            config.output.path = output_path.clone();
        }
        if let Some(file) = &self.categories_file {
            config.lookups.categories_file = Some(file.clone());
        }
        if let Some(file) = &self.companies_file {
            config.lookups.companies_file = Some(file.clone());
        }
        if self.values_only {
            config.summary.formulas = false;
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }
}
