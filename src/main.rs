use clap::Parser;
use fechamento_report::core::queries::report_queries;
use fechamento_report::domain::ports::ConfigProvider;
use fechamento_report::utils::error::{ErrorSeverity, ReportError};
use fechamento_report::utils::{logger, validation::Validate};
use fechamento_report::{
    CliConfig, LocalStorage, ReportConfig, ReportEngine, ReportPipeline, SqliteConnector,
};
use std::path::Path;

fn exit_code(e: &ReportError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: ReportError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(&e));
}

/// A missing file at the default location means "run with defaults"; a
/// missing file the user named is an error.
fn load_config(cli: &CliConfig) -> Result<ReportConfig, ReportError> {
    let path = cli.config_path();
    if Path::new(path).exists() {
        tracing::info!("📄 Loading configuration from {}", path);
        return ReportConfig::from_file(path);
    }
    if cli.config.is_some() {
        return Err(ReportError::ConfigError {
            message: format!("configuration file not found: {}", path),
        });
    }
    tracing::warn!("⚠️ {} not found, using built-in defaults", path);
    Ok(ReportConfig::default())
}

fn print_dry_run(config: &ReportConfig) -> Result<(), ReportError> {
    let range = config.date_range()?;
    println!("{}", config.report.title);
    println!("Período: {}", range.label());
    println!("Banco: {} (usuário {})", config.database.path, config.database.access_user_id);
    println!("Saída: {}", config.output.path);
    println!(
        "Empresas: {}",
        config
            .lookups
            .companies
            .iter()
            .map(|c| format!("{} {}", c.id, c.name))
            .collect::<Vec<_>>()
            .join(", ")
    );
    for query in report_queries(&config.lookups.company_ids()) {
        println!("\n-- {}\n{};", query.id.sheet_name(), query.sql);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    if cli.print_default_config {
        let text = ReportConfig::default().to_toml_string().unwrap_or_else(|e| fail(e));
        print!("{}", text);
        return Ok(());
    }

    tracing::info!("Starting fechamento-report");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let mut config = load_config(&cli).unwrap_or_else(|e| fail(e));
    cli.apply_overrides(&mut config);
    config.resolve_env();
    if let Err(e) = config.lookups.load_files() {
        fail(e);
    }
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(e);
    }

    let range = config.date_range().unwrap_or_else(|e| fail(e));
    tracing::info!("📅 Period: {}", range.label());
    tracing::info!(
        "🗄️ Database: {} (access user {})",
        config.database.path,
        config.database.access_user_id
    );
    tracing::info!("📝 {}", config.report.title);

    if cli.dry_run {
        if let Err(e) = print_dry_run(&config) {
            fail(e);
        }
        return Ok(());
    }

    let storage = LocalStorage::new(config.output.path.clone());
    let connector = SqliteConnector::new(config.database.path.clone());
    let pipeline = ReportPipeline::new(storage, config, connector);
    let engine = ReportEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Report generated successfully!");
            println!("✅ Relatório gerado: {}", output_path);
            Ok(())
        }
        Err(e) => {
            if let Some(stage) = engine.failed_during() {
                eprintln!("⏹️ Etapa: {}", stage);
            }
            fail(e)
        }
    }
}
