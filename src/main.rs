use clap::Parser;
use lead_enrich::config::SheetBackend;
use lead_enrich::core::gate::{spawn_stdin_trigger, ResumeGate};
use lead_enrich::domain::ports::SheetStore;
use lead_enrich::utils::error::{EnrichError, ErrorSeverity};
use lead_enrich::utils::{logger, validation::Validate};
use lead_enrich::{
    AnthropicClient, CliConfig, CsvSheet, EnrichConfig, GoogleSheets, HttpBrowserDriver,
    HttpRegistrySource, Orchestrator, Result, RunSummary,
};
use std::sync::Arc;
use tracing::Instrument;

fn build_sheet(config: &EnrichConfig) -> Result<Arc<dyn SheetStore>> {
    Ok(match config.sheet.backend {
        SheetBackend::Csv => {
            let path = config.sheet.path.clone().unwrap_or_default();
            Arc::new(CsvSheet::new(path))
        }
        SheetBackend::Google => Arc::new(GoogleSheets::new(
            config.sheets_endpoint(),
            config.sheet.spreadsheet_id.as_deref().unwrap_or_default(),
            config.sheet.access_token.as_deref().unwrap_or_default(),
            config.sheet_timeout(),
        )?),
    })
}

fn build_orchestrator(config: &EnrichConfig) -> Result<Orchestrator> {
    let driver = Arc::new(HttpBrowserDriver::new(
        &config.browser.endpoint,
        config.browser_timeout(),
        &config.browser.crash_signature,
    )?);
    let llm = Arc::new(AnthropicClient::new(config.anthropic_settings())?);
    let registry = Arc::new(HttpRegistrySource::new(
        &config.registry.base_url,
        config.registry_timeout(),
    )?);

    Ok(Orchestrator::new(
        driver,
        llm,
        registry,
        build_sheet(config)?,
        config.consolidator(),
        config.run_settings()?,
    )
    .with_monitoring(config.monitoring_enabled()))
}

async fn run(cli: &CliConfig) -> Result<Option<RunSummary>> {
    let mut config = EnrichConfig::from_file(&cli.config)?;
    cli.apply_to(&mut config);
    config.validate()?;
    if cli.verbose {
        tracing::debug!("Run config: {:?}", config.run);
    }

    let orchestrator = build_orchestrator(&config)?;

    if cli.dry_run {
        let records = orchestrator.read_records().await?;
        let selected = orchestrator.select(&records);
        tracing::info!("🧪 Dry run: {} of {} records selected", selected.len(), records.len());
        for record in selected {
            println!(
                "{:>4}  row {:>4}  {}",
                record.index,
                orchestrator.row_for(record.index),
                if record.is_blank() { "(blank, skipped)" } else { record.name.as_str() }
            );
        }
        return Ok(None);
    }

    let (gate, trigger) = ResumeGate::channel();
    spawn_stdin_trigger(trigger);
    let orchestrator = orchestrator.with_gate(Arc::new(gate));

    orchestrator.run().await.map(Some)
}

fn exit_code(e: &EnrichError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let run_id = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    tracing::info!("Starting lead-enrich run {} with {}", run_id, cli.config.display());

    let span = tracing::info_span!("run", run_id = %run_id);
    match run(&cli).instrument(span).await {
        Ok(Some(summary)) => {
            println!(
                "✅ Run {} finished: {} processed, {} skipped, {} failed, {} cells written",
                run_id, summary.processed, summary.skipped, summary.failed, summary.cells_written
            );
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(
                "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let code = exit_code(&e);
            if code > 0 {
                std::process::exit(code);
            }
        }
    }
}
