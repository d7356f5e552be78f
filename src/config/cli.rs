use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "lead-enrich")]
#[command(about = "Enrich a spreadsheet of lead names with social profile and business registry data")]
pub struct CliConfig {
    #[arg(short, long, default_value = "configs/enrich.toml", help = "TOML configuration file")]
    pub config: PathBuf,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process memory and CPU after each record")]
    pub monitor: bool,

    #[arg(long, help = "First record index to process (overrides run.start_index)")]
    pub start: Option<usize>,

    #[arg(long, help = "Last record index to process, inclusive (overrides run.end_index)")]
    pub end: Option<usize>,

    #[arg(long, help = "Read the sheet and list the records that would be processed")]
    pub dry_run: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub log_json: bool,
}

impl CliConfig {
    /// Applies command-line overrides on top of the file configuration.
    pub fn apply_to(&self, config: &mut super::EnrichConfig) {
        if let Some(start) = self.start {
            config.run.start_index = start;
        }
        if let Some(end) = self.end {
            config.run.end_index = end;
        }
        if self.monitor {
            config.monitoring = Some(super::MonitoringConfig { enabled: true });
        }
    }
}
