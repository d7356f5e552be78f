pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::EnrichConfig;

pub use crate::adapters::{AnthropicClient, CsvSheet, GoogleSheets, HttpBrowserDriver, HttpRegistrySource};
pub use crate::core::orchestrator::{Orchestrator, RecordOutcome, RunSettings, RunSummary};
pub use crate::utils::error::{EnrichError, Result};
