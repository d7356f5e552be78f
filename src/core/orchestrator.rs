use crate::core::company::CompanyEnrichment;
use crate::core::consolidate::Consolidator;
use crate::core::extractor::FieldExtractor;
use crate::core::gate::ResumeGate;
use crate::core::merge::{build_row, MergeInputs};
use crate::core::registry::RegistryLookup;
use crate::core::session::{open_session, release_session};
use crate::domain::model::{ExtractedField, ExtractedFields, InputRecord, OutputRow};
use crate::domain::ports::{
    BrowserDriver, LlmClient, RegistrySource, SessionHandle, SessionMode, SheetStore,
};
use crate::domain::sheet::{CellRef, RangeRef};
use crate::utils::error::{EnrichError, Result};
use crate::utils::monitor::SystemMonitor;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Where the run reads from and writes to, and which records it covers.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub sheet_name: String,
    pub names_range: RangeRef,
    /// Sheet row of record index 0.
    pub row_offset: u32,
    pub start_index: usize,
    /// Inclusive.
    pub end_index: usize,
    pub inspect_after_registry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Session,
    Search,
    PersonScrape,
    Extraction,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Session => "session",
            Stage::Search => "search",
            Stage::PersonScrape => "person-scrape",
            Stage::Extraction => "extraction",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Skipped,
    Failed { stage: Stage, message: String },
    Written { cells: usize, company_attempts: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cells_written: usize,
    pub company_retries: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::Failed { .. } => self.failed += 1,
            RecordOutcome::Written {
                cells,
                company_attempts,
            } => {
                self.processed += 1;
                self.cells_written += cells;
                self.company_retries += company_attempts.saturating_sub(1) as usize;
            }
        }
    }
}

/// Drives records one at a time through scrape, extraction, company enrichment,
/// registry lookup and write-back. A failing record never stops the run.
pub struct Orchestrator {
    driver: Arc<dyn BrowserDriver>,
    sheet: Arc<dyn SheetStore>,
    extractor: Arc<FieldExtractor>,
    consolidator: Arc<Consolidator>,
    company: CompanyEnrichment,
    registry: RegistryLookup,
    gate: Option<Arc<ResumeGate>>,
    monitor: SystemMonitor,
    settings: RunSettings,
}

impl Orchestrator {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        llm: Arc<dyn LlmClient>,
        registry: Arc<dyn RegistrySource>,
        sheet: Arc<dyn SheetStore>,
        consolidator: Consolidator,
        settings: RunSettings,
    ) -> Self {
        let extractor = Arc::new(FieldExtractor::new(llm));
        let consolidator = Arc::new(consolidator);
        Self {
            company: CompanyEnrichment::new(driver.clone(), extractor.clone(), consolidator.clone(), None),
            registry: RegistryLookup::new(registry),
            driver,
            sheet,
            extractor,
            consolidator,
            gate: None,
            monitor: SystemMonitor::new(false),
            settings,
        }
    }

    /// Enables manual-verification and inspection pauses.
    pub fn with_gate(mut self, gate: Arc<ResumeGate>) -> Self {
        self.company = CompanyEnrichment::new(
            self.driver.clone(),
            self.extractor.clone(),
            self.consolidator.clone(),
            Some(gate.clone()),
        );
        self.gate = Some(gate);
        self
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        self
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn row_for(&self, index: usize) -> u32 {
        index as u32 + self.settings.row_offset
    }

    /// Reads the names column. Failure here is a setup error and ends the run.
    pub async fn read_records(&self) -> Result<Vec<InputRecord>> {
        let rows = self.sheet.read(&self.settings.names_range).await?;
        tracing::info!("Read {} rows from {}", rows.len(), self.settings.names_range);
        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                let name = row.into_iter().next().unwrap_or_default();
                InputRecord::new(index, name.trim())
            })
            .collect())
    }

    /// Records inside the configured index window, in input order.
    pub fn select<'a>(&self, records: &'a [InputRecord]) -> Vec<&'a InputRecord> {
        records
            .iter()
            .filter(|r| r.index >= self.settings.start_index && r.index <= self.settings.end_index)
            .collect()
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let records = self.read_records().await?;
        Ok(self.run_records(&records).await)
    }

    pub async fn run_records(&self, records: &[InputRecord]) -> RunSummary {
        let mut summary = RunSummary::default();
        for record in self.select(records) {
            let outcome = self.process_record(record).await;
            summary.record(&outcome);
            self.monitor.log_record(record.index, &record.name);
        }
        self.monitor.log_final_stats();
        tracing::info!(
            "Run finished: {} processed, {} skipped, {} failed, {} cells written, {} company retries",
            summary.processed,
            summary.skipped,
            summary.failed,
            summary.cells_written,
            summary.company_retries
        );
        summary
    }

    pub async fn process_record(&self, record: &InputRecord) -> RecordOutcome {
        if record.is_blank() {
            tracing::debug!("Skipping empty name at index {}", record.index);
            return RecordOutcome::Skipped;
        }
        let span = tracing::info_span!("record", name = %record.name, index = record.index);
        self.process_named(record).instrument(span).await
    }

    async fn process_named(&self, record: &InputRecord) -> RecordOutcome {
        tracing::info!("Processing: {}", record.name);

        let session = match open_session(self.driver.as_ref(), SessionMode::Persisted, self.gate.as_deref()).await {
            Ok(session) => session,
            Err(e) => return self.fail(record, Stage::Session, e),
        };
        self.process_with_session(record, session).await
    }

    /// Takes ownership of the record's session and releases it once the browser
    /// is no longer needed, on every path.
    async fn process_with_session(&self, record: &InputRecord, session: SessionHandle) -> RecordOutcome {
        let name = record.name.as_str();

        if let Err(e) = self.driver.search(&session, name).await {
            release_session(self.driver.as_ref(), &session).await;
            return self.fail(record, Stage::Search, e.into());
        }
        let person = match self.driver.scrape_profile(&session).await {
            Ok(profile) => profile,
            Err(e) => {
                release_session(self.driver.as_ref(), &session).await;
                return self.fail(record, Stage::PersonScrape, e.into());
            }
        };

        let text = self.consolidator.person_text(&person);
        let person_fields = match self.extractor.extract(&text).await {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!(
                    record = %record.name,
                    stage = %Stage::Extraction,
                    "Person extraction failed, continuing with scraped fields only: {}",
                    e
                );
                ExtractedFields::default()
            }
        };
        tracing::info!(
            "name: {} | worksAt: {} | companyPage: {} | companyWebsite: {} | companyName: {} | entityType: {} | abnStatus: {}",
            name,
            person_fields.get(ExtractedField::WorksAt),
            person_fields.get(ExtractedField::CompanyPage),
            person_fields.get(ExtractedField::CompanyWebsite),
            person_fields.get(ExtractedField::CompanyName),
            person_fields.get(ExtractedField::EntityType),
            person_fields.get(ExtractedField::RegistryStatus),
        );

        let company = match person_fields.non_empty(ExtractedField::CompanyPage) {
            Some(url) => Some(self.company.enrich(session, url).await),
            None => {
                tracing::debug!("No company page found for {}, skipping company scrape", name);
                release_session(self.driver.as_ref(), &session).await;
                None
            }
        };

        let company_name = company
            .as_ref()
            .and_then(|c| c.company_name())
            .or_else(|| person_fields.non_empty(ExtractedField::CompanyName))
            .map(str::to_string);

        let registry = match company_name {
            Some(company_name) => Some(self.registry.lookup(&company_name).await),
            None => None,
        };

        if registry.is_some() && self.settings.inspect_after_registry {
            if let Some(gate) = &self.gate {
                if let Err(e) = gate.wait("Registry lookup finished; inspect the result").await {
                    tracing::warn!("Inspection pause for {} ended without a signal: {}", name, e);
                }
            }
        }

        let row = build_row(
            self.row_for(record.index),
            &MergeInputs {
                person: &person,
                person_fields: &person_fields,
                company: company.as_ref(),
                registry: registry.as_ref(),
            },
        );

        match self.write_row(&row).await {
            Ok(cells) => {
                tracing::info!("Done: {}", name);
                RecordOutcome::Written {
                    cells,
                    company_attempts: company.map(|c| c.attempts).unwrap_or(0),
                }
            }
            Err(e) => self.fail(record, Stage::Write, e),
        }
    }

    /// One independent single-cell write per column. The first failure stops the
    /// remaining writes for this row.
    pub async fn write_row(&self, row: &OutputRow) -> Result<usize> {
        let mut written = 0;
        for (column, value) in &row.cells {
            let cell = CellRef::new(&self.settings.sheet_name, column.letter(), row.row);
            tracing::debug!("Writing to sheet: {} = {:?}", cell, value);
            if let Err(e) = self.sheet.write(&cell, value).await {
                tracing::error!(
                    "Sheet write to {} failed after {} of {} cells: {}",
                    cell,
                    written,
                    row.len(),
                    e
                );
                return Err(e);
            }
            written += 1;
        }
        Ok(written)
    }

    fn fail(&self, record: &InputRecord, stage: Stage, error: EnrichError) -> RecordOutcome {
        tracing::error!(
            record = %record.name,
            index = record.index,
            stage = %stage,
            category = ?error.category(),
            "Record failed: {}",
            error
        );
        RecordOutcome::Failed {
            stage,
            message: error.to_string(),
        }
    }
}
