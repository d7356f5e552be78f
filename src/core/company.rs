use crate::core::consolidate::Consolidator;
use crate::core::extractor::FieldExtractor;
use crate::core::gate::ResumeGate;
use crate::core::session::{open_session, release_session};
use crate::domain::model::{CompanyInfo, ExtractedFields};
use crate::domain::ports::{BrowserDriver, SessionHandle, SessionMode};
use crate::utils::error::ScrapeError;
use std::sync::Arc;

/// Scrapes a company page and runs the company-side extraction. A session crash
/// triggers exactly one retry on a brand-new session; anything else fails the
/// stage immediately. Never returns an error: failures land in `CompanyInfo::error`.
pub struct CompanyEnrichment {
    driver: Arc<dyn BrowserDriver>,
    extractor: Arc<FieldExtractor>,
    consolidator: Arc<Consolidator>,
    gate: Option<Arc<ResumeGate>>,
}

impl CompanyEnrichment {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        extractor: Arc<FieldExtractor>,
        consolidator: Arc<Consolidator>,
        gate: Option<Arc<ResumeGate>>,
    ) -> Self {
        Self {
            driver,
            extractor,
            consolidator,
            gate,
        }
    }

    /// Takes over the record's session and releases it before returning. A
    /// crashed session is discarded before the recovery session is opened.
    pub async fn enrich(&self, session: SessionHandle, page_url: &str) -> CompanyInfo {
        let outcome = self.attempt(&session, page_url).await;
        release_session(self.driver.as_ref(), &session).await;

        match outcome {
            Ok(info) => info.with_attempts(1),
            Err(ScrapeError::SessionCrash(message)) => {
                tracing::warn!(
                    stage = "company",
                    "Page crashed ({}), retrying once with a new browser session",
                    message
                );
                self.recover(page_url).await
            }
            Err(e) => {
                tracing::error!(stage = "company", "Scrape of {} failed: {}", page_url, e);
                CompanyInfo::failed(page_url, e.to_string(), 1)
            }
        }
    }

    async fn recover(&self, page_url: &str) -> CompanyInfo {
        let fresh = match open_session(self.driver.as_ref(), SessionMode::Fresh, self.gate.as_deref()).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(stage = "company", "Could not open a recovery session: {}", e);
                return CompanyInfo::failed(page_url, e.to_string(), 1);
            }
        };

        let outcome = self.attempt(&fresh, page_url).await;
        release_session(self.driver.as_ref(), &fresh).await;

        match outcome {
            Ok(info) => {
                tracing::debug!(stage = "company", "Scrape result after retry: {:?}", info);
                info.with_attempts(2)
            }
            Err(e) => {
                tracing::error!(stage = "company", "Scrape of {} failed after retry: {}", page_url, e);
                CompanyInfo::failed(page_url, e.to_string(), 2)
            }
        }
    }

    async fn attempt(&self, session: &SessionHandle, page_url: &str) -> Result<CompanyInfo, ScrapeError> {
        let followers = self.driver.follow_and_scrape_company(session, page_url).await?;
        let profile = self.driver.scrape_company_profile(session).await?;
        tracing::debug!(stage = "company", "Raw extracted fields: {:?}", profile);

        let text = self.consolidator.company_text(&profile);
        tracing::debug!(stage = "company", "Text sent to extraction:\n{}", text);

        let mut extracted = match self.extractor.extract(&text).await {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!(stage = "company", "Extraction failed for {}: {}", page_url, e);
                ExtractedFields::default()
            }
        };
        extracted.strip_relationship();

        Ok(CompanyInfo {
            page_url: page_url.to_string(),
            followers,
            profile: Some(profile),
            extracted,
            error: None,
            attempts: 0,
        })
    }
}

impl CompanyInfo {
    fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}
