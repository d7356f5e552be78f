use crate::domain::model::{FollowerInfo, RawProfileBlob};
use crate::domain::sheet::{CellRef, RangeRef};
use crate::utils::error::{ExtractionError, Result, ScrapeError};
use async_trait::async_trait;

/// Whether a session may reuse persisted authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Persisted,
    /// Brand-new browser context; the driver re-authenticates if no session token is stored.
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: String,
    /// Set when the login flow stopped on a CAPTCHA or similar human check.
    pub needs_verification: bool,
}

/// Browser automation. Every call blocks until the browser settles or its own timeout fires.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn open_session(&self, mode: SessionMode) -> std::result::Result<SessionHandle, ScrapeError>;

    async fn search(&self, session: &SessionHandle, name: &str) -> std::result::Result<(), ScrapeError>;

    async fn scrape_profile(
        &self,
        session: &SessionHandle,
    ) -> std::result::Result<RawProfileBlob, ScrapeError>;

    async fn scrape_company_profile(
        &self,
        session: &SessionHandle,
    ) -> std::result::Result<RawProfileBlob, ScrapeError>;

    /// Navigates to a company page; `None` when the page exposes nothing usable.
    async fn follow_and_scrape_company(
        &self,
        session: &SessionHandle,
        url: &str,
    ) -> std::result::Result<Option<FollowerInfo>, ScrapeError>;

    async fn close_session(&self, session: &SessionHandle) -> std::result::Result<(), ScrapeError>;
}

/// Natural-language completion service used for field extraction.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> std::result::Result<String, ExtractionError>;

    fn model_name(&self) -> &str;
}

/// An HTML page fetched from the business registry, with the URL it was served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryPage {
    pub url: String,
    pub html: String,
}

#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn search(&self, company_name: &str) -> Result<RegistryPage>;

    async fn fetch(&self, url: &str) -> Result<RegistryPage>;
}

/// Tabular store holding the input names and receiving per-cell results.
#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn read(&self, range: &RangeRef) -> Result<Vec<Vec<String>>>;

    /// Single-cell update; last write wins.
    async fn write(&self, cell: &CellRef, value: &str) -> Result<()>;
}
