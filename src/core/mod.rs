pub mod company;
pub mod consolidate;
pub mod extractor;
pub mod gate;
pub mod merge;
pub mod orchestrator;
pub mod registry;
pub mod session;

pub use crate::domain::model::{CompanyInfo, ExtractedFields, InputRecord, OutputRow, RegistryInfo};
pub use crate::domain::ports::{BrowserDriver, LlmClient, RegistrySource, SheetStore};
pub use crate::utils::error::Result;
