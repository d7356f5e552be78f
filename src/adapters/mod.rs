// Adapters layer: concrete implementations of the domain ports for external systems.

pub mod abr;
pub mod anthropic;
pub mod browser;
pub mod sheets;

pub use abr::HttpRegistrySource;
pub use anthropic::{AnthropicClient, AnthropicSettings};
pub use browser::HttpBrowserDriver;
pub use sheets::{CsvSheet, GoogleSheets};
