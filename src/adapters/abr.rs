//! Australian Business Register lookups over plain HTTP.

use crate::domain::ports::{RegistryPage, RegistrySource};
use crate::utils::error::{EnrichError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://abr.business.gov.au";
const SEARCH_PATH: &str = "/Search/ResultsActive";

pub struct HttpRegistrySource {
    client: Client,
    base_url: String,
}

impl HttpRegistrySource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, request: reqwest::RequestBuilder) -> Result<RegistryPage> {
        let response = request.send().await?;
        let status = response.status();
        // Redirects are followed, so record where the page actually came from.
        let url = response.url().to_string();
        if !status.is_success() {
            return Err(EnrichError::RegistryError {
                message: format!("{} returned {}", url, status),
            });
        }
        let html = response.text().await?;
        Ok(RegistryPage { url, html })
    }
}

#[async_trait]
impl RegistrySource for HttpRegistrySource {
    async fn search(&self, company_name: &str) -> Result<RegistryPage> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        tracing::debug!("[registry] GET {}?SearchText={}", url, company_name);
        self.get(self.client.get(url).query(&[("SearchText", company_name)]))
            .await
    }

    async fn fetch(&self, url: &str) -> Result<RegistryPage> {
        tracing::debug!("[registry] GET {}", url);
        self.get(self.client.get(url)).await
    }
}
