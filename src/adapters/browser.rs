//! Client for a browser-automation sidecar that owns the real browser sessions
//! and exposes them over a small JSON API.

use crate::domain::model::{FollowerInfo, RawProfileBlob};
use crate::domain::ports::{BrowserDriver, SessionHandle, SessionMode};
use crate::utils::error::{EnrichError, ScrapeError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CRASH_SIGNATURE: &str = "RESULT_CODE_KILLED_BAD_MESSAGE";

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session_id: String,
    #[serde(default)]
    needs_verification: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    kind: Option<String>,
}

pub struct HttpBrowserDriver {
    client: Client,
    endpoint: String,
    crash_signature: String,
}

impl HttpBrowserDriver {
    pub fn new(endpoint: &str, timeout: Duration, crash_signature: &str) -> Result<Self, EnrichError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            crash_signature: crash_signature.to_string(),
        })
    }

    fn session_url(&self, session: &SessionHandle, action: &str) -> String {
        if action.is_empty() {
            format!("{}/sessions/{}", self.endpoint, session.id)
        } else {
            format!("{}/sessions/{}/{}", self.endpoint, session.id, action)
        }
    }

    /// Decides once, here, whether a failure is a renderer crash.
    pub fn classify(&self, message: &str, kind: Option<&str>) -> ScrapeError {
        let crashed = kind == Some("session_crash")
            || (!self.crash_signature.is_empty() && message.contains(&self.crash_signature));
        if crashed {
            ScrapeError::SessionCrash(message.to_string())
        } else if kind == Some("timeout") {
            ScrapeError::Timeout(message.to_string())
        } else {
            ScrapeError::Other(message.to_string())
        }
    }

    async fn call(&self, request: RequestBuilder) -> Result<Response, ScrapeError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ScrapeError::Timeout(e.to_string())
            } else {
                self.classify(&e.to_string(), None)
            }
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(err) => Err(self.classify(&format!("{}: {}", status, err.error), err.kind.as_deref())),
            Err(_) => Err(self.classify(&format!("{}: {}", status, body), None)),
        }
    }

    async fn call_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ScrapeError> {
        let response = self.call(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ScrapeError::Other(format!("invalid sidecar response: {}", e)))
    }
}

#[async_trait]
impl BrowserDriver for HttpBrowserDriver {
    async fn open_session(&self, mode: SessionMode) -> Result<SessionHandle, ScrapeError> {
        let mode = match mode {
            SessionMode::Persisted => "persisted",
            SessionMode::Fresh => "fresh",
        };
        let created: SessionResponse = self
            .call_json(
                self.client
                    .post(format!("{}/sessions", self.endpoint))
                    .json(&serde_json::json!({ "mode": mode })),
            )
            .await?;
        Ok(SessionHandle {
            id: created.session_id,
            needs_verification: created.needs_verification,
        })
    }

    async fn search(&self, session: &SessionHandle, name: &str) -> Result<(), ScrapeError> {
        tracing::debug!("[browser] Searching for: {}", name);
        self.call(
            self.client
                .post(self.session_url(session, "search"))
                .json(&serde_json::json!({ "name": name })),
        )
        .await?;
        Ok(())
    }

    async fn scrape_profile(&self, session: &SessionHandle) -> Result<RawProfileBlob, ScrapeError> {
        self.call_json(self.client.get(self.session_url(session, "profile")))
            .await
    }

    async fn scrape_company_profile(&self, session: &SessionHandle) -> Result<RawProfileBlob, ScrapeError> {
        self.call_json(self.client.get(self.session_url(session, "company-profile")))
            .await
    }

    async fn follow_and_scrape_company(
        &self,
        session: &SessionHandle,
        url: &str,
    ) -> Result<Option<FollowerInfo>, ScrapeError> {
        let response = self
            .call(
                self.client
                    .post(self.session_url(session, "company"))
                    .json(&serde_json::json!({ "url": url })),
            )
            .await?;
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        response
            .json::<Option<FollowerInfo>>()
            .await
            .map_err(|e| ScrapeError::Other(format!("invalid sidecar response: {}", e)))
    }

    async fn close_session(&self, session: &SessionHandle) -> Result<(), ScrapeError> {
        self.call(self.client.delete(self.session_url(session, ""))).await?;
        Ok(())
    }
}
