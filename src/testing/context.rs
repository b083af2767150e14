//! Per-scenario state
//!
//! Everything a scenario step needs from earlier steps (the last request and
//! the last response) lives here. A fresh context is created for every
//! scenario and dropped when it finishes.

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use crate::common::{Error, Result};
use crate::scheduler::{RunSeed, ScenarioFile};

/// Default limit on a single request made through a context
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A request as it was sent
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// A response as it was received
#[derive(Debug, Clone)]
pub struct RecordedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RecordedResponse {
    /// Parse the body as JSON
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Scoped state passed to every step of one scenario
#[derive(Debug)]
pub struct ScenarioContext {
    client: reqwest::Client,
    base_url: String,
    seed: RunSeed,
    scenario: Option<ScenarioFile>,
    last_request: Option<RecordedRequest>,
    last_response: Option<RecordedResponse>,
}

impl ScenarioContext {
    pub fn new(base_url: &str, seed: RunSeed) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(Error::Http)?;
        Ok(Self::with_client(client, base_url, seed))
    }

    /// Context reusing an existing connection pool
    pub fn with_client(client: reqwest::Client, base_url: &str, seed: RunSeed) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            seed,
            scenario: None,
            last_request: None,
            last_response: None,
        }
    }

    /// Fresh context for `scenario`, sharing this context's client
    pub fn for_scenario(&self, scenario: &ScenarioFile) -> Self {
        let mut ctx = Self::with_client(self.client.clone(), &self.base_url, self.seed);
        ctx.scenario = Some(scenario.clone());
        ctx
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn seed(&self) -> RunSeed {
        self.seed
    }

    pub fn scenario(&self) -> Option<&ScenarioFile> {
        self.scenario.as_ref()
    }

    pub fn last_request(&self) -> Option<&RecordedRequest> {
        self.last_request.as_ref()
    }

    pub fn last_response(&self) -> Option<&RecordedResponse> {
        self.last_response.as_ref()
    }

    /// Absolute URL for a service path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request, remembering it and its response
    pub async fn send(
        &mut self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<&RecordedResponse> {
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = &body {
            request = request.json(body);
        }

        self.last_request = Some(RecordedRequest {
            method,
            path: path.to_string(),
            body,
        });
        self.last_response = None;

        let response = request.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok(&*self.last_response.insert(RecordedResponse {
            status,
            content_type,
            body,
        }))
    }

    /// Assert the status of the last response
    pub fn expect_status(&self, expected: u16) -> Result<()> {
        let response = self.last_response.as_ref().ok_or_else(|| {
            Error::TestAssertion("No response recorded - was a request sent first?".to_string())
        })?;
        if response.status != expected {
            let request = self
                .last_request
                .as_ref()
                .map(|r| format!("{} {}", r.method, r.path))
                .unwrap_or_default();
            return Err(Error::TestAssertion(format!(
                "{} expected status {}, got {}",
                request, expected, response.status
            )));
        }
        Ok(())
    }
}
