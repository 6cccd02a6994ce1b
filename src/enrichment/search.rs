//! Brave Search web client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::error::ensure_success;
use crate::TravelPlanError;
use super::{EnrichmentError, USER_AGENT, WebSearch};
use crate::config::SearchConfig;

/// Web search through the Brave Search API
pub struct BraveSearchClient {
    client: Client,
    base_url: String,
    api_key: String,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    web: Option<WebResults>,
}

#[derive(Debug, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<WebResult>,
}

#[derive(Debug, Deserialize)]
struct WebResult {
    description: Option<String>,
}

impl BraveSearchClient {
    pub fn new(config: &SearchConfig, api_key: String) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(USER_AGENT)
            .build()
            .map_err(TravelPlanError::client("Brave Search"))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            count: config.count,
        })
    }
}

#[async_trait]
impl WebSearch for BraveSearchClient {
    #[instrument(skip(self), fields(count = self.count))]
    async fn search(&self, query: &str) -> Result<Vec<String>, EnrichmentError> {
        let url = format!("{}/web/search", self.base_url);
        let count = self.count.to_string();

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await
            .map_err(EnrichmentError::classify)?;

        let response = ensure_success(response).await?;
        let body: SearchResponse = response.json().await.map_err(EnrichmentError::classify)?;

        let descriptions: Vec<String> = body
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|result| result.description)
            .map(|description| strip_highlight(&description))
            .filter(|description| !description.is_empty())
            .collect();

        debug!(results = descriptions.len(), "Web search finished");
        if descriptions.is_empty() {
            return Err(EnrichmentError::NoResults);
        }
        Ok(descriptions)
    }
}

/// Remove the `<strong>` markup Brave wraps around matched terms
fn strip_highlight(description: &str) -> String {
    description
        .replace("<strong>", "")
        .replace("</strong>", "")
        .trim()
        .to_string()
}
