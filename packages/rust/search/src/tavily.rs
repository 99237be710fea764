use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use hazfill_core::{SearchResponse, Searcher};
use hazfill_shared::{HazfillError, Result, SearchConfig};

use crate::{build_client, check_status, endpoint};

/// Tavily-compatible web search over `POST {base_url}/search`.
pub struct TavilySearcher {
    client: Client,
    url: String,
    api_key: String,
    max_results: usize,
    search_depth: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_domains: Option<&'a [String]>,
}

impl TavilySearcher {
    pub fn new(config: &SearchConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: endpoint(&config.base_url, "search")?,
            api_key: api_key.into(),
            max_results: config.max_results,
            search_depth: config.search_depth.clone(),
        })
    }
}

#[async_trait]
impl Searcher for TavilySearcher {
    #[instrument(skip_all, fields(query = %query, domains = domains.map_or(0, <[String]>::len)))]
    async fn search(&self, query: &str, domains: Option<&[String]>) -> Result<SearchResponse> {
        let body = SearchRequest {
            query,
            max_results: self.max_results,
            search_depth: &self.search_depth,
            include_domains: domains,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| HazfillError::Network(format!("{}: {e}", self.url)))?;
        let response = check_status(response, &self.url).await?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| HazfillError::Search(format!("malformed search response: {e}")))?;
        debug!("search response received");
        Ok(parsed)
    }
}
