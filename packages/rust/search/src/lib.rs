//! HTTP-backed search and extraction collaborators.
//!
//! [`TavilySearcher`] implements [`hazfill_core::Searcher`] against a
//! Tavily-compatible search API; [`ChatCompletionsExtractor`] implements
//! [`hazfill_core::Extractor`] against an OpenAI-compatible chat endpoint.

mod openai;
mod tavily;

use std::time::Duration;

use reqwest::Client;
use url::Url;

use hazfill_shared::{HazfillError, Result};

pub use openai::ChatCompletionsExtractor;
pub use tavily::TavilySearcher;

/// User-Agent string for outbound requests.
const USER_AGENT: &str = concat!("hazfill/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client with the crate's User-Agent and a request timeout.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| HazfillError::Network(format!("failed to build HTTP client: {e}")))
}

/// `<base>/<path>` for a validated base URL.
fn endpoint(base_url: &str, path: &str) -> Result<String> {
    let base = Url::parse(base_url)
        .map_err(|e| HazfillError::config(format!("invalid base URL `{base_url}`: {e}")))?;
    Ok(format!("{}/{path}", base.as_str().trim_end_matches('/')))
}

/// Turn a non-2xx response into a `Network` error carrying the body.
async fn check_status(response: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail: String = body.chars().take(200).collect();
    Err(HazfillError::Network(format!("{url}: HTTP {status}: {detail}")))
}
