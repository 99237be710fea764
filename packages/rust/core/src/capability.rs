//! Capability interfaces for the two external collaborators.
//!
//! The fill state machine only ever talks to a [`Searcher`] and an
//! [`Extractor`]. Production implementations live in `hazfill-search`;
//! tests script them in memory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hazfill_shared::Result;

/// One search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Snippet or page content.
    #[serde(default)]
    pub content: String,
    /// Source URL.
    #[serde(default)]
    pub url: String,
}

impl SearchHit {
    pub fn new(content: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            url: url.into(),
        }
    }
}

/// Raw search payload. Backends answer with either a mapping carrying a
/// `results` list or a bare list of results.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Mapping {
        #[serde(default)]
        results: Vec<SearchHit>,
    },
    Sequence(Vec<SearchHit>),
}

impl SearchResponse {
    /// Normalize to a plain result list.
    pub fn into_hits(self) -> Vec<SearchHit> {
        match self {
            Self::Mapping { results } => results,
            Self::Sequence(results) => results,
        }
    }
}

impl From<Vec<SearchHit>> for SearchResponse {
    fn from(hits: Vec<SearchHit>) -> Self {
        Self::Sequence(hits)
    }
}

/// Web search capability.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Run `query`, optionally restricted to `domains`.
    async fn search(&self, query: &str, domains: Option<&[String]>) -> Result<SearchResponse>;
}

/// Language-model completion capability.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Complete a system + user prompt pair into raw text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_payload_normalizes() {
        let json = r#"{"query":"x","results":[{"url":"https://a","content":"alpha","score":0.9}]}"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.into_hits(), vec![SearchHit::new("alpha", "https://a")]);
    }

    #[test]
    fn bare_sequence_normalizes() {
        let json = r#"[{"url":"https://b","content":"beta"},{"content":"no url"}]"#;
        let hits = serde_json::from_str::<SearchResponse>(json).unwrap().into_hits();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].url, "");
    }

    #[test]
    fn mapping_without_results_is_empty() {
        let resp: SearchResponse = serde_json::from_str(r#"{"answer":"n/a"}"#).unwrap();
        assert!(resp.into_hits().is_empty());
    }
}
