//! Exa web research.
//!
//! API: `POST https://api.exa.ai/search`
//! Auth: `x-api-key` header.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ResearchProvider, ResearchResult};
use crate::error::ToolError;
use crate::http::{send_json, truncate_chars, HttpRequest, HttpTransport};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Text requested from Exa per result.
const CONTENT_MAX_CHARS: u32 = 1000;
/// Snippet length handed to the model.
const SNIPPET_MAX_CHARS: usize = 500;
const MAX_RESULTS: u32 = 25;

// ---------------------------------------------------------------------------
// Exa response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaHit>,
}

#[derive(Debug, Deserialize)]
struct ExaHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default, rename = "publishedDate")]
    published_date: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl From<ExaHit> for ResearchResult {
    fn from(hit: ExaHit) -> Self {
        ResearchResult {
            title: hit.title.unwrap_or_default(),
            url: hit.url,
            published_date: hit.published_date,
            snippet: truncate_chars(hit.text.as_deref().unwrap_or("").trim(), SNIPPET_MAX_CHARS),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct ExaResearch {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    api_key: SecretString,
}

impl ExaResearch {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl ResearchProvider for ExaResearch {
    async fn research(&self, query: &str, num_results: u32) -> Result<Vec<ResearchResult>, ToolError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArgument("query is required".into()));
        }

        let body = json!({
            "query": query,
            "numResults": num_results.clamp(1, MAX_RESULTS),
            "contents": { "text": { "maxCharacters": CONTENT_MAX_CHARS } }
        });
        let req = HttpRequest::post(format!("{}/search", self.base_url), body.to_string())
            .header("x-api-key", self.api_key.expose_secret().clone());

        let raw = send_json(&*self.transport, req).await?;
        let parsed: ExaResponse = serde_json::from_value(raw)?;
        debug!(hits = parsed.results.len(), "Exa response parsed");

        let results: Vec<ResearchResult> = parsed.results.into_iter().map(Into::into).collect();
        info!(query, count = results.len(), "Research complete");
        Ok(results)
    }

    fn name(&self) -> &str {
        "exa"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
