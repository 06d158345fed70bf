//! Research providers.
//!
//! Defines the `ResearchProvider` trait used by the `research_topic` tool.
//! The only implementation is Exa web search; the provider is absent
//! entirely when no API key is configured.

pub mod research;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

pub use research::ExaResearch;

/// One search hit, trimmed for the model's context window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub title: String,
    pub url: String,
    pub published_date: Option<String>,
    pub snippet: String,
}

/// Abstraction over web research sources.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResearchProvider: Send + Sync {
    /// Search the web for `query`, returning at most `num_results` hits.
    async fn research(&self, query: &str, num_results: u32) -> Result<Vec<ResearchResult>, ToolError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}
