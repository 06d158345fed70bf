//! The agent's tool library.
//!
//! `Toolbox` owns every upstream client and maps a tool name plus the
//! model's raw JSON arguments to a `ToolOutput`. No tool failure escapes
//! as a Rust error: everything is rendered into text the model can read.

pub mod catalog;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::EndpointsConfig;
use crate::data::ResearchProvider;
use crate::error::ToolError;
use crate::http::HttpTransport;
use crate::llm::ToolSpec;
use crate::platforms::signing::OrderRequest;
use crate::platforms::{ClobClient, ClobTrader, GammaClient};

use catalog::*;

pub const TRADING_NOT_CONFIGURED: &str = "Trading not configured. Set POLYMARKET_PRIVATE_KEY.";
pub const RESEARCH_NOT_CONFIGURED: &str = "Research not configured. Set EXA_API_KEY.";
pub const WATCHLIST_UPDATED: &str = "Watchlist updated successfully";
pub const WATCHLIST_IGNORED: &str = "Watchlist update ignored: arguments not understood. \
Call update_watchlist again with the full state (markets, positions, last_action).";

// ---------------------------------------------------------------------------
// Tool output
// ---------------------------------------------------------------------------

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// JSON payload.
    Success(Value),
    /// Plain confirmation text.
    Message(String),
    /// Capability disabled for lack of a credential.
    NotConfigured(&'static str),
    Failed(ToolError),
}

impl ToolOutput {
    /// The text handed back to the model.
    pub fn render(&self) -> String {
        match self {
            ToolOutput::Success(v) => {
                serde_json::to_string_pretty(v).unwrap_or_else(|e| ToolError::from(e).to_sentinel())
            }
            ToolOutput::Message(m) => m.clone(),
            ToolOutput::NotConfigured(advisory) => advisory.to_string(),
            ToolOutput::Failed(e) => e.to_sentinel(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutput::Failed(_))
    }

    fn from_result(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(v) => ToolOutput::Success(v),
            Err(e) => ToolOutput::Failed(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default = "default_limit")]
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct MarketIdArgs {
    market_id: String,
}

#[derive(Debug, Deserialize)]
struct TokenArgs {
    token_id: String,
}

#[derive(Debug, Deserialize)]
struct PriceHistoryArgs {
    token_id: String,
    #[serde(default = "default_interval")]
    interval: String,
}

#[derive(Debug, Deserialize)]
struct ClosingSoonArgs {
    #[serde(default = "default_hours")]
    hours: f64,
    #[serde(default = "default_limit")]
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct ResearchArgs {
    query: String,
    #[serde(default)]
    num_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PlaceBetArgs {
    token_id: String,
    side: String,
    price: f64,
    size: f64,
}

#[derive(Debug, Deserialize)]
struct CancelArgs {
    order_id: String,
}

fn default_limit() -> u32 {
    10
}

fn default_hours() -> f64 {
    48.0
}

fn default_interval() -> String {
    crate::platforms::clob::DEFAULT_INTERVAL.to_string()
}

/// Decode the model's argument string. An empty string means `{}`.
fn parse_args<T: DeserializeOwned>(raw: &str) -> Result<T, ToolError> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArgument(e.to_string()))
}

// ---------------------------------------------------------------------------
// Toolbox
// ---------------------------------------------------------------------------

pub struct Toolbox {
    gamma: GammaClient,
    clob: ClobClient,
    trader: Option<ClobTrader>,
    research: Option<Arc<dyn ResearchProvider>>,
    default_research_results: u32,
}

impl Toolbox {
    pub fn new(gamma: GammaClient, clob: ClobClient) -> Self {
        Self { gamma, clob, trader: None, research: None, default_research_results: 5 }
    }

    /// Discovery tools only, against the configured endpoints.
    pub fn read_only(transport: Arc<dyn HttpTransport>, endpoints: &EndpointsConfig) -> Self {
        Self::new(
            GammaClient::new(transport.clone(), endpoints.gamma.as_str()),
            ClobClient::new(transport, endpoints.clob.as_str()),
        )
    }

    pub fn with_trader(mut self, trader: ClobTrader) -> Self {
        self.trader = Some(trader);
        self
    }

    pub fn with_research(mut self, provider: Arc<dyn ResearchProvider>, default_results: u32) -> Self {
        self.research = Some(provider);
        self.default_research_results = default_results.max(1);
        self
    }

    pub fn trading_enabled(&self) -> bool {
        self.trader.is_some()
    }

    pub fn research_enabled(&self) -> bool {
        self.research.is_some()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        tool_specs()
    }

    /// Run tool `name` with the model's raw JSON `raw_args`.
    pub async fn dispatch(&self, name: &str, raw_args: &str) -> ToolOutput {
        let output = self
            .run(name, raw_args)
            .instrument(info_span!("tool", tool = name))
            .await;
        match &output {
            ToolOutput::Failed(e) => warn!(tool = name, upstream = e.is_upstream(), error = %e, "Tool failed"),
            ToolOutput::NotConfigured(_) => info!(tool = name, "Tool not configured"),
            _ => info!(tool = name, "Tool succeeded"),
        }
        output
    }

    async fn run(&self, name: &str, raw: &str) -> ToolOutput {
        if GATED_TOOLS.contains(&name) {
            let Some(trader) = &self.trader else {
                return ToolOutput::NotConfigured(TRADING_NOT_CONFIGURED);
            };
            return ToolOutput::from_result(self.run_trading(trader, name, raw).await);
        }

        match name {
            SEARCH_MARKETS => ToolOutput::from_result(self.search_markets(raw).await),
            GET_MARKET_DETAILS => ToolOutput::from_result(self.market_details(raw).await),
            GET_ORDER_BOOK => ToolOutput::from_result(self.order_book(raw).await),
            GET_PRICE_HISTORY => ToolOutput::from_result(self.price_history(raw).await),
            GET_CLOSING_SOON_MARKETS => ToolOutput::from_result(self.closing_soon(raw).await),
            RESEARCH_TOPIC => match &self.research {
                None => ToolOutput::NotConfigured(RESEARCH_NOT_CONFIGURED),
                Some(provider) => ToolOutput::from_result(self.research_topic(&**provider, raw).await),
            },
            // State is applied by the agent loop from the raw arguments
            UPDATE_WATCHLIST => ToolOutput::Message(WATCHLIST_UPDATED.to_string()),
            other => ToolOutput::Failed(ToolError::UnknownTool(other.to_string())),
        }
    }

    // -- discovery ----------------------------------------------------------

    async fn search_markets(&self, raw: &str) -> Result<Value, ToolError> {
        let args: SearchArgs = parse_args(raw)?;
        let markets = self.gamma.search_markets(&args.query, args.limit.max(1)).await?;
        Ok(serde_json::to_value(markets)?)
    }

    async fn market_details(&self, raw: &str) -> Result<Value, ToolError> {
        let args: MarketIdArgs = parse_args(raw)?;
        let detail = self.gamma.market_detail(&args.market_id).await?;
        Ok(serde_json::to_value(detail)?)
    }

    async fn order_book(&self, raw: &str) -> Result<Value, ToolError> {
        let args: TokenArgs = parse_args(raw)?;
        self.clob.order_book(&args.token_id).await
    }

    async fn price_history(&self, raw: &str) -> Result<Value, ToolError> {
        let args: PriceHistoryArgs = parse_args(raw)?;
        self.clob.price_history(&args.token_id, &args.interval).await
    }

    async fn closing_soon(&self, raw: &str) -> Result<Value, ToolError> {
        let args: ClosingSoonArgs = parse_args(raw)?;
        if !(args.hours > 0.0) {
            return Err(ToolError::InvalidArgument(format!("hours must be positive, got {}", args.hours)));
        }
        let markets = self.gamma.closing_soon(args.hours, args.limit.max(1)).await?;
        Ok(serde_json::to_value(markets)?)
    }

    async fn research_topic(&self, provider: &dyn ResearchProvider, raw: &str) -> Result<Value, ToolError> {
        let args: ResearchArgs = parse_args(raw)?;
        let n = args.num_results.unwrap_or(self.default_research_results).max(1);
        debug!(provider = provider.name(), query = %args.query, n, "Research requested");
        let results = provider.research(&args.query, n).await?;
        Ok(serde_json::to_value(results)?)
    }

    // -- trading ------------------------------------------------------------

    async fn run_trading(&self, trader: &ClobTrader, name: &str, raw: &str) -> Result<Value, ToolError> {
        match name {
            GET_POSITIONS => Ok(serde_json::to_value(trader.positions().await?)?),
            GET_WALLET_BALANCE => trader.wallet_balance().await,
            PLACE_BET => {
                let args: PlaceBetArgs = parse_args(raw)?;
                let order = OrderRequest::parse(&args.token_id, &args.side, args.price, args.size)?;
                trader.place_order(&order).await
            }
            CANCEL_ORDER => {
                let args: CancelArgs = parse_args(raw)?;
                trader.cancel_order(&args.order_id).await
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
