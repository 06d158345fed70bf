//! Polymarket CLOB public endpoints: order books, price history, and the
//! per-token metadata needed to sign orders.
//!
//! CLOB API: https://clob.polymarket.com

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::http::{send_json, HttpRequest, HttpTransport};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Order book fields passed through to the model.
const BOOK_FIELDS: &[&str] = &[
    "market",
    "asset_id",
    "timestamp",
    "bids",
    "asks",
    "min_order_size",
    "tick_size",
    "neg_risk",
];

pub const DEFAULT_INTERVAL: &str = "all";

// ---------------------------------------------------------------------------
// Response shaping
// ---------------------------------------------------------------------------

/// Keep only the allow-listed order book fields.
pub fn shape_order_book(raw: &Value) -> Result<Value, ToolError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ToolError::Decode("expected an order book object".into()))?;

    let kept: Map<String, Value> = BOOK_FIELDS
        .iter()
        .filter_map(|k| obj.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect();
    Ok(Value::Object(kept))
}

/// `{"history": [...]}` from the price-history payload.
pub fn shape_price_history(raw: &Value) -> Value {
    let history = raw
        .get("history")
        .filter(|h| h.is_array())
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    serde_json::json!({ "history": history })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ClobClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl ClobClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>) -> Self {
        Self { transport, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn order_book(&self, token_id: &str) -> Result<Value, ToolError> {
        let req = HttpRequest::get(format!("{}/book", self.base_url)).query("token_id", token_id);
        let raw = send_json(&*self.transport, req).await?;
        shape_order_book(&raw)
    }

    pub async fn price_history(&self, token_id: &str, interval: &str) -> Result<Value, ToolError> {
        let req = HttpRequest::get(format!("{}/prices-history", self.base_url))
            .query("market", token_id)
            .query("interval", interval);
        let raw = send_json(&*self.transport, req).await?;
        debug!(token_id, interval, "Price history fetched");
        Ok(shape_price_history(&raw))
    }

    /// Whether the token trades on the neg-risk exchange. Defaults to
    /// `false` when the lookup fails.
    pub async fn is_neg_risk(&self, token_id: &str) -> bool {
        let req = HttpRequest::get(format!("{}/neg-risk", self.base_url)).query("token_id", token_id);
        match send_json(&*self.transport, req).await {
            Ok(v) => v.get("neg_risk").and_then(Value::as_bool).unwrap_or(false),
            Err(e) => {
                warn!(token_id, error = %e, "neg-risk lookup failed, assuming standard exchange");
                false
            }
        }
    }

    /// Fee rate in basis points required for the token. Defaults to 0
    /// when the lookup fails.
    pub async fn fee_rate_bps(&self, token_id: &str) -> u64 {
        let req = HttpRequest::get(format!("{}/fee-rate", self.base_url)).query("token_id", token_id);
        match send_json(&*self.transport, req).await {
            Ok(v) => v
                .get("base_fee")
                .or_else(|| v.get("fee_rate_bps"))
                .and_then(|f| f.as_u64().or_else(|| f.as_str().and_then(|s| s.parse().ok())))
                .unwrap_or(0),
            Err(e) => {
                warn!(token_id, error = %e, "fee-rate lookup failed, using 0 bps");
                0
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
