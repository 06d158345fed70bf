//! Polymarket Gamma API (market discovery, no auth required).
//!
//! Gamma returns several list fields as JSON-encoded strings
//! (`outcomes`, `outcomePrices`, `clobTokenIds`) and is inconsistent about
//! numbers vs strings. Decoding here is deliberately lenient: an
//! undecodable or missing field becomes its documented default and never
//! fails the call.
//!
//! Gamma API: https://gamma-api.polymarket.com

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ToolError;
use crate::http::{send_json, truncate_chars, HttpRequest, HttpTransport};
use crate::types::{scalar_to_string, ClosingMarket, Market, MarketDetail};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const DESCRIPTION_MAX_CHARS: usize = 500;
/// Candidate pool size for the closing-soon scan.
const CLOSING_SCAN_POOL: u32 = 100;

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

/// A scalar field as a string, or `default` when missing or non-scalar.
fn text_field(v: &Value, key: &str, default: &str) -> String {
    match v.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(other) => scalar_to_string(other).unwrap_or_else(|| default.to_string()),
    }
}

/// A list field that Gamma may send as a JSON-encoded string or as a
/// real array. Anything else decodes to an empty list.
pub fn encoded_list(v: &Value, key: &str) -> Vec<String> {
    let decoded;
    let list = match v.get(key) {
        Some(Value::Array(items)) => items,
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => {
                decoded = items;
                &decoded
            }
            _ => {
                debug!(key, "Undecodable Gamma list field");
                return Vec::new();
            }
        },
        _ => return Vec::new(),
    };
    list.iter().filter_map(scalar_to_string).collect()
}

fn flag(v: &Value, key: &str) -> bool {
    match v.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Convert one Gamma market object into our `Market`.
pub fn market_from_value(v: &Value) -> Market {
    let market = Market {
        id: text_field(v, "id", ""),
        question: text_field(v, "question", ""),
        outcomes: encoded_list(v, "outcomes"),
        outcome_prices: encoded_list(v, "outcomePrices"),
        volume: text_field(v, "volume", "0"),
        liquidity: text_field(v, "liquidity", "0"),
        end_date: text_field(v, "endDate", ""),
        ..Default::default()
    };
    if !market.is_priced_consistently() {
        debug!(id = %market.id, "Outcome and price counts differ, passing through");
    }
    market
}

/// Convert a Gamma market object into the full detail view.
pub fn detail_from_value(v: &Value) -> MarketDetail {
    MarketDetail {
        market: market_from_value(v),
        description: truncate_chars(&text_field(v, "description", ""), DESCRIPTION_MAX_CHARS),
        volume_24hr: text_field(v, "volume24hr", "0"),
        clob_token_ids: encoded_list(v, "clobTokenIds"),
        neg_risk: flag(v, "negRisk"),
    }
}

/// Parse Gamma's `endDate`: RFC 3339, or a bare `YYYY-MM-DD` taken as
/// end of day UTC.
pub fn parse_end_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|nd| nd.and_hms_opt(23, 59, 59))
                .map(|ndt| ndt.and_utc())
        })
}

/// Keep markets ending within `(0, hours]` of `now`, soonest first.
/// Unparseable or past end dates are dropped.
pub fn closing_within(
    markets: Vec<Market>,
    hours: f64,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<ClosingMarket> {
    let mut closing: Vec<ClosingMarket> = markets
        .into_iter()
        .filter_map(|m| {
            let end = parse_end_date(&m.end_date)?;
            let hours_remaining = (end - now).num_seconds() as f64 / 3600.0;
            (hours_remaining > 0.0 && hours_remaining <= hours).then(|| ClosingMarket {
                market: m,
                hours_remaining: (hours_remaining * 10.0).round() / 10.0,
            })
        })
        .collect();

    closing.sort_by(|a, b| a.hours_remaining.total_cmp(&b.hours_remaining));
    closing.truncate(limit);
    closing
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct GammaClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl GammaClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>) -> Self {
        Self { transport, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    /// Search active events by title and flatten their markets.
    pub async fn search_markets(&self, query: &str, limit: u32) -> Result<Vec<Market>, ToolError> {
        let req = HttpRequest::get(format!("{}/events", self.base_url))
            .query("title", query)
            .query("limit", limit)
            .query("active", "true")
            .query("closed", "false");

        let body = send_json(&*self.transport, req).await?;
        let events = body
            .as_array()
            .ok_or_else(|| ToolError::Decode("expected a list of events".into()))?;

        let markets: Vec<Market> = events
            .iter()
            .filter_map(|e| e.get("markets").and_then(Value::as_array))
            .flatten()
            .map(market_from_value)
            .take(limit as usize)
            .collect();

        info!(query, count = markets.len(), "Gamma search complete");
        Ok(markets)
    }

    /// Full detail for one market.
    pub async fn market_detail(&self, market_id: &str) -> Result<MarketDetail, ToolError> {
        let url = format!("{}/markets/{}", self.base_url, urlencoding::encode(market_id));
        let body = send_json(&*self.transport, HttpRequest::get(url)).await?;

        if !body.is_object() {
            return Err(ToolError::Decode("expected a market object".into()));
        }
        Ok(detail_from_value(&body))
    }

    /// Markets closing within `hours`, soonest first.
    ///
    /// The candidate pool is the upstream's most active listing; `endDate`
    /// is filtered client-side because upstream ordering by end date is
    /// unreliable.
    pub async fn closing_soon(&self, hours: f64, limit: u32) -> Result<Vec<ClosingMarket>, ToolError> {
        let req = HttpRequest::get(format!("{}/markets", self.base_url))
            .query("active", "true")
            .query("closed", "false")
            .query("order", "volume24hr")
            .query("ascending", "false")
            .query("limit", CLOSING_SCAN_POOL);

        let body = send_json(&*self.transport, req).await?;
        let listing = body
            .as_array()
            .ok_or_else(|| ToolError::Decode("expected a list of markets".into()))?;

        let markets: Vec<Market> = listing.iter().map(market_from_value).collect();
        let scanned = markets.len();
        let closing = closing_within(markets, hours, limit as usize, Utc::now());

        info!(scanned, matched = closing.len(), hours, "Closing-soon scan complete");
        Ok(closing)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
