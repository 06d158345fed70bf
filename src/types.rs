//! Shared types for the AUGUR agent.
//!
//! `Market`, `Position` and `AgentState` are the shared state model that
//! flows between tool calls, the prompt renderer and the dashboard.
//! Upstream payloads and model-written state are loosely typed: scalar
//! fields accept strings, numbers or null on input, and keys we do not
//! model are carried through untouched in `extra`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// A prediction market as shown on the watchlist.
///
/// `outcomes` and `outcome_prices` are positionally correlated. Their
/// lengths are never validated; consumers must tolerate a mismatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Market {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub question: String,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub outcomes: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub outcome_prices: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub volume: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub liquidity: String,
    /// ISO timestamp as reported upstream. Opaque, not trusted.
    #[serde(default, deserialize_with = "lenient_string")]
    pub end_date: String,

    // Agent annotations
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub recommendation: Option<String>,
    /// Confidence in the recommendation (0–1)
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_f64")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub reasoning: Option<String>,
    /// Estimated edge as a signed fraction (0.05 = 5pp underpriced)
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_f64")]
    pub edge: Option<f64>,

    /// Any other keys the agent attached (e.g. `clob_token_ids`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Market {
    /// Whether `outcomes` and `outcome_prices` line up one-to-one.
    pub fn is_priced_consistently(&self) -> bool {
        self.outcomes.len() == self.outcome_prices.len()
    }

    #[cfg(test)]
    pub fn sample() -> Self {
        Market {
            id: "512345".to_string(),
            question: "Will Bitcoin close above $100k on Dec 31?".to_string(),
            outcomes: vec!["Yes".into(), "No".into()],
            outcome_prices: vec!["0.62".into(), "0.38".into()],
            volume: "1250000.5".to_string(),
            liquidity: "84000".to_string(),
            end_date: "2026-12-31T12:00:00Z".to_string(),
            ..Default::default()
        }
    }
}

/// Full market detail, including the CLOB token ids needed for trading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketDetail {
    #[serde(flatten)]
    pub market: Market,
    pub description: String,
    pub volume_24hr: String,
    pub clob_token_ids: Vec<String>,
    pub neg_risk: bool,
}

/// A market from the closing-soon scan with its computed time remaining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosingMarket {
    #[serde(flatten)]
    pub market: Market,
    pub hours_remaining: f64,
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// An open position. The question is denormalized; there is no id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default, deserialize_with = "lenient_string")]
    pub market_question: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub outcome: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub size: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub token_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Position {
    /// Unrealized P&L: size × (current − average entry).
    pub fn unrealized_pnl(&self) -> f64 {
        self.size * (self.current_price - self.avg_price)
    }
}

// ---------------------------------------------------------------------------
// Agent state
// ---------------------------------------------------------------------------

/// The single shared, client-visible state snapshot.
///
/// Replaced wholesale on every update; never merged field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    #[serde(default)]
    pub markets: Vec<Market>,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_action: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_string")]
    pub wallet_balance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_f64")]
    pub total_pnl: Option<f64>,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
            && self.positions.is_empty()
            && self.last_action.is_empty()
            && self.wallet_balance.as_deref().map_or(true, str::is_empty)
            && self.total_pnl.is_none()
    }

    /// Sum of unrealized P&L over tracked positions.
    pub fn positions_pnl(&self) -> f64 {
        self.positions.iter().map(Position::unrealized_pnl).sum()
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

/// Render a scalar JSON value as a string: strings verbatim, numbers and
/// booleans via their JSON text, null as empty.
pub fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = Value::deserialize(d)?;
    scalar_to_string(&v)
        .ok_or_else(|| serde::de::Error::custom("expected a string or number"))
}

fn lenient_string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let v = Value::deserialize(d)?;
    match v {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|i| {
                scalar_to_string(i)
                    .ok_or_else(|| serde::de::Error::custom("expected scalar list items"))
            })
            .collect(),
        _ => Err(serde::de::Error::custom("expected a list")),
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = Value::deserialize(d)?;
    match &v {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("number out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("not a number: {s}"))),
        Value::Null => Ok(0.0),
        _ => Err(serde::de::Error::custom("expected a number")),
    }
}

/// Like `lenient_string`, but null (or a non-scalar) is `None`.
fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Null => None,
        other => scalar_to_string(&other),
    })
}

/// Numbers and numeric strings decode; anything else is `None`. Model-written
/// annotations such as `"confidence": "high"` must not sink a whole update.
fn lenient_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match &v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
