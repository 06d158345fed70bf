//! State bridge between the agent loop and the shared dashboard state.
//!
//! Two adapters:
//! - `render_context` turns the current `AgentState` into text prepended
//!   to the user's message before each model turn.
//! - `extract_state` turns the raw arguments of an `update_watchlist` tool
//!   call into a replacement `AgentState`, accepting both the flat and the
//!   nested calling convention. Anything it cannot read yields `None`,
//!   which callers treat as "state unchanged".

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::types::AgentState;

const STATE_KEYS: &[&str] = &["markets", "positions", "last_action", "wallet_balance", "total_pnl"];

// ---------------------------------------------------------------------------
// Context renderer
// ---------------------------------------------------------------------------

/// Render state sections followed by the user's request.
///
/// Section order is fixed: watchlist, positions, wallet balance, last
/// action. Empty sections are omitted; with no sections at all the bare
/// user message is returned.
pub fn render_context(state: &AgentState, user_message: &str) -> String {
    let mut parts = Vec::new();

    if !state.markets.is_empty() {
        parts.push(format!("Current watchlist:\n{}", pretty(&state.markets)));
    }
    if !state.positions.is_empty() {
        parts.push(format!("Current positions:\n{}", pretty(&state.positions)));
    }
    if let Some(balance) = state.wallet_balance.as_deref().filter(|b| !b.is_empty()) {
        parts.push(format!("Wallet balance: {balance}"));
    }
    if !state.last_action.is_empty() {
        parts.push(format!("Last action: {}", state.last_action));
    }

    if parts.is_empty() {
        return user_message.to_string();
    }

    format!("{}\n\nUser request: {user_message}", parts.join("\n\n"))
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

// ---------------------------------------------------------------------------
// Argument extractor
// ---------------------------------------------------------------------------

/// Raw tool-call arguments as delivered by the model runtime.
#[derive(Debug, Clone)]
pub enum RawArgs<'a> {
    /// JSON text that still needs decoding.
    Text(&'a str),
    /// Already-structured arguments.
    Structured(&'a Value),
}

/// The shape a set of `update_watchlist` arguments was recognised as.
#[derive(Debug, Clone, PartialEq)]
pub enum StateArgs {
    /// `{"markets": [...], "positions": [...], "last_action": "..."}`
    Flat(StateFields),
    /// `{"markets": {"markets": [...], "positions": [...], ...}}`
    Nested(StateFields),
}

impl StateArgs {
    /// Classify an argument object. Flat is tried first, then nested.
    pub fn classify(args: &Value) -> Option<Self> {
        let obj = args.as_object()?;

        if let Some(fields) = StateFields::from_object(obj) {
            return Some(StateArgs::Flat(fields));
        }

        let inner = obj.get("markets")?.as_object()?;
        StateFields::from_object(inner).map(StateArgs::Nested)
    }

    pub fn into_state(self) -> AgentState {
        match self {
            StateArgs::Flat(f) | StateArgs::Nested(f) => f.into_state(),
        }
    }
}

/// The recognised state keys of one argument object, decoded with the
/// same lenient rules as a client-pushed `AgentState`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StateFields(AgentState);

impl StateFields {
    /// Decode an object whose state keys (at least one present) all have
    /// the flat types. A `markets` value that is an object is not flat.
    fn from_object(obj: &Map<String, Value>) -> Option<Self> {
        if !STATE_KEYS.iter().any(|k| obj.contains_key(*k)) {
            return None;
        }
        if obj.get("markets").is_some_and(|m| !m.is_array() && !m.is_null()) {
            return None;
        }

        let known: Map<String, Value> = obj
            .iter()
            .filter(|(k, v)| STATE_KEYS.contains(&k.as_str()) && !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        match serde_json::from_value(Value::Object(known)) {
            Ok(fields) => Some(fields),
            Err(e) => {
                debug!(error = %e, "State arguments did not match expected types");
                None
            }
        }
    }

    fn into_state(self) -> AgentState {
        self.0
    }
}

/// Parse `update_watchlist` arguments into a replacement state.
///
/// Returns `None` when the arguments cannot be decoded or match neither
/// calling convention.
pub fn extract_state(raw: RawArgs<'_>) -> Option<AgentState> {
    let decoded;
    let args = match raw {
        RawArgs::Structured(v) => v,
        RawArgs::Text(text) => {
            decoded = match serde_json::from_str::<Value>(text) {
                Ok(v) => v,
                Err(e) => {
                    debug!(error = %e, "Undecodable update_watchlist arguments");
                    return None;
                }
            };
            // Some runtimes double-encode the arguments
            match &decoded {
                Value::String(inner) => return extract_state(RawArgs::Text(inner.as_str())),
                other => other,
            }
        }
    };

    StateArgs::classify(args).map(StateArgs::into_state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
