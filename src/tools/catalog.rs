//! Tool names, descriptions and argument schemas advertised to the model.

use serde_json::{json, Value};

use crate::llm::ToolSpec;

pub const SEARCH_MARKETS: &str = "search_markets";
pub const GET_MARKET_DETAILS: &str = "get_market_details";
pub const GET_ORDER_BOOK: &str = "get_order_book";
pub const GET_PRICE_HISTORY: &str = "get_price_history";
pub const GET_CLOSING_SOON_MARKETS: &str = "get_closing_soon_markets";
pub const RESEARCH_TOPIC: &str = "research_topic";
pub const GET_WALLET_BALANCE: &str = "get_wallet_balance";
pub const GET_POSITIONS: &str = "get_positions";
pub const PLACE_BET: &str = "place_bet";
pub const CANCEL_ORDER: &str = "cancel_order";
pub const UPDATE_WATCHLIST: &str = "update_watchlist";

/// Tools that require a trading credential.
pub const GATED_TOOLS: &[&str] = &[GET_POSITIONS, PLACE_BET, CANCEL_ORDER, GET_WALLET_BALANCE];

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn market_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "string"},
            "question": {"type": "string"},
            "outcomes": {"type": "array", "items": {"type": "string"}},
            "outcome_prices": {"type": "array", "items": {"type": "string"}},
            "volume": {"type": "string"},
            "liquidity": {"type": "string"},
            "end_date": {"type": "string"},
            "recommendation": {"type": "string", "description": "e.g. BUY YES, AVOID"},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "reasoning": {"type": "string"},
            "edge": {"type": "number", "description": "Estimated edge as a signed fraction"}
        }
    })
}

fn position_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "market_question": {"type": "string"},
            "outcome": {"type": "string"},
            "size": {"type": "number"},
            "avg_price": {"type": "number"},
            "current_price": {"type": "number"},
            "token_id": {"type": "string"}
        }
    })
}

/// The full, fixed tool catalog in advertised order.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: SEARCH_MARKETS,
            description: "Search Polymarket for active prediction markets matching a query. \
                          Returns markets with outcomes and prices.",
            parameters: object(
                json!({
                    "query": {"type": "string", "description": "Search term, e.g. \"crypto\", \"election\""},
                    "limit": {"type": "integer", "description": "Maximum results (default 10)", "minimum": 1}
                }),
                &["query"],
            ),
        },
        ToolSpec {
            name: GET_MARKET_DETAILS,
            description: "Get full details for one market, including its CLOB token ids \
                          (needed for order books, price history and trading).",
            parameters: object(
                json!({"market_id": {"type": "string", "description": "Gamma market id"}}),
                &["market_id"],
            ),
        },
        ToolSpec {
            name: GET_ORDER_BOOK,
            description: "Get bid/ask depth for a market outcome token.",
            parameters: object(
                json!({"token_id": {"type": "string", "description": "CLOB token id of the outcome"}}),
                &["token_id"],
            ),
        },
        ToolSpec {
            name: GET_PRICE_HISTORY,
            description: "Get historical prices for a market outcome token.",
            parameters: object(
                json!({
                    "token_id": {"type": "string", "description": "CLOB token id of the outcome"},
                    "interval": {"type": "string", "description": "1h, 6h, 1d, 1w, 1m or all (default all)"}
                }),
                &["token_id"],
            ),
        },
        ToolSpec {
            name: GET_CLOSING_SOON_MARKETS,
            description: "List active markets that close within the next N hours, soonest first.",
            parameters: object(
                json!({
                    "hours": {"type": "number", "description": "Window in hours (default 48)", "exclusiveMinimum": 0},
                    "limit": {"type": "integer", "description": "Maximum results (default 10)", "minimum": 1}
                }),
                &[],
            ),
        },
        ToolSpec {
            name: RESEARCH_TOPIC,
            description: "Search the web for recent news and analysis on a topic.",
            parameters: object(
                json!({
                    "query": {"type": "string"},
                    "num_results": {"type": "integer", "description": "Number of results (default 5)", "minimum": 1}
                }),
                &["query"],
            ),
        },
        ToolSpec {
            name: GET_WALLET_BALANCE,
            description: "Get the USDC balance of the configured trading wallet.",
            parameters: object(json!({}), &[]),
        },
        ToolSpec {
            name: GET_POSITIONS,
            description: "Fetch current positions for the configured wallet.",
            parameters: object(json!({}), &[]),
        },
        ToolSpec {
            name: PLACE_BET,
            description: "Place a GTC limit order on a market outcome.",
            parameters: object(
                json!({
                    "token_id": {"type": "string", "description": "CLOB token id of the outcome"},
                    "side": {"type": "string", "enum": ["BUY", "SELL"]},
                    "price": {"type": "number", "minimum": 0.01, "maximum": 0.99},
                    "size": {"type": "number", "description": "Number of shares", "exclusiveMinimum": 0}
                }),
                &["token_id", "side", "price", "size"],
            ),
        },
        ToolSpec {
            name: CANCEL_ORDER,
            description: "Cancel an open order.",
            parameters: object(json!({"order_id": {"type": "string"}}), &["order_id"]),
        },
        ToolSpec {
            name: UPDATE_WATCHLIST,
            description: "Replace the shared watchlist state shown on the dashboard. \
                          IMPORTANT: always provide the entire state, not just new items.",
            parameters: object(
                json!({
                    "markets": {"type": "array", "items": market_schema()},
                    "positions": {"type": "array", "items": position_schema()},
                    "last_action": {"type": "string", "description": "Short summary of what just happened"},
                    "wallet_balance": {"type": "string"},
                    "total_pnl": {"type": "number"}
                }),
                &["markets"],
            ),
        },
    ]
}
