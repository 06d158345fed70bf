//! Tool dispatch against a scripted upstream.

use serde_json::{json, Value};
use std::sync::Arc;

use augur::config::EndpointsConfig;
use augur::data::ExaResearch;
use augur::http::HttpMethod;
use augur::tools::{ToolOutput, Toolbox, RESEARCH_NOT_CONFIGURED, TRADING_NOT_CONFIGURED};
use secrecy::SecretString;

use crate::mock_transport::ScriptedTransport;

fn toolbox(transport: &ScriptedTransport) -> Toolbox {
    Toolbox::read_only(Arc::new(transport.clone()), &EndpointsConfig::default())
}

fn success(output: ToolOutput) -> Value {
    match output {
        ToolOutput::Success(v) => v,
        other => panic!("expected success, got {other:?}"),
    }
}

const EVENTS: &str = r#"[
  {"title": "Crypto", "markets": [
    {"id": "101", "question": "BTC above 100k?", "outcomes": "[\"Yes\",\"No\"]",
     "outcomePrices": "[\"0.62\",\"0.38\"]", "volume": 1500.5, "liquidity": "800",
     "endDate": "2026-12-31T12:00:00Z"},
    {"id": "102", "question": "ETH above 5k?", "outcomes": "not json"}
  ]},
  {"title": "No markets here"},
  {"title": "More crypto", "markets": [{"id": "103", "question": "SOL flips ETH?"}]}
]"#;

#[tokio::test]
async fn search_flattens_events_and_defaults_bad_fields() {
    let transport = ScriptedTransport::new().get("/events", EVENTS);
    let out = success(toolbox(&transport).dispatch("search_markets", r#"{"query": "crypto"}"#).await);

    let markets = out.as_array().unwrap();
    assert_eq!(markets.len(), 3);
    assert_eq!(markets[0]["outcomes"], json!(["Yes", "No"]));
    assert_eq!(markets[0]["volume"], "1500.5");
    assert_eq!(markets[1]["outcomes"], json!([]));
    assert_eq!(markets[1]["volume"], "0");
    assert_eq!(markets[2]["end_date"], "");

    let req = &transport.requests()[0];
    assert_eq!(req.query_value("title"), Some("crypto"));
    assert_eq!(req.query_value("limit"), Some("10"));
    assert_eq!(req.query_value("active"), Some("true"));
    assert_eq!(req.query_value("closed"), Some("false"));
}

#[tokio::test]
async fn search_respects_limit_across_events() {
    let transport = ScriptedTransport::new().get("/events", EVENTS);
    let out = success(
        toolbox(&transport)
            .dispatch("search_markets", r#"{"query": "crypto", "limit": 2}"#)
            .await,
    );
    assert_eq!(out.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn market_details_exposes_token_ids() {
    let transport = ScriptedTransport::new().get(
        "/markets/101",
        r#"{"id": "101", "question": "BTC above 100k?", "description": "Resolves YES if...",
            "clobTokenIds": "[\"1111\",\"2222\"]", "negRisk": true, "volume24hr": 42}"#,
    );
    let out = success(toolbox(&transport).dispatch("get_market_details", r#"{"market_id": "101"}"#).await);
    assert_eq!(out["clob_token_ids"], json!(["1111", "2222"]));
    assert_eq!(out["neg_risk"], true);
    assert_eq!(out["volume_24hr"], "42");
    assert_eq!(out["id"], "101");
}

#[tokio::test]
async fn closing_soon_filters_and_sorts() {
    let now = chrono::Utc::now();
    let at = |h: i64| (now + chrono::Duration::hours(h)).to_rfc3339();
    let body = json!([
        {"id": "late", "endDate": at(30)},
        {"id": "past", "endDate": at(-2)},
        {"id": "soon", "endDate": at(5)},
        {"id": "far", "endDate": at(500)},
        {"id": "garbage", "endDate": "someday"}
    ])
    .to_string();

    let transport = ScriptedTransport::new().get("/markets", &body);
    let out = success(toolbox(&transport).dispatch("get_closing_soon_markets", r#"{"hours": 48}"#).await);

    let ids: Vec<&str> = out.as_array().unwrap().iter().map(|m| m["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["soon", "late"]);
    assert!(out[0]["hours_remaining"].as_f64().unwrap() <= 5.0);
}

#[tokio::test]
async fn order_book_keeps_only_known_fields() {
    let transport = ScriptedTransport::new().get(
        "/book",
        r#"{"market": "0xabc", "asset_id": "1111", "bids": [{"price": "0.6", "size": "10"}],
            "asks": [], "hash": "deadbeef", "internal": "x"}"#,
    );
    let out = success(toolbox(&transport).dispatch("get_order_book", r#"{"token_id": "1111"}"#).await);
    assert_eq!(out["asset_id"], "1111");
    assert!(out.get("internal").is_none());
    assert_eq!(transport.requests()[0].query_value("token_id"), Some("1111"));
}

#[tokio::test]
async fn upstream_error_becomes_sentinel() {
    let transport = ScriptedTransport::new().route(HttpMethod::Get, "/prices-history", 500, "boom");
    let out = toolbox(&transport)
        .dispatch("get_price_history", r#"{"token_id": "1111"}"#)
        .await;
    assert!(out.is_failure());

    let rendered: Value = serde_json::from_str(&out.render()).unwrap();
    assert_eq!(rendered.as_object().unwrap().len(), 1);
    assert!(rendered["error"].as_str().unwrap().contains("500"));
}

#[tokio::test]
async fn transport_failure_becomes_sentinel() {
    let transport = ScriptedTransport::new().fail(HttpMethod::Get, "/events", "connection refused");
    let out = toolbox(&transport).dispatch("search_markets", r#"{"query": "x"}"#).await;
    assert!(out.render().contains("connection refused"));
}

#[tokio::test]
async fn gated_tools_never_reach_the_network() {
    let transport = ScriptedTransport::new();
    let tb = toolbox(&transport);

    for (name, args) in [
        ("get_positions", "{}"),
        ("get_wallet_balance", "{}"),
        ("place_bet", r#"{"token_id": "1", "side": "BUY", "price": 0.5, "size": 10}"#),
        ("cancel_order", r#"{"order_id": "abc"}"#),
    ] {
        assert_eq!(tb.dispatch(name, args).await.render(), TRADING_NOT_CONFIGURED, "{name}");
    }
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn research_disabled_without_provider() {
    let transport = ScriptedTransport::new();
    let out = toolbox(&transport).dispatch("research_topic", r#"{"query": "fed rates"}"#).await;
    assert_eq!(out.render(), RESEARCH_NOT_CONFIGURED);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn research_through_exa() {
    let transport = ScriptedTransport::new().post(
        "/search",
        r#"{"results": [{"title": "Fed holds", "url": "https://news.test/a",
            "publishedDate": "2026-10-01", "text": "The Federal Reserve held rates..."}]}"#,
    );
    let exa = ExaResearch::new(
        Arc::new(transport.clone()),
        "https://exa.test",
        SecretString::new("exa-key".into()),
    );
    let tb = toolbox(&transport).with_research(Arc::new(exa), 5);

    let out = success(tb.dispatch("research_topic", r#"{"query": "fed rates"}"#).await);
    assert_eq!(out[0]["title"], "Fed holds");

    let req = &transport.requests_to("/search")[0];
    assert_eq!(req.header_value("x-api-key"), Some("exa-key"));
    let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
    assert_eq!(body["numResults"], 5);
}

#[tokio::test]
async fn unknown_tool_and_bad_arguments() {
    let transport = ScriptedTransport::new();
    let tb = toolbox(&transport);

    assert!(tb.dispatch("launch_rocket", "{}").await.render().contains("unknown tool"));
    assert!(tb.dispatch("search_markets", "{not json").await.is_failure());
    assert_eq!(transport.call_count(), 0);
}
