//! End-to-end turns through the HTTP server with a scripted model and
//! scripted upstream.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use augur::agent::Agent;
use augur::config::{AgentConfig, EndpointsConfig};
use augur::llm::Role;
use augur::server::{build_router, AppState, ServerState};
use augur::tools::Toolbox;

use crate::mock_transport::ScriptedTransport;
use crate::scripted_model::ScriptedModel;

const EVENTS: &str = r#"[{"markets": [
  {"id": "101", "question": "BTC above 100k?", "outcomes": "[\"Yes\",\"No\"]",
   "outcomePrices": "[\"0.62\",\"0.38\"]", "volume": "1500", "liquidity": "800",
   "endDate": "2026-12-31T12:00:00Z"}
]}]"#;

fn app(model: &ScriptedModel, transport: &ScriptedTransport, mount: &str) -> AppState {
    let toolbox = Toolbox::read_only(Arc::new(transport.clone()), &EndpointsConfig::default());
    let agent = Agent::new(Arc::new(model.clone()), Arc::new(toolbox), &AgentConfig::default());
    Arc::new(ServerState::new(agent, mount))
}

async fn post(state: &AppState, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = build_router(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(state: &AppState, uri: &str) -> Value {
    let resp = build_router(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn search_then_watch_updates_shared_state() {
    let watch_args = json!({
        "markets": [{
            "id": "101", "question": "BTC above 100k?", "outcomes": ["Yes", "No"],
            "outcome_prices": ["0.62", "0.38"], "volume": "1500", "liquidity": "800",
            "end_date": "2026-12-31T12:00:00Z", "recommendation": "BUY YES",
            "confidence": 0.7, "reasoning": "Momentum", "edge": 0.08
        }],
        "last_action": "Added BTC market to watchlist"
    })
    .to_string();

    let model = ScriptedModel::new()
        .calls(&[("c1", "search_markets", r#"{"query": "bitcoin"}"#)])
        .calls(&[("c2", "update_watchlist", watch_args.as_str())])
        .says("I found one market and added it to your watchlist.");
    let transport = ScriptedTransport::new().get("/events", EVENTS);
    let state = app(&model, &transport, "/agent");

    let (status, body) = post(&state, "/agent", json!({"message": "find crypto bets"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "I found one market and added it to your watchlist.");
    assert_eq!(body["state_changed"], true);
    assert_eq!(body["tool_calls"], json!(["search_markets", "update_watchlist"]));
    assert_eq!(body["state"]["markets"][0]["recommendation"], "BUY YES");

    // The search result reached the model as pretty JSON
    let search_result = model.tool_result("c1").unwrap();
    assert!(search_result.contains("BTC above 100k?"));

    let shared = get(&state, "/agent/state").await;
    assert_eq!(shared["last_action"], "Added BTC market to watchlist");
    assert_eq!(shared["markets"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn follow_up_turn_sees_history_and_state() {
    let model = ScriptedModel::new()
        .calls(&[("c1", "update_watchlist", r#"{"markets": [], "last_action": "Cleared"}"#)])
        .says("Cleared.")
        .says("Your watchlist is empty.");
    let transport = ScriptedTransport::new();
    let state = app(&model, &transport, "/");

    let (_, first) = post(&state, "/", json!({"message": "clear my watchlist"})).await;
    let thread_id = first["thread_id"].as_str().unwrap().to_string();

    let (status, second) =
        post(&state, "/", json!({"thread_id": thread_id, "message": "what's on it?"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["thread_id"], thread_id);
    assert_eq!(second["state_changed"], false);

    let requests = model.requests();
    let last = requests.last().unwrap();
    assert_eq!(last[0].role, Role::System);
    assert!(last.iter().any(|m| m.content.as_deref() == Some("clear my watchlist")));
    let user = last.last().unwrap().content.as_deref().unwrap();
    assert!(user.starts_with("Last action: Cleared"));
    assert!(user.ends_with("User request: what's on it?"));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn separate_threads_do_not_share_history() {
    let model = ScriptedModel::new().says("one").says("two");
    let state = app(&model, &ScriptedTransport::new(), "/");

    post(&state, "/", json!({"thread_id": "a", "message": "first"})).await;
    post(&state, "/", json!({"thread_id": "b", "message": "second"})).await;

    let second_call = &model.requests()[1];
    assert_eq!(second_call.len(), 2);
    assert!(!second_call.iter().any(|m| m.content.as_deref() == Some("first")));
}

#[tokio::test]
async fn tool_failure_is_reported_to_model_not_client() {
    let model = ScriptedModel::new()
        .calls(&[("c1", "get_order_book", r#"{"token_id": "1111"}"#)])
        .says("The order book is unavailable right now.");
    let transport = ScriptedTransport::new().route(augur::http::HttpMethod::Get, "/book", 503, "busy");
    let state = app(&model, &transport, "/");

    let (status, body) = post(&state, "/", json!({"message": "book for 1111"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "The order book is unavailable right now.");

    let result: Value = serde_json::from_str(&model.tool_result("c1").unwrap()).unwrap();
    assert!(result["error"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn model_failure_is_bad_gateway_and_state_untouched() {
    let model = ScriptedModel::new();
    let state = app(&model, &ScriptedTransport::new(), "/");

    let (status, body) = post(&state, "/", json!({"message": "hello"})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().is_some());
    assert!(state.threads.read().await.is_empty());
}

#[tokio::test]
async fn long_thread_history_stays_bounded() {
    let mut model = ScriptedModel::new();
    for i in 0..15 {
        model = model.says(&format!("reply {i}"));
    }
    let transport = ScriptedTransport::new();
    let toolbox = Toolbox::read_only(Arc::new(transport.clone()), &EndpointsConfig::default());
    let config = AgentConfig { max_history_messages: 6, ..Default::default() };
    let agent = Agent::new(Arc::new(model.clone()), Arc::new(toolbox), &config);
    let state: AppState = Arc::new(ServerState::new(agent, "/"));

    for i in 0..15 {
        let (status, _) = post(&state, "/", json!({"thread_id": "long", "message": format!("q{i}")})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(state.threads.read().await.history("long").len() <= 6);
    }

    // system prompt + 6 kept + new user message
    let last = model.requests().last().unwrap().clone();
    assert_eq!(last.len(), 8);
    assert!(!last.iter().any(|m| m.content.as_deref() == Some("q0")));
}

#[tokio::test]
async fn loose_watchlist_entry_is_kept_whole() {
    let watch_args = json!({
        "markets": [{
            "id": "101", "question": "BTC above 100k?", "end_date": null,
            "confidence": "0.7", "clob_token_ids": ["111", "222"]
        }],
        "last_action": "Added BTC market"
    })
    .to_string();
    let model = ScriptedModel::new()
        .calls(&[("c1", "update_watchlist", watch_args.as_str())])
        .says("Added.");
    let state = app(&model, &ScriptedTransport::new(), "/");

    let (status, body) = post(&state, "/", json!({"message": "watch btc"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state_changed"], true);
    assert_eq!(model.tool_result("c1").as_deref(), Some("Watchlist updated successfully"));

    let shared = get(&state, "/state").await;
    assert_eq!(shared["markets"][0]["clob_token_ids"], json!(["111", "222"]));
    assert_eq!(shared["markets"][0]["confidence"], 0.7);
}
