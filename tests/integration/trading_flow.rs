//! Trading tools end to end: credential derivation, signed order
//! placement, cancellation and wallet balance.

use serde_json::Value;
use std::sync::Arc;

use augur::config::EndpointsConfig;
use augur::http::HttpMethod;
use augur::platforms::signing::OrderSigner;
use augur::platforms::ClobTrader;
use augur::tools::{ToolOutput, Toolbox};
use secrecy::SecretString;

use crate::mock_transport::ScriptedTransport;

// Well-known development key; address 0xf39F...2266.
const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const CREDS: &str = r#"{"apiKey":"ak-1","secret":"c2VjcmV0LWJ5dGVz","passphrase":"pp"}"#;

async fn trading_toolbox(transport: &ScriptedTransport) -> Toolbox {
    let endpoints = EndpointsConfig::default();
    let signer = OrderSigner::from_key(&SecretString::new(TEST_KEY.into()), None, 137, 0).unwrap();
    let trader = ClobTrader::connect(
        Arc::new(transport.clone()),
        signer,
        &endpoints.clob,
        &endpoints.data_api,
        &endpoints.polygon_rpc,
    )
    .await
    .unwrap();
    Toolbox::read_only(Arc::new(transport.clone()), &endpoints).with_trader(trader)
}

fn success(output: ToolOutput) -> Value {
    match output {
        ToolOutput::Success(v) => v,
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn place_bet_signs_and_posts_gtc_order() {
    let transport = ScriptedTransport::new()
        .post("/auth/api-key", CREDS)
        .get("/neg-risk", r#"{"neg_risk": true}"#)
        .get("/fee-rate", r#"{"base_fee": 0}"#)
        .post("/order", r#"{"success": true, "orderID": "0xfeed", "status": "live"}"#);
    let tb = trading_toolbox(&transport).await;

    let out = success(
        tb.dispatch(
            "place_bet",
            r#"{"token_id": "71321045679252212594626385532706912750332728571942532289631379312455583992563",
                "side": "SELL", "price": 0.456, "size": 20}"#,
        )
        .await,
    );
    assert_eq!(out["status"], "placed");
    assert_eq!(out["order"]["orderID"], "0xfeed");

    let posted = &transport.requests_to("/order")[0];
    assert_eq!(posted.method, HttpMethod::Post);
    for h in ["POLY_ADDRESS", "POLY_SIGNATURE", "POLY_TIMESTAMP", "POLY_API_KEY", "POLY_PASSPHRASE"] {
        assert!(posted.header_value(h).is_some(), "missing {h}");
    }

    let body: Value = serde_json::from_str(posted.body.as_deref().unwrap()).unwrap();
    let order = &body["order"];
    assert_eq!(body["orderType"], "GTC");
    assert_eq!(order["side"], "SELL");
    // price rounds to 0.46; SELL gives shares and receives notional
    assert_eq!(order["makerAmount"], "20000000");
    assert_eq!(order["takerAmount"], "9200000");
    assert_eq!(order["expiration"], "0");
    assert_eq!(order["signature"].as_str().unwrap().len(), 132);
}

#[tokio::test]
async fn invalid_bet_never_posts() {
    let transport = ScriptedTransport::new().post("/auth/api-key", CREDS);
    let tb = trading_toolbox(&transport).await;

    for args in [
        r#"{"token_id": "1", "side": "HOLD", "price": 0.5, "size": 1}"#,
        r#"{"token_id": "1", "side": "BUY", "price": 1.5, "size": 1}"#,
        r#"{"token_id": "1", "side": "BUY", "price": 0.5, "size": 0}"#,
        r#"{"token_id": "not-a-number", "side": "BUY", "price": 0.5, "size": 1}"#,
    ] {
        let out = tb.dispatch("place_bet", args).await;
        assert!(out.render().contains("invalid argument"), "{args}");
    }
    assert!(transport.requests_to("/order").is_empty());
}

#[tokio::test]
async fn cancel_order_deletes_with_order_id() {
    let transport = ScriptedTransport::new()
        .post("/auth/api-key", CREDS)
        .route(HttpMethod::Delete, "/order", 200, r#"{"canceled": ["0xfeed"], "not_canceled": {}}"#);
    let tb = trading_toolbox(&transport).await;

    let out = success(tb.dispatch("cancel_order", r#"{"order_id": "0xfeed"}"#).await);
    assert_eq!(out["status"], "cancelled");
    assert_eq!(out["result"]["canceled"][0], "0xfeed");

    let sent = &transport.requests_to("/order")[0];
    assert_eq!(sent.method, HttpMethod::Delete);
    assert_eq!(sent.body.as_deref(), Some(r#"{"orderID":"0xfeed"}"#));
}

#[tokio::test]
async fn wallet_balance_reads_usdc_over_rpc() {
    // 50_000_000 base units = 50.00 USDC
    let transport = ScriptedTransport::new().post("/auth/api-key", CREDS).post(
        "polygon-rpc.com",
        r#"{"jsonrpc": "2.0", "id": 1,
            "result": "0x0000000000000000000000000000000000000000000000000000000002faf080"}"#,
    );
    let tb = trading_toolbox(&transport).await;

    let out = success(tb.dispatch("get_wallet_balance", "{}").await);
    assert_eq!(out["address"], "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    assert_eq!(out["usdc_balance"], "50.00");
}

#[tokio::test]
async fn positions_map_data_api_records() {
    let transport = ScriptedTransport::new().post("/auth/api-key", CREDS).get(
        "/positions",
        r#"[{"title": "BTC above 100k?", "outcome": "Yes", "size": 25,
             "avgPrice": 0.41, "curPrice": "0.62", "asset": "1111"}]"#,
    );
    let tb = trading_toolbox(&transport).await;

    let out = success(tb.dispatch("get_positions", "{}").await);
    assert_eq!(out[0]["market_question"], "BTC above 100k?");
    assert_eq!(out[0]["current_price"], 0.62);
    assert_eq!(out[0]["token_id"], "1111");
}

#[tokio::test]
async fn credential_derive_fallback() {
    let transport = ScriptedTransport::new()
        .route(HttpMethod::Post, "/auth/api-key", 400, "already exists")
        .get("/auth/derive-api-key", CREDS);
    trading_toolbox(&transport).await;

    assert_eq!(transport.requests_to("/auth/api-key").len(), 1);
    assert_eq!(transport.requests_to("/auth/derive-api-key").len(), 1);
}
