//! Authenticated trading against the Polymarket CLOB.
//!
//! `ClobTrader` exists only when a wallet key is configured and API
//! credentials could be derived at startup. It owns the signer, the L2
//! credential triple and the clients for positions and wallet balance.
//!
//! Auth levels:
//! - L1: EIP-712 `ClobAuth` signature, used once to derive API credentials
//! - L2: HMAC-SHA256 over each request, used for order placement/cancel

use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ToolError;
use crate::http::{send_json, HttpRequest, HttpTransport};
use crate::platforms::chain::ChainClient;
use crate::platforms::clob::ClobClient;
use crate::platforms::signing::{l2_signature, ApiCredentials, OrderRequest, OrderSigner};
use crate::types::Position;

const ORDER_PATH: &str = "/order";
const ORDER_TYPE_GTC: &str = "GTC";

fn now_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

// ---------------------------------------------------------------------------
// Data API mapping
// ---------------------------------------------------------------------------

fn number(v: &Value, key: &str) -> f64 {
    match v.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn text(v: &Value, key: &str) -> String {
    v.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Map one Data API position record into a `Position`.
pub fn position_from_value(v: &Value) -> Position {
    Position {
        market_question: text(v, "title"),
        outcome: text(v, "outcome"),
        size: number(v, "size"),
        avg_price: number(v, "avgPrice"),
        current_price: number(v, "curPrice"),
        token_id: v.get("asset").and_then(Value::as_str).map(str::to_string),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Trader
// ---------------------------------------------------------------------------

pub struct ClobTrader {
    transport: Arc<dyn HttpTransport>,
    clob: ClobClient,
    chain: ChainClient,
    data_api_url: String,
    signer: OrderSigner,
    creds: ApiCredentials,
}

impl std::fmt::Debug for ClobTrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClobTrader")
            .field("signer", &self.signer)
            .field("creds", &self.creds)
            .finish()
    }
}

impl ClobTrader {
    /// Derive L2 credentials for `signer` and build a ready trader.
    pub async fn connect(
        transport: Arc<dyn HttpTransport>,
        signer: OrderSigner,
        clob_url: &str,
        data_api_url: &str,
        rpc_url: &str,
    ) -> Result<Self, ToolError> {
        let clob = ClobClient::new(transport.clone(), clob_url);
        let creds = derive_credentials(&*transport, &signer, clob.base_url()).await?;
        info!(
            address = %signer.address(),
            maker = %signer.maker(),
            api_key = %creds.api_key,
            "CLOB trading credentials ready"
        );

        Ok(Self {
            chain: ChainClient::new(transport.clone(), rpc_url),
            clob,
            transport,
            data_api_url: data_api_url.trim_end_matches('/').to_string(),
            signer,
            creds,
        })
    }

    fn l2_request(&self, mut req: HttpRequest, method: &str, path: &str) -> Result<HttpRequest, ToolError> {
        let ts = now_secs().to_string();
        let sig = l2_signature(&self.creds, &ts, method, path, req.body.as_deref())?;
        req = req
            .header("POLY_ADDRESS", self.signer.address().to_checksum(None))
            .header("POLY_SIGNATURE", sig)
            .header("POLY_TIMESTAMP", ts)
            .header("POLY_API_KEY", self.creds.api_key.clone())
            .header("POLY_PASSPHRASE", self.creds.passphrase.expose_secret().clone());
        Ok(req)
    }

    /// Open positions of the maker wallet.
    pub async fn positions(&self) -> Result<Vec<Position>, ToolError> {
        let req = HttpRequest::get(format!("{}/positions", self.data_api_url))
            .query("user", self.signer.maker().to_checksum(None));
        let body = send_json(&*self.transport, req).await?;
        let records = body
            .as_array()
            .ok_or_else(|| ToolError::Decode("expected a list of positions".into()))?;

        Ok(records.iter().map(position_from_value).collect())
    }

    /// Sign and post a GTC limit order.
    pub async fn place_order(&self, order: &OrderRequest) -> Result<Value, ToolError> {
        let token = order.token_id.to_string();
        let neg_risk = self.clob.is_neg_risk(&token).await;
        let fee_rate_bps = self.clob.fee_rate_bps(&token).await;

        let unsigned = self.signer.build_order(order, fee_rate_bps)?;
        let signed = self.signer.sign_order(&unsigned, neg_risk).await?;

        let body = json!({
            "order": signed,
            "owner": self.creds.api_key,
            "orderType": ORDER_TYPE_GTC,
        })
        .to_string();

        info!(
            token_id = %token,
            side = %order.side,
            price = %order.price,
            size = %order.size,
            neg_risk,
            fee_rate_bps,
            "Posting order"
        );

        let req = HttpRequest::post(format!("{}{ORDER_PATH}", self.clob.base_url()), body);
        let req = self.l2_request(req, "POST", ORDER_PATH)?;
        let resp = send_json(&*self.transport, req).await?;
        Ok(json!({ "status": "placed", "order": resp }))
    }

    pub async fn cancel_order(&self, order_id: &str) -> Result<Value, ToolError> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(ToolError::InvalidArgument("order_id is required".into()));
        }

        let body = json!({ "orderID": order_id }).to_string();
        let req = HttpRequest::delete(format!("{}{ORDER_PATH}", self.clob.base_url()), Some(body));
        let req = self.l2_request(req, "DELETE", ORDER_PATH)?;
        let resp = send_json(&*self.transport, req).await?;

        info!(order_id, "Order cancelled");
        Ok(json!({ "status": "cancelled", "result": resp }))
    }

    /// USDC.e balance of the maker wallet.
    pub async fn wallet_balance(&self) -> Result<Value, ToolError> {
        let maker = self.signer.maker();
        let balance = self.chain.usdc_balance(maker).await?;
        Ok(json!({ "address": maker.to_checksum(None), "usdc_balance": balance }))
    }
}

// ---------------------------------------------------------------------------
// L1 credential derivation
// ---------------------------------------------------------------------------

async fn l1_request(signer: &OrderSigner, req: HttpRequest) -> Result<HttpRequest, ToolError> {
    let ts = now_secs();
    let nonce = 0u64;
    let sig = signer.sign_clob_auth(ts, nonce).await?;
    Ok(req
        .header("POLY_ADDRESS", signer.address().to_checksum(None))
        .header("POLY_SIGNATURE", sig)
        .header("POLY_TIMESTAMP", ts.to_string())
        .header("POLY_NONCE", nonce.to_string()))
}

fn parse_credentials(v: Value) -> Result<ApiCredentials, ToolError> {
    let creds: ApiCredentials = serde_json::from_value(v)?;
    if creds.api_key.is_empty() {
        return Err(ToolError::Decode("empty apiKey in credential response".into()));
    }
    Ok(creds)
}

/// Create API credentials, falling back to deriving the existing ones.
pub async fn derive_credentials(
    transport: &dyn HttpTransport,
    signer: &OrderSigner,
    clob_url: &str,
) -> Result<ApiCredentials, ToolError> {
    let create = HttpRequest {
        body: None,
        ..HttpRequest::post(format!("{clob_url}/auth/api-key"), String::new())
    };
    let create = l1_request(signer, create).await?;
    match send_json(transport, create).await.and_then(parse_credentials) {
        Ok(creds) => return Ok(creds),
        Err(e) => warn!(error = %e, "API key creation failed, trying derive"),
    }

    let derive = l1_request(signer, HttpRequest::get(format!("{clob_url}/auth/derive-api-key"))).await?;
    send_json(transport, derive).await.and_then(parse_credentials)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
