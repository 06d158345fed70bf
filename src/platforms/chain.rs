//! Polygon JSON-RPC reads (USDC.e wallet balance).

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::error::ToolError;
use crate::http::{send_json, HttpRequest, HttpTransport};

/// Bridged USDC on Polygon, the CLOB collateral token.
pub const USDC_E: &str = "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174";
const USDC_DECIMALS: u32 = 6;
/// `balanceOf(address)`
const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Calldata for `balanceOf(owner)`.
pub fn balance_of_calldata(owner: Address) -> String {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(owner.as_slice());
    format!("0x{}", hex::encode(data))
}

/// Format a raw 6-decimal token amount as a two-decimal string.
pub fn format_usdc(raw: U256) -> Result<String, ToolError> {
    let units = u128::try_from(raw)
        .ok()
        .and_then(|u| i128::try_from(u).ok())
        .ok_or_else(|| ToolError::Decode(format!("balance out of range: {raw}")))?;
    let mut amount = Decimal::try_from_i128_with_scale(units, USDC_DECIMALS)
        .map_err(|e| ToolError::Decode(e.to_string()))?;
    amount.rescale(2);
    Ok(amount.to_string())
}

pub struct ChainClient {
    transport: Arc<dyn HttpTransport>,
    rpc_url: String,
}

impl ChainClient {
    pub fn new(transport: Arc<dyn HttpTransport>, rpc_url: impl Into<String>) -> Self {
        Self { transport, rpc_url: rpc_url.into() }
    }

    /// USDC.e balance of `owner`, formatted to 2 dp.
    pub async fn usdc_balance(&self, owner: Address) -> Result<String, ToolError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": USDC_E, "data": balance_of_calldata(owner) },
                "latest"
            ]
        });

        let resp = send_json(&*self.transport, HttpRequest::post(&self.rpc_url, body.to_string())).await?;
        if let Some(err) = resp.get("error") {
            let msg = err.get("message").and_then(Value::as_str).unwrap_or("unknown RPC error");
            return Err(ToolError::Decode(format!("eth_call failed: {msg}")));
        }

        let hex_val = resp
            .get("result")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::Decode("eth_call returned no result".into()))?;
        let digits = hex_val.trim_start_matches("0x");
        let raw = if digits.is_empty() {
            U256::ZERO
        } else {
            U256::from_str_radix(digits, 16)
                .map_err(|e| ToolError::Decode(format!("bad eth_call result: {e}")))?
        };

        debug!(owner = %owner, raw = %raw, "USDC.e balance read");
        format_usdc(raw)
    }
}
