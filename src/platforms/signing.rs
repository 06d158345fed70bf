//! EIP-712 signing for Polymarket CLOB orders and L1 auth, plus the L2
//! HMAC request signature.
//!
//! Digests are assembled by hand: every EIP-712 field is one 32-byte
//! word, so `encodeData` is a flat concatenation of words.

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;

use crate::error::ToolError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const CTF_EXCHANGE: Address =
    alloy_primitives::address!("4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E");
pub const NEG_RISK_CTF_EXCHANGE: Address =
    alloy_primitives::address!("C5d563A36AE78145C45a50134d48A1215220f80a");

const EXCHANGE_DOMAIN_NAME: &str = "Polymarket CTF Exchange";
const AUTH_DOMAIN_NAME: &str = "ClobAuthDomain";
const DOMAIN_VERSION: &str = "1";
const CLOB_AUTH_MESSAGE: &str = "This message attests that I control the given wallet";

const ORDER_TYPE: &[u8] = b"Order(uint256 salt,address maker,address signer,address taker,uint256 tokenId,uint256 makerAmount,uint256 takerAmount,uint256 expiration,uint256 nonce,uint256 feeRateBps,uint8 side,uint8 signatureType)";
const CLOB_AUTH_TYPE: &[u8] =
    b"ClobAuth(address address,string timestamp,uint256 nonce,string message)";

/// Salts must survive a round-trip through a JavaScript number.
const SALT_MASK: u64 = (1 << 53) - 1;

const MIN_PRICE: Decimal = dec!(0.01);
const MAX_PRICE: Decimal = dec!(0.99);
/// USDC and conditional tokens both use 6 decimals.
const BASE_UNITS: Decimal = dec!(1000000);

// ---------------------------------------------------------------------------
// Order side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_u8(self) -> u8 {
        match self {
            Side::Buy => 0,
            Side::Sell => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl FromStr for Side {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(ToolError::InvalidArgument(format!(
                "side must be BUY or SELL, got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Order amounts
// ---------------------------------------------------------------------------

/// Validated limit price (2 dp, within [0.01, 0.99]).
pub fn normalize_price(price: f64) -> Result<Decimal, ToolError> {
    let p = Decimal::from_f64(price)
        .ok_or_else(|| ToolError::InvalidArgument(format!("price is not finite: {price}")))?
        .round_dp(2);
    if p < MIN_PRICE || p > MAX_PRICE {
        return Err(ToolError::InvalidArgument(format!(
            "price must be between {MIN_PRICE} and {MAX_PRICE}, got {price}"
        )));
    }
    Ok(p)
}

/// Validated share count (rounded down to 2 dp, strictly positive).
pub fn normalize_size(size: f64) -> Result<Decimal, ToolError> {
    let s = Decimal::from_f64(size)
        .ok_or_else(|| ToolError::InvalidArgument(format!("size is not finite: {size}")))?
        .round_dp_with_strategy(2, RoundingStrategy::ToZero);
    if s <= Decimal::ZERO {
        return Err(ToolError::InvalidArgument(format!("size must be positive, got {size}")));
    }
    Ok(s)
}

fn to_base_units(amount: Decimal) -> Result<U256, ToolError> {
    (amount * BASE_UNITS)
        .round_dp_with_strategy(0, RoundingStrategy::ToZero)
        .to_u128()
        .map(U256::from)
        .ok_or_else(|| ToolError::InvalidArgument(format!("amount out of range: {amount}")))
}

/// `(maker_amount, taker_amount)` in base units for a limit order of
/// `size` shares at `price`.
///
/// A buy gives USDC and receives shares; a sell gives shares and receives
/// USDC.
pub fn order_amounts(side: Side, price: Decimal, size: Decimal) -> Result<(U256, U256), ToolError> {
    let notional = (size * price).round_dp_with_strategy(4, RoundingStrategy::ToZero);
    let (maker, taker) = match side {
        Side::Buy => (notional, size),
        Side::Sell => (size, notional),
    };
    Ok((to_base_units(maker)?, to_base_units(taker)?))
}

// ---------------------------------------------------------------------------
// EIP-712 encoding
// ---------------------------------------------------------------------------

fn address_word(a: Address) -> B256 {
    B256::left_padding_from(a.as_slice())
}

fn uint_word(v: U256) -> B256 {
    B256::from(v.to_be_bytes::<32>())
}

fn hash_words(words: &[B256]) -> B256 {
    let mut buf = Vec::with_capacity(words.len() * 32);
    for w in words {
        buf.extend_from_slice(w.as_slice());
    }
    keccak256(&buf)
}

fn exchange_domain_separator(chain_id: u64, verifying_contract: Address) -> B256 {
    hash_words(&[
        keccak256(b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)"),
        keccak256(EXCHANGE_DOMAIN_NAME.as_bytes()),
        keccak256(DOMAIN_VERSION.as_bytes()),
        uint_word(U256::from(chain_id)),
        address_word(verifying_contract),
    ])
}

fn auth_domain_separator(chain_id: u64) -> B256 {
    hash_words(&[
        keccak256(b"EIP712Domain(string name,string version,uint256 chainId)"),
        keccak256(AUTH_DOMAIN_NAME.as_bytes()),
        keccak256(DOMAIN_VERSION.as_bytes()),
        uint_word(U256::from(chain_id)),
    ])
}

/// keccak256("\x19\x01" ‖ domainSeparator ‖ structHash)
fn typed_data_digest(domain_separator: B256, struct_hash: B256) -> B256 {
    let mut buf = Vec::with_capacity(66);
    buf.extend_from_slice(&[0x19, 0x01]);
    buf.extend_from_slice(domain_separator.as_slice());
    buf.extend_from_slice(struct_hash.as_slice());
    keccak256(&buf)
}

/// EIP-712 digest of the ClobAuth message used for L1 authentication.
pub fn clob_auth_digest(chain_id: u64, address: Address, timestamp: u64, nonce: u64) -> B256 {
    let struct_hash = hash_words(&[
        keccak256(CLOB_AUTH_TYPE),
        address_word(address),
        keccak256(timestamp.to_string().as_bytes()),
        uint_word(U256::from(nonce)),
        keccak256(CLOB_AUTH_MESSAGE.as_bytes()),
    ]);
    typed_data_digest(auth_domain_separator(chain_id), struct_hash)
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// An order ready to be signed.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedOrder {
    pub salt: u64,
    pub maker: Address,
    pub signer: Address,
    pub taker: Address,
    pub token_id: U256,
    pub maker_amount: U256,
    pub taker_amount: U256,
    pub expiration: u64,
    pub nonce: u64,
    pub fee_rate_bps: u64,
    pub side: Side,
    pub signature_type: u8,
}

impl UnsignedOrder {
    pub fn struct_hash(&self) -> B256 {
        hash_words(&[
            keccak256(ORDER_TYPE),
            uint_word(U256::from(self.salt)),
            address_word(self.maker),
            address_word(self.signer),
            address_word(self.taker),
            uint_word(self.token_id),
            uint_word(self.maker_amount),
            uint_word(self.taker_amount),
            uint_word(U256::from(self.expiration)),
            uint_word(U256::from(self.nonce)),
            uint_word(U256::from(self.fee_rate_bps)),
            uint_word(U256::from(self.side.as_u8())),
            uint_word(U256::from(self.signature_type)),
        ])
    }

    /// Digest to sign against the standard or neg-risk exchange.
    pub fn digest(&self, chain_id: u64, neg_risk: bool) -> B256 {
        let exchange = if neg_risk { NEG_RISK_CTF_EXCHANGE } else { CTF_EXCHANGE };
        typed_data_digest(exchange_domain_separator(chain_id, exchange), self.struct_hash())
    }
}

/// Wire form of a signed order as accepted by `POST /order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOrder {
    pub salt: u64,
    pub maker: String,
    pub signer: String,
    pub taker: String,
    pub token_id: String,
    pub maker_amount: String,
    pub taker_amount: String,
    pub expiration: String,
    pub nonce: String,
    pub fee_rate_bps: String,
    pub side: String,
    pub signature_type: u8,
    pub signature: String,
}

impl SignedOrder {
    fn new(order: &UnsignedOrder, signature: String) -> Self {
        Self {
            salt: order.salt,
            maker: order.maker.to_checksum(None),
            signer: order.signer.to_checksum(None),
            taker: order.taker.to_checksum(None),
            token_id: order.token_id.to_string(),
            maker_amount: order.maker_amount.to_string(),
            taker_amount: order.taker_amount.to_string(),
            expiration: order.expiration.to_string(),
            nonce: order.nonce.to_string(),
            fee_rate_bps: order.fee_rate_bps.to_string(),
            side: order.side.as_str().to_string(),
            signature_type: order.signature_type,
            signature,
        }
    }
}

/// What the model asked for, after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub token_id: U256,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}

impl OrderRequest {
    pub fn parse(token_id: &str, side: &str, price: f64, size: f64) -> Result<Self, ToolError> {
        let token_id = token_id.trim();
        if token_id.is_empty() {
            return Err(ToolError::InvalidArgument("token_id is required".into()));
        }
        let token_id = U256::from_str_radix(token_id, 10).map_err(|_| {
            ToolError::InvalidArgument(format!("token_id must be a decimal integer: {token_id}"))
        })?;
        Ok(Self {
            token_id,
            side: side.parse()?,
            price: normalize_price(price)?,
            size: normalize_size(size)?,
        })
    }
}

fn random_salt() -> u64 {
    uuid::Uuid::new_v4().as_u64_pair().0 & SALT_MASK
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

/// Wallet-backed signer for orders and L1 auth.
#[derive(Clone)]
pub struct OrderSigner {
    signer: PrivateKeySigner,
    maker: Address,
    chain_id: u64,
    signature_type: u8,
}

impl OrderSigner {
    /// Build from a hex private key and an optional funder (maker) address.
    pub fn from_key(
        key: &SecretString,
        funder: Option<&str>,
        chain_id: u64,
        signature_type: u8,
    ) -> Result<Self, ToolError> {
        let raw = key.expose_secret().trim();
        let signer = PrivateKeySigner::from_str(raw.strip_prefix("0x").unwrap_or(raw))
            .map_err(|e| ToolError::Signing(format!("invalid private key: {e}")))?;

        let maker = match funder.map(str::trim).filter(|f| !f.is_empty()) {
            Some(f) => f
                .parse::<Address>()
                .map_err(|e| ToolError::Signing(format!("invalid funder address: {e}")))?,
            None => signer.address(),
        };

        Ok(Self { signer, maker, chain_id, signature_type })
    }

    /// The signing key's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Order maker: the funder when configured, else the signer.
    pub fn maker(&self) -> Address {
        self.maker
    }

    /// Lay out a GTC order (no expiration, nonce 0) for `req`.
    pub fn build_order(&self, req: &OrderRequest, fee_rate_bps: u64) -> Result<UnsignedOrder, ToolError> {
        let (maker_amount, taker_amount) = order_amounts(req.side, req.price, req.size)?;
        Ok(UnsignedOrder {
            salt: random_salt(),
            maker: self.maker,
            signer: self.address(),
            taker: Address::ZERO,
            token_id: req.token_id,
            maker_amount,
            taker_amount,
            expiration: 0,
            nonce: 0,
            fee_rate_bps,
            side: req.side,
            signature_type: self.signature_type,
        })
    }

    pub async fn sign_order(&self, order: &UnsignedOrder, neg_risk: bool) -> Result<SignedOrder, ToolError> {
        let signature = self.sign_digest(order.digest(self.chain_id, neg_risk)).await?;
        Ok(SignedOrder::new(order, signature))
    }

    /// Sign the ClobAuth message for `POLY_SIGNATURE` on L1 endpoints.
    pub async fn sign_clob_auth(&self, timestamp: u64, nonce: u64) -> Result<String, ToolError> {
        self.sign_digest(clob_auth_digest(self.chain_id, self.address(), timestamp, nonce))
            .await
    }

    async fn sign_digest(&self, digest: B256) -> Result<String, ToolError> {
        let sig = self
            .signer
            .sign_hash(&digest)
            .await
            .map_err(|e| ToolError::Signing(e.to_string()))?;
        Ok(format!("0x{}", hex::encode(sig.as_bytes())))
    }
}

impl fmt::Debug for OrderSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderSigner")
            .field("address", &self.address())
            .field("maker", &self.maker)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// L2 credentials
// ---------------------------------------------------------------------------

/// API credential triple returned by `/auth/api-key`.
#[derive(Clone, Deserialize)]
pub struct ApiCredentials {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    pub secret: SecretString,
    pub passphrase: SecretString,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("secret", &"[REDACTED]")
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}

/// HMAC-SHA256 over `timestamp ‖ method ‖ path ‖ body`, keyed by the
/// base64 secret, encoded URL-safe base64.
pub fn l2_signature(
    creds: &ApiCredentials,
    timestamp: &str,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> Result<String, ToolError> {
    let secret = creds.secret.expose_secret();
    let key = URL_SAFE
        .decode(secret)
        .or_else(|_| URL_SAFE_NO_PAD.decode(secret))
        .or_else(|_| STANDARD.decode(secret))
        .map_err(|e| ToolError::Signing(format!("API secret is not base64: {e}")))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(&key)
        .map_err(|e| ToolError::Signing(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(method.as_bytes());
    mac.update(path.as_bytes());
    if let Some(b) = body {
        mac.update(b.as_bytes());
    }
    Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
