//! Polymarket integrations.
//!
//! - `gamma`: market discovery (search, detail, closing-soon scan)
//! - `clob`: public order books, price history, per-token metadata
//! - `trading`: authenticated order placement, positions, balance
//! - `signing`: EIP-712 order/auth signatures and L2 HMAC
//! - `chain`: Polygon JSON-RPC reads

pub mod chain;
pub mod clob;
pub mod gamma;
pub mod signing;
pub mod trading;

pub use clob::ClobClient;
pub use gamma::GammaClient;
pub use trading::ClobTrader;
