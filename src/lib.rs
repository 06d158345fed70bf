//! AUGUR: conversational Polymarket trading agent.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod error;
pub mod http;
pub mod types;
pub mod bridge;
pub mod platforms;
pub mod data;
pub mod llm;
pub mod tools;
pub mod agent;
pub mod server;
