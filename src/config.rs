//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` (every section is optional) and deserializes into
//! strongly-typed structs. Secrets are referenced by env-var name in the
//! config and resolved at startup into `Secrets`; the bind port and mount
//! path can be overridden with `AGENT_PORT` / `AGENT_PATH`.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub trading: TradingConfig,
    pub research: ResearchConfig,
    pub telemetry: TelemetryConfig,
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    /// Upper bound on model round-trips per user turn.
    pub max_tool_rounds: usize,
    /// Replaces the built-in system prompt when set.
    pub system_prompt: Option<String>,
    /// Messages kept per conversation thread; older turns are dropped whole.
    pub max_history_messages: usize,
    /// Conversation threads held in memory; the least recently used is evicted.
    pub max_threads: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "AUGUR".to_string(),
            max_tool_rounds: 8,
            system_prompt: None,
            max_history_messages: 40,
            max_threads: 256,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub api_key_env: String,
    /// OpenAI-compatible chat completions endpoint.
    pub base_url: String,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 2048,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Mount path for the agent endpoint.
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000, path: "/".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TradingConfig {
    pub private_key_env: String,
    pub funder_address_env: String,
    pub chain_id: u64,
    /// 0 = EOA, 1 = Poly proxy, 2 = Gnosis safe.
    pub signature_type: u8,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            private_key_env: "POLYMARKET_PRIVATE_KEY".to_string(),
            funder_address_env: "POLYMARKET_FUNDER_ADDRESS".to_string(),
            chain_id: 137,
            signature_type: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ResearchConfig {
    pub api_key_env: String,
    pub default_results: u32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self { api_key_env: "EXA_API_KEY".to_string(), default_results: 5 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub app_name: String,
    /// Emit JSON log lines instead of human-readable ones.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { enabled: false, app_name: "augur".to_string(), json: false }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EndpointsConfig {
    pub gamma: String,
    pub clob: String,
    pub data_api: String,
    pub polygon_rpc: String,
    pub exa: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            gamma: "https://gamma-api.polymarket.com".to_string(),
            clob: "https://clob.polymarket.com".to_string(),
            data_api: "https://data-api.polymarket.com".to_string(),
            polygon_rpc: "https://polygon-rpc.com".to_string(),
            exa: "https://api.exa.ai".to_string(),
        }
    }
}

/// Secrets resolved from the environment at startup.
///
/// Absence of `trading_key` disables every trading tool; absence of
/// `research_key` disables topic research.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub llm_api_key: Option<SecretString>,
    pub trading_key: Option<SecretString>,
    pub funder_address: Option<String>,
    pub research_key: Option<SecretString>,
}

impl Secrets {
    pub fn trading_enabled(&self) -> bool {
        self.trading_key.is_some()
    }

    pub fn research_enabled(&self) -> bool {
        self.research_key.is_some()
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    /// Environment overrides are applied in both cases.
    pub fn load_or_default(path: &str) -> Result<Self> {
        let mut cfg = if Path::new(path).exists() {
            Self::load(path)?
        } else {
            warn!(path, "No config file found, using defaults");
            Self::default()
        };
        cfg.apply_env_overrides(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `AGENT_PORT` / `AGENT_PATH` / `AUGUR_LOG_JSON` overrides.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("AGENT_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!(value = %port, "Ignoring unparseable AGENT_PORT"),
            }
        }
        if let Some(path) = lookup("AGENT_PATH").filter(|p| !p.trim().is_empty()) {
            self.server.path = path;
        }
        if lookup("AUGUR_LOG_JSON").is_some() {
            self.telemetry.json = true;
        }
    }

    /// Resolve secret env-var references.
    pub fn resolve_secrets<F>(&self, lookup: F) -> Secrets
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Secrets {
            llm_api_key: non_empty(&self.llm.api_key_env).map(SecretString::new),
            trading_key: non_empty(&self.trading.private_key_env).map(SecretString::new),
            funder_address: non_empty(&self.trading.funder_address_env),
            research_key: non_empty(&self.research.api_key_env).map(SecretString::new),
        }
    }
}
