//! AUGUR: conversational Polymarket trading agent.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! resolves secrets, builds the tool clients once and serves the agent
//! endpoint until the process is stopped.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use augur::agent::Agent;
use augur::config::{self, Secrets};
use augur::data::ExaResearch;
use augur::http::{HttpTransport, ReqwestTransport};
use augur::llm::openai::OpenAiClient;
use augur::platforms::signing::OrderSigner;
use augur::platforms::ClobTrader;
use augur::server::{self, ServerState};
use augur::tools::Toolbox;

const BANNER: &str = r#"
    _   _   _  ____ _   _ ____
   / \ | | | |/ ___| | | |  _ \
  / _ \| | | | |  _| | | | |_) |
 / ___ \ |_| | |_| | |_| |  _ <
/_/   \_\___/ \____|\___/|_| \_\

  Conversational Polymarket Agent
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load_or_default("config.toml")?;

    init_logging(&cfg.telemetry);

    println!("{BANNER}");
    info!(
        app = %cfg.telemetry.app_name,
        agent_name = %cfg.agent.name,
        model = %cfg.llm.model,
        port = cfg.server.port,
        path = %cfg.server.path,
        "AUGUR starting up"
    );

    let secrets = cfg.resolve_secrets(|k| std::env::var(k).ok());
    info!(
        trading = secrets.trading_enabled(),
        research = secrets.research_enabled(),
        "Credentials resolved"
    );
    let llm_key = secrets
        .llm_api_key
        .clone()
        .with_context(|| format!("Model API key not set: {}", cfg.llm.api_key_env))?;

    // -- Tool clients ------------------------------------------------------

    let transport: Arc<dyn HttpTransport> =
        Arc::new(ReqwestTransport::new().context("Failed to build HTTP transport")?);

    let mut toolbox = Toolbox::read_only(transport.clone(), &cfg.endpoints);

    match build_trader(&cfg, &secrets, transport.clone()).await {
        Some(trader) => toolbox = toolbox.with_trader(trader),
        None => info!("Trading tools disabled"),
    }

    match &secrets.research_key {
        Some(key) => {
            let exa = ExaResearch::new(transport.clone(), cfg.endpoints.exa.clone(), key.clone());
            toolbox = toolbox.with_research(Arc::new(exa), cfg.research.default_results);
            info!("Topic research enabled");
        }
        None => info!(env = %cfg.research.api_key_env, "Topic research disabled"),
    }

    // -- Model and agent ---------------------------------------------------

    let model = OpenAiClient::new(
        llm_key,
        &cfg.llm.base_url,
        Some(cfg.llm.model.clone()),
        Some(cfg.llm.max_tokens),
    )?;

    let agent = Agent::new(Arc::new(model), Arc::new(toolbox), &cfg.agent);
    let state = Arc::new(
        ServerState::new(agent, &cfg.server.path).with_thread_limit(cfg.agent.max_threads),
    );

    server::serve(state, cfg.server.port).await
}

/// Derive CLOB credentials when a trading key is configured.
///
/// Any failure leaves trading disabled instead of aborting startup.
async fn build_trader(
    cfg: &config::AppConfig,
    secrets: &Secrets,
    transport: Arc<dyn HttpTransport>,
) -> Option<ClobTrader> {
    let key = secrets.trading_key.as_ref()?;

    let signer = match OrderSigner::from_key(
        key,
        secrets.funder_address.as_deref(),
        cfg.trading.chain_id,
        cfg.trading.signature_type,
    ) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "Trading key rejected");
            return None;
        }
    };

    let endpoints = &cfg.endpoints;
    match ClobTrader::connect(transport, signer, &endpoints.clob, &endpoints.data_api, &endpoints.polygon_rpc).await {
        Ok(trader) => Some(trader),
        Err(e) => {
            warn!(error = %e, "CLOB credential derivation failed");
            None
        }
    }
}

/// Initialise the `tracing` subscriber.
///
/// `telemetry.enabled` adds span close events (with timings) for turns
/// and outbound calls.
fn init_logging(telemetry: &config::TelemetryConfig) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("augur=info,tower_http=warn"));

    let span_events = if telemetry.enabled { FmtSpan::CLOSE } else { FmtSpan::NONE };

    if telemetry.json {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_span_events(span_events)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_span_events(span_events)
            .with_target(true)
            .init();
    }
}
