//! Agent API route handlers.
//!
//! State is shared via `Arc<ServerState>`. Turns and client state writes
//! are serialized by `turn_lock`; the shared `AgentState` is only ever
//! replaced whole.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, info_span, Instrument};

use crate::agent::Agent;
use crate::llm::ChatMessage;
use crate::types::AgentState;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub const DEFAULT_MAX_THREADS: usize = 256;

/// Conversation history per thread id, bounded by thread count.
///
/// When full, the least recently written thread is evicted.
#[derive(Debug)]
pub struct ThreadStore {
    threads: HashMap<String, Thread>,
    max_threads: usize,
    clock: u64,
}

#[derive(Debug)]
struct Thread {
    messages: Vec<ChatMessage>,
    last_used: u64,
}

impl ThreadStore {
    pub fn new(max_threads: usize) -> Self {
        Self { threads: HashMap::new(), max_threads: max_threads.max(1), clock: 0 }
    }

    pub fn history(&self, thread_id: &str) -> Vec<ChatMessage> {
        self.threads.get(thread_id).map(|t| t.messages.clone()).unwrap_or_default()
    }

    pub fn insert(&mut self, thread_id: String, messages: Vec<ChatMessage>) {
        self.clock += 1;
        self.threads.insert(thread_id, Thread { messages, last_used: self.clock });

        while self.threads.len() > self.max_threads {
            let Some(oldest) = self
                .threads
                .iter()
                .min_by_key(|(_, t)| t.last_used)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            debug!(thread_id = %oldest, "Evicting idle thread");
            self.threads.remove(&oldest);
        }
    }

    pub fn contains_key(&self, thread_id: &str) -> bool {
        self.threads.contains_key(thread_id)
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

/// Shared state accessible by all route handlers.
pub struct ServerState {
    pub agent: Agent,
    pub state: RwLock<AgentState>,
    pub threads: RwLock<ThreadStore>,
    pub turn_lock: Mutex<()>,
    pub started_at: DateTime<Utc>,
    /// Mount path of the agent endpoint, used by the dashboard.
    pub mount_path: String,
}

impl ServerState {
    pub fn new(agent: Agent, mount_path: &str) -> Self {
        Self {
            agent,
            state: RwLock::new(AgentState::new()),
            threads: RwLock::new(ThreadStore::new(DEFAULT_MAX_THREADS)),
            turn_lock: Mutex::new(()),
            started_at: Utc::now(),
            mount_path: normalize_mount(mount_path),
        }
    }

    /// Cap the number of conversation threads held in memory.
    pub fn with_thread_limit(self, max_threads: usize) -> Self {
        Self { threads: RwLock::new(ThreadStore::new(max_threads)), ..self }
    }
}

pub type AppState = Arc<ServerState>;

/// `""`, `"/"` → `"/"`; `"agent/"` → `"/agent"`.
pub fn normalize_mount(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Append `suffix` (e.g. `"state"`) to a normalized mount path.
pub fn sub_path(mount: &str, suffix: &str) -> String {
    if mount == "/" {
        format!("/{suffix}")
    } else {
        format!("{mount}/{suffix}")
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub thread_id: Option<String>,
    pub message: String,
    /// Client-pushed state; replaces the shared state before the turn.
    #[serde(default)]
    pub state: Option<AgentState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub thread_id: String,
    pub reply: String,
    pub state: AgentState,
    pub state_changed: bool,
    pub tool_calls: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub trading_enabled: bool,
    pub research_enabled: bool,
    pub uptime_secs: i64,
}

/// JSON error body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST {mount}
pub async fn post_turn(
    State(app): State<AppState>,
    Json(req): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "message must not be empty"));
    }

    let thread_id = req
        .thread_id
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let span = info_span!("turn", thread_id = %thread_id);
    async move {
        let _turn = app.turn_lock.lock().await;

        if let Some(pushed) = req.state {
            *app.state.write().await = pushed;
        }
        let current = app.state.read().await.clone();
        let history = app.threads.read().await.history(&thread_id);

        info!(history = history.len(), "Turn started");
        let outcome = app
            .agent
            .run_turn(&history, current, &req.message)
            .await
            .map_err(|e| {
                error!(error = %e, "Turn failed");
                ApiError::new(StatusCode::BAD_GATEWAY, format!("{e:#}"))
            })?;

        if outcome.state_changed {
            *app.state.write().await = outcome.state.clone();
        }
        app.threads.write().await.insert(thread_id.clone(), outcome.messages);

        Ok::<_, ApiError>(Json(TurnResponse {
            thread_id,
            reply: outcome.reply,
            state: outcome.state,
            state_changed: outcome.state_changed,
            tool_calls: outcome.tool_calls,
        }))
    }
    .instrument(span)
    .await
}

/// GET {mount}/state
pub async fn get_state(State(app): State<AppState>) -> Json<AgentState> {
    Json(app.state.read().await.clone())
}

/// PUT {mount}/state
///
/// Waits for any running turn, so a turn never overwrites a newer client
/// write with a result computed from an older snapshot.
pub async fn put_state(State(app): State<AppState>, Json(next): Json<AgentState>) -> Json<AgentState> {
    let _turn = app.turn_lock.lock().await;
    *app.state.write().await = next.clone();
    if next.is_empty() {
        info!("State cleared by client");
    } else {
        info!(
            markets = next.markets.len(),
            positions = next.positions.len(),
            positions_pnl = next.positions_pnl(),
            "State replaced by client"
        );
    }
    Json(next)
}

/// GET /health
pub async fn health(State(app): State<AppState>) -> Json<HealthResponse> {
    let toolbox = app.agent.toolbox();
    Json(HealthResponse {
        status: "ok",
        model: app.agent.model_name().to_string(),
        trading_enabled: toolbox.trading_enabled(),
        research_enabled: toolbox.research_enabled(),
        uptime_secs: (Utc::now() - app.started_at).num_seconds(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
