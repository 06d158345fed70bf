//! Agent HTTP server.
//!
//! Mounts the turn endpoint, the shared-state endpoints and the embedded
//! watchlist dashboard under a configurable path. `/health` always lives
//! at the root.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, Method},
    response::Html,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub use routes::{AppState, ServerState};
use routes::sub_path;

/// The embedded dashboard HTML (compiled into the binary).
const DASHBOARD_HTML: &str = include_str!("templates/index.html");

/// Placeholder in the template replaced with the state endpoint path.
const STATE_PATH_PLACEHOLDER: &str = "{{STATE_PATH}}";

/// Bind `port` on all interfaces and serve until the process exits.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let mount = state.mount_path.clone();
    let app = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind agent port {port}"))?;

    info!(port, path = %mount, "Agent server listening on http://localhost:{port}");

    axum::serve(listener, app).await.context("Agent server error")
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE]);

    let mount = state.mount_path.clone();

    Router::new()
        .route(&mount, post(routes::post_turn))
        .route(&sub_path(&mount, "state"), get(routes::get_state).put(routes::put_state))
        .route(&sub_path(&mount, "dashboard"), get(serve_dashboard))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

/// Serve the embedded HTML dashboard, pointed at this mount's state path.
async fn serve_dashboard(State(app): State<AppState>) -> Html<String> {
    let state_path = sub_path(&app.mount_path, "state");
    Html(DASHBOARD_HTML.replace(STATE_PATH_PLACEHOLDER, &state_path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
