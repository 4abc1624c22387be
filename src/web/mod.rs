//! Dashboard HTTP server
//!
//! Thin axum server over the controller. Every browser session is identified
//! by the `ra_session` cookie and maps to one `SessionState` in the registry.
//!
//! Routes:
//! - GET  /summary, POST /summary   - upload a PDF, view extraction and summary
//! - GET  /qa, POST /qa             - ask questions about the uploaded PDF
//! - GET  /feedback, POST /feedback - rate the summary (once per session)
//! - GET  /dashboard                - table and chart of all feedback
//! - GET  /dashboard/chart.svg      - the chart alone
//! - POST /session/end              - discard the session
//! - GET  /health                   - JSON status

pub mod chart;
pub mod handlers;
pub mod views;

use crate::controller::Controller;
use crate::session::{SessionId, SessionRegistry, SessionState};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub const SESSION_COOKIE: &str = "ra_session";

/// How often idle sessions are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// ============================================================================
// AppState
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
    pub sessions: Arc<SessionRegistry>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(controller: Arc<Controller>, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            controller,
            sessions,
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Error type
// ============================================================================

/// Request-level failure rendered as a bare error page
pub struct AppError(pub StatusCode, pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Html(views::error_page(&self.1))).into_response()
    }
}

// ============================================================================
// Session cookie
// ============================================================================

/// Session id from the `ra_session` cookie, if present and well-formed
pub fn cookie_session_id(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionId::parse(value))
}

/// Look up (or start) the caller's session
pub fn session_from_headers(
    state: &AppState,
    headers: &HeaderMap,
) -> (SessionId, Arc<tokio::sync::Mutex<SessionState>>) {
    let (id, session, _) = state.sessions.open(cookie_session_id(headers));
    (id, session)
}

/// Browser-session cookie (no Max-Age: it ends when the browser closes)
pub fn session_cookie(id: SessionId) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index_handler))
        .route("/summary", get(handlers::summary_handler).post(handlers::upload_handler))
        .route("/qa", get(handlers::qa_handler).post(handlers::ask_handler))
        .route("/feedback", get(handlers::feedback_handler).post(handlers::submit_feedback_handler))
        .route("/dashboard", get(handlers::dashboard_handler))
        .route("/dashboard/chart.svg", get(handlers::chart_handler))
        .route("/session/end", post(handlers::end_session_handler))
        .route("/health", get(handlers::health_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Drop idle sessions once a minute
pub async fn session_sweeper(sessions: Arc<SessionRegistry>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let dropped = sessions.sweep_expired();
        if dropped > 0 {
            info!("Discarded {} idle sessions ({} live)", dropped, sessions.len());
        } else {
            debug!("No idle sessions to discard");
        }
    }
}

/// Bind and serve until Ctrl-C
pub async fn serve(state: AppState, bind_addr: &str, max_upload_bytes: usize) -> Result<(), String> {
    tokio::spawn(session_sweeper(state.sessions.clone()));

    let app = router(state, max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", bind_addr, e))?;

    info!("Dashboard listening on http://{}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| format!("Server error: {}", e))
}
