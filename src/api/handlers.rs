//! HTTP request handlers

use super::types::{
    BrowsersResponse, ExecuteRequest, ExecuteResponse, HealthResponse, ToolsResponse,
};
use super::AppState;
use crate::session::SessionError;
use crate::tools::{ToolContext, ToolError};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Liveness probe
        .route("/health", get(health))
        // Command discovery
        .route("/tools", get(list_tools))
        // Command execution
        .route("/tools/execute", post(execute_tool))
        // Live session listing
        .route("/browsers", get(list_browsers))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Health
// ============================================================

/// Probe that never touches the driver, only registry bookkeeping.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now(),
        browsers: state.sessions.count().await,
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

// ============================================================
// Command Discovery
// ============================================================

async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: state.tools.definitions(),
    })
}

// ============================================================
// Command Execution
// ============================================================

async fn execute_tool(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> (StatusCode, Json<ExecuteResponse>) {
    let arguments = req.arguments.unwrap_or_else(|| serde_json::json!({}));
    let ctx = ToolContext {
        sessions: state.sessions.clone(),
        screenshot_dir: state.screenshot_dir.clone(),
    };

    match state.tools.execute(&req.name, arguments, ctx).await {
        Ok(result) => (StatusCode::OK, Json(ExecuteResponse::success(result))),
        Err(e) => {
            // A failed close still unregisters the handle.
            match &e {
                ToolError::Session(SessionError::Close { .. }) => {
                    tracing::warn!("Tool execution error: {e}");
                }
                _ => tracing::error!("Tool execution error: {e}"),
            }
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExecuteResponse::error(e.to_string())),
            )
        }
    }
}

// ============================================================
// Live Sessions
// ============================================================

async fn list_browsers(State(state): State<AppState>) -> Json<BrowsersResponse> {
    let browsers = state.sessions.list_handles().await;
    let count = browsers.len();
    Json(BrowsersResponse { browsers, count })
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("browserd ", env!("CARGO_PKG_VERSION"))
}
