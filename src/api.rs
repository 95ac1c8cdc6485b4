//! HTTP API server

mod handlers;
mod types;

pub use handlers::create_router;

use crate::session::SessionRegistry;
use crate::tools::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub screenshot_dir: PathBuf,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(sessions: Arc<SessionRegistry>, screenshot_dir: PathBuf) -> Self {
        Self {
            sessions,
            tools: Arc::new(ToolRegistry::new()),
            screenshot_dir,
            started_at: Instant::now(),
        }
    }
}
