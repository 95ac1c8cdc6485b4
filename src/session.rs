//! Browser session registry
//!
//! Owns every live browser this process has launched. Sessions are keyed
//! by opaque handles; an entry in the map always means a fully-launched
//! browser a client may address. Insertion is the last step of creation,
//! so a failed launch leaves no trace, and removal claims the entry before
//! the close starts, so racing closers get exactly one winner.

mod handle;

use crate::driver::{BrowserDriver, DriverError, DriverPage, Engine, EngineOptions};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Browser not found: {0}")]
    NotFound(String),

    #[error("Failed to close browser {handle}: {reason}")]
    Close { handle: String, reason: String },
}

/// One live browser session.
///
/// Driver calls against a session are serialized through `op_lock`, the
/// close performed during removal included, so two commands addressing the
/// same handle never interleave inside the driver.
pub struct Session {
    engine: Engine,
    created_at: DateTime<Utc>,
    page: Box<dyn DriverPage>,
    op_lock: Mutex<()>,
}

impl Session {
    fn new(engine: Engine, page: Box<dyn DriverPage>) -> Self {
        Self {
            engine,
            created_at: Utc::now(),
            page,
            op_lock: Mutex::new(()),
        }
    }

    pub async fn navigate(&self, url: &str) -> Result<String, DriverError> {
        let _op = self.op_lock.lock().await;
        self.page.navigate(url).await
    }

    pub async fn click(&self, selector: &str) -> Result<(), DriverError> {
        let _op = self.op_lock.lock().await;
        self.page.click(selector).await
    }

    pub async fn fill(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        let _op = self.op_lock.lock().await;
        self.page.fill(selector, text).await
    }

    pub async fn read_text(&self, selector: &str) -> Result<Option<String>, DriverError> {
        let _op = self.op_lock.lock().await;
        self.page.read_text(selector).await
    }

    pub async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, DriverError> {
        let _op = self.op_lock.lock().await;
        self.page.screenshot(full_page).await
    }

    async fn close(&self) -> Result<(), DriverError> {
        let _op = self.op_lock.lock().await;
        self.page.close().await
    }
}

/// Registry of all live sessions, shared across the HTTP surface.
pub struct SessionRegistry {
    driver: Arc<dyn BrowserDriver>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Launch a browser and register it. Returns the new handle.
    ///
    /// The launch happens without any registry lock held; the handle only
    /// becomes visible once the session is fully constructed.
    pub async fn create(
        &self,
        engine: Engine,
        headless: bool,
        options: &EngineOptions,
    ) -> Result<String, SessionError> {
        let page = self
            .driver
            .launch(engine, headless, options)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let session = Arc::new(Session::new(engine, page));

        let mut sessions = self.sessions.write().await;
        let mut handle = handle::generate();
        while sessions.contains_key(&handle) {
            handle = handle::generate();
        }
        sessions.insert(handle.clone(), session);
        drop(sessions);

        tracing::info!(handle = %handle, engine = %engine, headless, "Browser launched");
        Ok(handle)
    }

    /// Look up a live session.
    pub async fn get(&self, handle: &str) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .read()
            .await
            .get(handle)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(handle.to_string()))
    }

    /// Close a session and delete its entry.
    ///
    /// The entry is claimed under the write lock before the driver close
    /// runs, so of two concurrent removals exactly one wins and the other
    /// sees `NotFound`. A failed driver close still leaves the entry
    /// deleted; the failure comes back as `Close` and is otherwise
    /// non-fatal.
    pub async fn remove(&self, handle: &str) -> Result<(), SessionError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(handle)
            .ok_or_else(|| SessionError::NotFound(handle.to_string()))?;

        if let Err(e) = session.close().await {
            tracing::warn!(handle = %handle, error = %e, "Browser close failed; session already unregistered");
            return Err(SessionError::Close {
                handle: handle.to_string(),
                reason: e.to_string(),
            });
        }

        let age_s = Utc::now()
            .signed_duration_since(session.created_at)
            .num_seconds();
        tracing::info!(handle = %handle, engine = %session.engine, age_s, "Browser closed");
        Ok(())
    }

    /// Snapshot of all live handles.
    pub async fn list_handles(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close every session, best effort (called on shutdown).
    ///
    /// All entries leave the map in one write-locked step; individual close
    /// failures are logged and swallowed so one defunct browser cannot keep
    /// the rest alive.
    pub async fn drain_all(&self) {
        let drained: Vec<(String, Arc<Session>)> =
            self.sessions.write().await.drain().collect();
        if drained.is_empty() {
            return;
        }

        tracing::info!(count = drained.len(), "Closing all browser sessions");
        for (handle, session) in drained {
            if let Err(e) = session.close().await {
                tracing::warn!(handle = %handle, error = %e, "Browser close failed during shutdown");
            }
        }
    }
}
