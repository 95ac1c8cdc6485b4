//! Driver boundary for browser engines
//!
//! The registry and the command layer never talk to a browser directly;
//! everything goes through these traits. Production uses the CDP-backed
//! driver in [`cdp`], tests swap in the in-memory fake from [`testing`].

mod cdp;

#[cfg(test)]
pub mod testing;

pub use cdp::CdpDriver;

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Browser engine requested at launch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Engine {
    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Chromium => "chromium",
            Engine::Firefox => "firefox",
            Engine::Webkit => "webkit",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

/// Optional launch overrides, merged over the driver defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineOptions {
    /// Viewport override (default 1920x1080).
    pub viewport: Option<ViewportSize>,
    /// User agent override.
    pub user_agent: Option<String>,
    /// Extra engine flags, appended after the built-in flag list.
    pub args: Vec<String>,
}

/// Failures reported by a driver implementation.
///
/// Variants carry the driver's own reason text; the command layer wraps
/// them with the URL/selector/handle context before they reach a client.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{0}")]
    Launch(String),

    #[error("{0}")]
    Navigation(String),

    #[error("{0}")]
    Interaction(String),

    #[error("{0}")]
    Screenshot(String),

    #[error("{0}")]
    Close(String),
}

/// A live browser launched by a [`BrowserDriver`].
///
/// One value owns one engine process, one isolated context, and one open
/// page. Methods take `&self`; implementations synchronize internally.
/// Element lookups poll until the element appears, so callers are expected
/// to bound every call with their own timeout.
#[async_trait]
pub trait DriverPage: Send + Sync {
    /// Navigate the page and wait for it to settle. Returns the resolved
    /// URL, which may differ from the requested one after redirects.
    async fn navigate(&self, url: &str) -> Result<String, DriverError>;

    /// Wait for `selector` and click the first match.
    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    /// Wait for `selector`, clear its current value, and type `text`.
    async fn fill(&self, selector: &str, text: &str) -> Result<(), DriverError>;

    /// Wait for `selector` and return its inner text, if any.
    async fn read_text(&self, selector: &str) -> Result<Option<String>, DriverError>;

    /// Capture a PNG of the viewport, or the whole page when `full_page`.
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, DriverError>;

    /// Shut the browser down and release its resources. Safe to call once;
    /// later calls are no-ops.
    async fn close(&self) -> Result<(), DriverError>;
}

/// Launches browsers. One driver instance serves the whole process.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(
        &self,
        engine: Engine,
        headless: bool,
        options: &EngineOptions,
    ) -> Result<Box<dyn DriverPage>, DriverError>;
}
