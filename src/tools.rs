//! Command dispatch
//!
//! Every command the service understands is a [`Tool`]: a wire name, a
//! JSON-Schema-shaped argument descriptor for discovery, and an async run.
//! The registry dispatches by name and funnels every failure into a
//! [`ToolError`] kind so the HTTP surface can wrap results uniformly.

mod browser;


use crate::session::{SessionError, SessionRegistry};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Command failures. Each renders as the error string of the failure
/// envelope; registry errors pass through unchanged.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Failed to navigate to {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Failed to {operation} {selector}: {reason}")]
    Interaction {
        operation: &'static str,
        selector: String,
        reason: String,
    },

    #[error("Failed to take screenshot: {0}")]
    Screenshot(String),
}

/// All context needed for a command invocation.
///
/// Created fresh for each call; tools are stateless and derive everything
/// from this struct.
#[derive(Clone)]
pub struct ToolContext {
    /// Registry of live browser sessions
    pub sessions: Arc<SessionRegistry>,

    /// Directory screenshot files are written into
    pub screenshot_dir: PathBuf,
}

/// Trait for commands exposed over the HTTP surface.
///
/// `run` validates its arguments before touching the registry or driver,
/// so a malformed request can never have side effects.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Wire name of the command
    fn name(&self) -> &str;

    /// Human-readable description for the discovery document
    fn description(&self) -> String;

    /// JSON schema for the command's arguments
    fn input_schema(&self) -> Value;

    /// Execute the command with all context provided via `ToolContext`
    async fn run(&self, args: Value, ctx: ToolContext) -> Result<Value, ToolError>;
}

/// Descriptor served by the discovery endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Collection of all registered commands.
///
/// Stateless; tools are singletons, all per-call context via `ToolContext`.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with the full browser command set.
    pub fn new() -> Self {
        Self {
            tools: vec![
                Arc::new(browser::LaunchBrowserTool),
                Arc::new(browser::NavigateToTool),
                Arc::new(browser::ClickElementTool),
                Arc::new(browser::TypeTextTool),
                Arc::new(browser::GetTextTool),
                Arc::new(browser::ScreenshotTool),
                Arc::new(browser::CloseBrowserTool),
            ],
        }
    }

    /// Get all command descriptors for discovery
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a command by name with context
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        ctx: ToolContext,
    ) -> Result<Value, ToolError> {
        for tool in &self.tools {
            if tool.name() == name {
                return tool.run(args, ctx).await;
            }
        }
        Err(ToolError::UnknownTool(name.to_string()))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
