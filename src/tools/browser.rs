//! Browser command implementations
//!
//! One tool per command the service accepts. Each deserializes its own
//! argument struct (validation happens here, before any registry or driver
//! call), resolves the session by handle, and drives it under an explicit
//! timeout.

use super::{Tool, ToolContext, ToolError};
use crate::driver::{Engine, EngineOptions};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Upper bound on a navigation, including its settle wait.
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on element commands (click, type, read). Covers waiting for
/// the selector to appear as well as the interaction itself.
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on capturing a screenshot.
const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(30);

fn parse<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn interaction(operation: &'static str, selector: &str, reason: impl ToString) -> ToolError {
    ToolError::Interaction {
        operation,
        selector: selector.to_string(),
        reason: reason.to_string(),
    }
}

fn timed_out(limit: Duration, waiting_for: &str) -> String {
    format!("Timed out after {}s waiting for {waiting_for}", limit.as_secs())
}

fn default_true() -> bool {
    true
}

// ============================================================================
// launch_browser
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LaunchInput {
    #[serde(default)]
    engine: Engine,
    #[serde(default = "default_true")]
    headless: bool,
    #[serde(default)]
    engine_options: EngineOptions,
}

pub struct LaunchBrowserTool;

#[async_trait]
impl Tool for LaunchBrowserTool {
    fn name(&self) -> &'static str {
        "launch_browser"
    }

    fn description(&self) -> String {
        "Launch a new browser instance".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "engine": {
                    "type": "string",
                    "enum": ["chromium", "firefox", "webkit"],
                    "default": "chromium",
                    "description": "Browser engine to launch"
                },
                "headless": {
                    "type": "boolean",
                    "default": true,
                    "description": "Run without a visible window (default: true)"
                },
                "engineOptions": {
                    "type": "object",
                    "default": {},
                    "description": "Launch overrides: viewport {width, height}, userAgent, args"
                }
            }
        })
    }

    async fn run(&self, args: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        let input: LaunchInput = parse(args)?;

        let handle = ctx
            .sessions
            .create(input.engine, input.headless, &input.engine_options)
            .await?;

        Ok(json!({
            "handle": handle,
            "message": format!("Browser launched successfully. Handle: {handle}"),
        }))
    }
}

// ============================================================================
// navigate_to
// ============================================================================

#[derive(Debug, Deserialize)]
struct NavigateInput {
    handle: String,
    url: String,
}

pub struct NavigateToTool;

#[async_trait]
impl Tool for NavigateToTool {
    fn name(&self) -> &'static str {
        "navigate_to"
    }

    fn description(&self) -> String {
        "Navigate to a URL".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "handle": {
                    "type": "string",
                    "description": "Handle of a live browser session"
                },
                "url": {
                    "type": "string",
                    "description": "The URL to navigate to"
                }
            },
            "required": ["handle", "url"]
        })
    }

    async fn run(&self, args: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        let input: NavigateInput = parse(args)?;
        let session = ctx.sessions.get(&input.handle).await?;

        let result = tokio::time::timeout(NAVIGATION_TIMEOUT, session.navigate(&input.url)).await;
        let resolved = match result {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => {
                return Err(ToolError::Navigation {
                    url: input.url,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(ToolError::Navigation {
                    url: input.url,
                    reason: timed_out(NAVIGATION_TIMEOUT, "page load"),
                })
            }
        };

        tracing::info!("Navigation successful: {}", input.url);
        Ok(json!({
            "url": resolved,
            "message": format!("Successfully navigated to: {}", input.url),
        }))
    }
}

// ============================================================================
// click_element
// ============================================================================

#[derive(Debug, Deserialize)]
struct ClickInput {
    handle: String,
    selector: String,
}

pub struct ClickElementTool;

#[async_trait]
impl Tool for ClickElementTool {
    fn name(&self) -> &'static str {
        "click_element"
    }

    fn description(&self) -> String {
        "Click an element on the page".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "handle": {
                    "type": "string",
                    "description": "Handle of a live browser session"
                },
                "selector": {
                    "type": "string",
                    "description": "CSS selector for the element to click"
                }
            },
            "required": ["handle", "selector"]
        })
    }

    async fn run(&self, args: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        let input: ClickInput = parse(args)?;
        let session = ctx.sessions.get(&input.handle).await?;

        let result = tokio::time::timeout(ELEMENT_TIMEOUT, session.click(&input.selector)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(interaction("click element", &input.selector, e)),
            Err(_) => {
                return Err(interaction(
                    "click element",
                    &input.selector,
                    timed_out(ELEMENT_TIMEOUT, "selector"),
                ))
            }
        }

        tracing::info!("Element clicked: {}", input.selector);
        Ok(json!({
            "selector": input.selector,
            "message": format!("Successfully clicked element: {}", input.selector),
        }))
    }
}

// ============================================================================
// type_text
// ============================================================================

#[derive(Debug, Deserialize)]
struct TypeTextInput {
    handle: String,
    selector: String,
    text: String,
}

pub struct TypeTextTool;

#[async_trait]
impl Tool for TypeTextTool {
    fn name(&self) -> &'static str {
        "type_text"
    }

    fn description(&self) -> String {
        "Type text into an input field".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "handle": {
                    "type": "string",
                    "description": "Handle of a live browser session"
                },
                "selector": {
                    "type": "string",
                    "description": "CSS selector for the input field"
                },
                "text": {
                    "type": "string",
                    "description": "Text to type, replacing the current value"
                }
            },
            "required": ["handle", "selector", "text"]
        })
    }

    async fn run(&self, args: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        let input: TypeTextInput = parse(args)?;
        let session = ctx.sessions.get(&input.handle).await?;

        let result = tokio::time::timeout(
            ELEMENT_TIMEOUT,
            session.fill(&input.selector, &input.text),
        )
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(interaction("type text into", &input.selector, e)),
            Err(_) => {
                return Err(interaction(
                    "type text into",
                    &input.selector,
                    timed_out(ELEMENT_TIMEOUT, "selector"),
                ))
            }
        }

        tracing::info!("Text typed into {}", input.selector);
        Ok(json!({
            "selector": input.selector,
            "text": input.text,
            "message": format!("Successfully typed text into: {}", input.selector),
        }))
    }
}

// ============================================================================
// get_text
// ============================================================================

#[derive(Debug, Deserialize)]
struct GetTextInput {
    handle: String,
    selector: String,
}

pub struct GetTextTool;

#[async_trait]
impl Tool for GetTextTool {
    fn name(&self) -> &'static str {
        "get_text"
    }

    fn description(&self) -> String {
        "Get text content from an element".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "handle": {
                    "type": "string",
                    "description": "Handle of a live browser session"
                },
                "selector": {
                    "type": "string",
                    "description": "CSS selector for the element to read"
                }
            },
            "required": ["handle", "selector"]
        })
    }

    async fn run(&self, args: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        let input: GetTextInput = parse(args)?;
        let session = ctx.sessions.get(&input.handle).await?;

        let result =
            tokio::time::timeout(ELEMENT_TIMEOUT, session.read_text(&input.selector)).await;
        let text = match result {
            Ok(Ok(Some(text))) if !text.is_empty() => text,
            // An element with no text is a valid answer, not a failure.
            Ok(Ok(_)) => "No text found".to_string(),
            Ok(Err(e)) => return Err(interaction("get text from", &input.selector, e)),
            Err(_) => {
                return Err(interaction(
                    "get text from",
                    &input.selector,
                    timed_out(ELEMENT_TIMEOUT, "selector"),
                ))
            }
        };

        tracing::info!("Text retrieved from {}", input.selector);
        Ok(json!({
            "selector": input.selector,
            "text": text,
            "message": format!("Text content retrieved from {}", input.selector),
        }))
    }
}

// ============================================================================
// screenshot
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotInput {
    handle: String,
    #[serde(default)]
    full_page: bool,
}

pub struct ScreenshotTool;

static SCREENSHOT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Timestamped filename with a process-wide counter, so two captures in the
/// same millisecond still land in distinct files.
fn screenshot_filename() -> String {
    let stamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ");
    let seq = SCREENSHOT_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("screenshot_{stamp}_{seq}.png")
}

#[async_trait]
impl Tool for ScreenshotTool {
    fn name(&self) -> &'static str {
        "screenshot"
    }

    fn description(&self) -> String {
        "Take a screenshot of the current page".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "handle": {
                    "type": "string",
                    "description": "Handle of a live browser session"
                },
                "fullPage": {
                    "type": "boolean",
                    "default": false,
                    "description": "Capture the full scrollable page instead of the viewport"
                }
            },
            "required": ["handle"]
        })
    }

    async fn run(&self, args: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        let input: ScreenshotInput = parse(args)?;
        let session = ctx.sessions.get(&input.handle).await?;

        let result =
            tokio::time::timeout(SCREENSHOT_TIMEOUT, session.screenshot(input.full_page)).await;
        let png = match result {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => return Err(ToolError::Screenshot(e.to_string())),
            Err(_) => {
                return Err(ToolError::Screenshot(timed_out(
                    SCREENSHOT_TIMEOUT,
                    "capture",
                )))
            }
        };

        let path = ctx.screenshot_dir.join(screenshot_filename());
        tokio::fs::write(&path, &png).await.map_err(|e| {
            ToolError::Screenshot(format!("could not write {}: {e}", path.display()))
        })?;

        let filename = path.display().to_string();
        tracing::info!("Screenshot saved: {filename}");
        Ok(json!({
            "filename": filename,
            "fullPage": input.full_page,
            "message": format!("Screenshot saved to: {filename}"),
        }))
    }
}

// ============================================================================
// close_browser
// ============================================================================

#[derive(Debug, Deserialize)]
struct CloseInput {
    handle: String,
}

pub struct CloseBrowserTool;

#[async_trait]
impl Tool for CloseBrowserTool {
    fn name(&self) -> &'static str {
        "close_browser"
    }

    fn description(&self) -> String {
        "Close a browser instance".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "handle": {
                    "type": "string",
                    "description": "Handle of the browser session to close"
                }
            },
            "required": ["handle"]
        })
    }

    async fn run(&self, args: Value, ctx: ToolContext) -> Result<Value, ToolError> {
        let input: CloseInput = parse(args)?;

        ctx.sessions.remove(&input.handle).await?;

        Ok(json!({
            "handle": input.handle,
            "message": format!("Successfully closed browser: {}", input.handle),
        }))
    }
}
