//! API request and response types

use crate::tools::ToolDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to execute a command by name
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub name: String,
    /// Command arguments; absent means an empty object.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Uniform command envelope: exactly one of `result` and `error` is set.
#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecuteResponse {
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }
}

/// Response for the health probe
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub browsers: usize,
    /// Seconds since process start
    pub uptime: f64,
}

/// Response with the command discovery document
#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDefinition>,
}

/// Response listing all live browser handles
#[derive(Debug, Serialize)]
pub struct BrowsersResponse {
    pub browsers: Vec<String>,
    pub count: usize,
}
