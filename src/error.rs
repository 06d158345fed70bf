//! Tool-boundary error taxonomy.
//!
//! Every failure inside a tool invocation is captured as a `ToolError`
//! and rendered into the `{"error": "..."}` sentinel that the model sees.
//! Nothing here is fatal to the process.

use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// Network failure, timeout, or connection refused.
    #[error("request failed: {0}")]
    Transport(String),

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Upstream payload could not be decoded.
    #[error("malformed upstream payload: {0}")]
    Decode(String),

    /// Model-supplied arguments were unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

impl ToolError {
    /// Render as the JSON error sentinel (exactly one `error` key).
    pub fn to_sentinel(&self) -> String {
        json!({ "error": self.to_string() }).to_string()
    }

    /// Whether the upstream was reached at all.
    pub fn is_upstream(&self) -> bool {
        matches!(self, ToolError::Status { .. } | ToolError::Decode(_))
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        ToolError::Decode(e.to_string())
    }
}
