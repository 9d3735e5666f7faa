//! Tool sourcing primitives shared between MCP transport glue and the
//! in-process tool registry: [`ToolSpec`] (a tool's advertised name,
//! description, and raw input schema), [`ToolCallContent`] (a call's text
//! result), and the [`ToolSource`]/[`ToolSourceError`] pair used by anything
//! that can list and call tools.

pub mod mcp;

use async_trait::async_trait;
use serde_json::Value;

pub use mcp::{McpHttpSession, McpSession, McpSessionError, McpToolSource};

/// A tool's advertised shape, as returned by MCP `tools/list` or by a
/// built-in tool's [`crate::tools::Tool::spec`].
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// The result of one tool call: its text content, and whether the tool
/// itself reported an error (as opposed to a transport/RPC failure, which
/// surfaces as a [`ToolSourceError`] instead).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolCallContent {
    pub text: String,
    pub is_error: bool,
}

/// Errors from listing or calling tools through a [`ToolSource`].
#[derive(Debug, thiserror::Error)]
pub enum ToolSourceError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("json-rpc: {0}")]
    JsonRpc(String),
    #[error("unknown tool: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<McpSessionError> for ToolSourceError {
    fn from(e: McpSessionError) -> Self {
        ToolSourceError::Transport(e.to_string())
    }
}

/// Something that can list and call tools: either a single MCP server
/// connection ([`McpToolSource`]) or an aggregate the manager builds over
/// several connections.
#[async_trait]
pub trait ToolSource: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallContent, ToolSourceError>;
}
