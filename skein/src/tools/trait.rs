use async_trait::async_trait;

use crate::context::ToolContext;
use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};

/// A single built-in tool registered with [`crate::registry::ToolRegistry`].
///
/// Each tool has a unique name, a specification (description and JSON
/// schema for the agent), and the call logic itself. Unlike MCP-provided
/// tools — which are dispatched by [`crate::manager::McpManager`] and never
/// enter the registry — built-in tools are small, in-process adapters the
/// registry owns directly.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use skein::context::ToolContext;
/// use skein::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
/// use skein::tools::Tool;
///
/// struct MyTool;
///
/// #[async_trait]
/// impl Tool for MyTool {
///     fn name(&self) -> &str {
///         "my_tool"
///     }
///
///     fn spec(&self) -> ToolSpec {
///         ToolSpec {
///             name: "my_tool".to_string(),
///             description: Some("A sample tool".to_string()),
///             input_schema: serde_json::json!({}),
///         }
///     }
///
///     async fn call(
///         &self,
///         _args: Value,
///         _ctx: &ToolContext,
///     ) -> Result<ToolCallContent, ToolSourceError> {
///         Ok(ToolCallContent {
///             text: "tool executed".to_string(),
///             is_error: false,
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name, used as the registry key and as the agent-visible
    /// identifier for this tool.
    fn name(&self) -> &str;

    /// Description and JSON schema shown to the agent when deciding whether
    /// and how to call this tool.
    fn spec(&self) -> ToolSpec;

    /// Executes the tool with the given arguments under `ctx`.
    ///
    /// Implementations read `ctx.cwd`, `ctx.credentials`, and
    /// `ctx.callbacks` as needed; they do not re-check `ctx.plan_mode` /
    /// `ctx.disabled_tools` / `ctx.scheduled_allowed` themselves — those
    /// policy checks happen in [`crate::registry::ToolRegistry`] and
    /// [`crate::scheduler`] before `call` is ever invoked.
    async fn call(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolCallContent, ToolSourceError>;
}
