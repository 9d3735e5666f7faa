//! # Skein
//!
//! MCP (Model Context Protocol) integration core for a terminal-based AI coding
//! assistant: server discovery and connection management, tool namespacing,
//! a policy-filtered built-in tool registry, and a scheduled tool-call engine.
//!
//! ## Main modules
//!
//! - [`naming`]: namespaced tool identifiers (`mcp__<server>__<tool>`) shared by
//!   the manager and the registry.
//! - [`schema`]: converts a JSON-Schema-shaped `inputSchema` into the internal
//!   [`schema::PropertySpec`] tree used for tool descriptors.
//! - [`mcp_config`]: loads and merges user-scope/project-scope `mcp.json`,
//!   expanding `${VAR}` / `${VAR:-default}` placeholders.
//! - [`manager`]: [`manager::McpManager`] — connects to configured MCP servers
//!   over stdio or HTTP, tracks per-server connection state, dispatches
//!   `call_tool`.
//! - [`tool_source`]: [`tool_source::ToolSource`], [`tool_source::ToolSpec`];
//!   MCP transport glue ([`tool_source::McpToolSource`]).
//! - [`context`]: [`context::ToolContext`] — per-call context threaded into
//!   every tool invocation (cwd, plan mode, disabled tools, credentials,
//!   scheduler callbacks).
//! - [`registry`]: [`registry::ToolRegistry`] — built-in tool catalogue plus
//!   plan-mode / sub-agent / disabled-tool policy filters and profile presets.
//! - [`scheduler`]: [`scheduler::ScheduledToolCallEngine`] — ticker-driven
//!   executor for persisted, recurring tool invocations under an allowlist.
//! - [`errors`]: remote error taxonomy adapter ([`errors::RemoteError`]) with
//!   retry-after parsing and retryability classification.
//! - [`tools`]: the [`tools::Tool`] trait and the reference built-in tool set.
//!
//! Key types are re-exported at crate root.

pub mod context;
pub mod errors;
pub mod manager;
pub mod mcp_config;
pub mod naming;
pub mod registry;
pub mod schema;
pub mod scheduler;
pub mod tool_source;
pub mod tools;

pub use context::ToolContext;
pub use errors::{is_retryable, retry_after, RemoteError};
pub use manager::{ConnectionStatus, McpManager, McpManagerError};
pub use mcp_config::{ConfigError, McpConfig, ServerConfig, ServerTransport};
pub use naming::{is_mcp_tool, namespaced_name, parse_namespaced_name, sanitize_server_name};
pub use registry::{risk_tag, Profile, RiskTag, ToolRegistry};
pub use schema::{to_property_spec, to_tool_descriptor, PropertySpec, ToolDescriptor};
pub use scheduler::{
    InMemoryScheduledJobStore, Recurrence, ScheduledJob, ScheduledJobStore, ScheduledToolCallEngine,
    AGENT_TASK_SENTINEL,
};
pub use tool_source::{
    McpHttpSession, McpSession, McpToolSource, ToolCallContent, ToolSource, ToolSourceError,
    ToolSpec,
};
pub use tools::Tool;

/// Initializes tracing from `RUST_LOG` so that unit tests in `src/**` can print
/// logs with `--nocapture`.
#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    #[ctor]
    fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    }
}
