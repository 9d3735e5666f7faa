//! The `Tool` trait and the reference built-in tool implementations.
//!
//! The registry ([`crate::registry::ToolRegistry`]) holds `Arc<dyn Tool>`
//! built from this module; MCP-provided tools are a separate concern
//! entirely, dispatched by [`crate::manager::McpManager`].

pub mod builtin;
mod r#trait;

pub use r#trait::Tool;
