//! Reference built-in tool implementations, registered into a
//! [`crate::registry::ToolRegistry`] by the embedding application.

pub mod bash;
pub mod file;
mod path;
pub mod sms;
pub mod task;
pub mod web_search;

pub use bash::{BashTool, TOOL_BASH};
pub use file::{
    ApplyPatchTool, EditFileTool, GrepTool, LsTool, ReadFileTool, WriteFileTool, TOOL_FILE_EDIT,
    TOOL_FILE_READ, TOOL_FILE_WRITE, TOOL_GREP, TOOL_LS, TOOL_PATCH_APPLY,
};
pub use sms::{SmsSendTool, TOOL_SMS_SEND};
pub use task::{ScheduleTaskTool, TaskTool, TOOL_SCHEDULE_TASK, TOOL_TASK};
pub use web_search::{WebSearchTool, TOOL_WEB_SEARCH};

use std::sync::Arc;

use crate::registry::ToolRegistry;

/// Builds a [`ToolRegistry`] with every reference built-in tool registered.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(BashTool::new()));
    registry.register(Arc::new(ReadFileTool));
    registry.register(Arc::new(LsTool));
    registry.register(Arc::new(GrepTool));
    registry.register(Arc::new(WriteFileTool));
    registry.register(Arc::new(EditFileTool));
    registry.register(Arc::new(ApplyPatchTool));
    registry.register(Arc::new(WebSearchTool));
    registry.register(Arc::new(SmsSendTool));
    registry.register(Arc::new(TaskTool));
    registry.register(Arc::new(ScheduleTaskTool));
    registry
}
