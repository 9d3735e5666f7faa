//! Sub-agent and scheduling tools: `task` spawns a sub-agent run via
//! [`crate::context::ScheduleCallbacks::spawn_agent`]; `schedule_task`
//! registers a follow-up tool call via
//! [`crate::context::ScheduleCallbacks::schedule_tool`]. Both are filtered
//! out of a sub-agent's own tool view (see [`crate::registry`]) so a spawned
//! agent cannot recursively spawn or schedule.

use async_trait::async_trait;
use serde_json::json;

use crate::context::{ScheduleToolRequest, ToolContext};
use crate::scheduler::Recurrence;
use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::Tool;

pub const TOOL_TASK: &str = "task";
pub const TOOL_SCHEDULE_TASK: &str = "schedule_task";

fn not_available(what: &str) -> ToolCallContent {
    ToolCallContent {
        text: format!("{what} is not available in this context"),
        is_error: true,
    }
}

#[derive(Default)]
pub struct TaskTool;

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> &str {
        TOOL_TASK
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_TASK.to_string(),
            description: Some("Spawn a sub-agent to carry out a self-contained instruction.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "instructions": {"type": "string", "description": "Task for the sub-agent to carry out."}
                },
                "required": ["instructions"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
        let instructions = args
            .get("instructions")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing instructions".to_string()))?;

        let Some(spawn_agent) = ctx.callbacks.spawn_agent.as_ref() else {
            return Ok(not_available(TOOL_TASK));
        };
        let agent_id = spawn_agent(instructions).map_err(|e| ToolSourceError::Transport(e.0))?;
        Ok(ToolCallContent { text: format!("spawned sub-agent {agent_id}"), is_error: false })
    }
}

#[derive(Default)]
pub struct ScheduleTaskTool;

#[async_trait]
impl Tool for ScheduleTaskTool {
    fn name(&self) -> &str {
        TOOL_SCHEDULE_TASK
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_SCHEDULE_TASK.to_string(),
            description: Some(
                "Schedule a tool call to run later, once or on a recurring basis.".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "tool_name": {"type": "string"},
                    "args": {"type": "object"},
                    "scheduled_for": {"type": "string", "description": "RFC3339 timestamp."},
                    "recurrence": {"type": "string", "enum": ["once", "daily", "hourly"], "default": "once"}
                },
                "required": ["tool_name", "scheduled_for"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
        let tool_name = args
            .get("tool_name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing tool_name".to_string()))?
            .to_string();
        let call_args = args.get("args").cloned().unwrap_or(json!({}));
        let scheduled_for_str = args
            .get("scheduled_for")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing scheduled_for".to_string()))?;
        let scheduled_for = chrono::DateTime::parse_from_rfc3339(scheduled_for_str)
            .map_err(|e| ToolSourceError::InvalidInput(format!("invalid scheduled_for: {e}")))?
            .with_timezone(&chrono::Utc);
        let recurrence = match args.get("recurrence").and_then(|v| v.as_str()).unwrap_or("once") {
            "once" => Recurrence::Once,
            "daily" => Recurrence::Daily,
            "hourly" => Recurrence::Hourly,
            other => return Err(ToolSourceError::InvalidInput(format!("unknown recurrence: {other}"))),
        };

        let Some(schedule_tool) = ctx.callbacks.schedule_tool.as_ref() else {
            return Ok(not_available(TOOL_SCHEDULE_TASK));
        };
        let outcome = schedule_tool(ScheduleToolRequest { tool_name, args: call_args, scheduled_for, recurrence })
            .map_err(|e| ToolSourceError::Transport(e.0))?;
        Ok(ToolCallContent { text: format!("scheduled job {}", outcome.job_id), is_error: false })
    }
}
