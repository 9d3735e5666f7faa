//! Per-call context threaded into every tool invocation.
//!
//! Distinct from the MCP wire protocol: this is the runtime environment a
//! tool (built-in or MCP-backed) sees on each call — current directory, the
//! active policy state, credential slots, and the handful of callbacks a
//! tool needs to reach back into the enclosing agent runtime (scheduling a
//! follow-up job, spawning a sub-agent, persisting refreshed OAuth tokens).
//!
//! **Interaction**: produced per call by a context-provider owned by the
//! enclosing runtime; read by [`crate::registry::ToolRegistry`] policy
//! filters and by [`crate::scheduler::ScheduledToolCallEngine`] before
//! dispatching a due job.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// Credential slots a tool may need. Absent fields mean "not configured";
/// tools degrade to a stub/placeholder response rather than failing outright
/// (see reference `web_search` / `sms_send` tools).
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub search_api_key: Option<String>,
    pub sms_api_key: Option<String>,
    pub oauth_tokens: std::collections::HashMap<String, String>,
}

/// Outcome of asking the enclosing runtime to schedule a follow-up tool call.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub job_id: String,
}

/// Errors a callback hook may report back to the calling tool.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct CallbackError(pub String);

/// The handful of hooks a tool can use to reach back into the enclosing
/// agent runtime. Each is optional: a context built for a headless/batch run
/// (e.g. the scheduler's own default context provider) may leave all of them
/// unset, in which case the corresponding built-in tool reports "not
/// available in this context" rather than panicking.
#[derive(Clone, Default)]
pub struct ScheduleCallbacks {
    pub schedule_tool: Option<Arc<dyn Fn(ScheduleToolRequest) -> Result<ScheduleOutcome, CallbackError> + Send + Sync>>,
    pub list_scheduled_jobs: Option<Arc<dyn Fn() -> Result<Vec<crate::scheduler::ScheduledJob>, CallbackError> + Send + Sync>>,
    pub cancel_scheduled_job: Option<Arc<dyn Fn(&str) -> Result<(), CallbackError> + Send + Sync>>,
    pub update_scheduled_job: Option<Arc<dyn Fn(&str, ScheduleToolRequest) -> Result<(), CallbackError> + Send + Sync>>,
    pub spawn_agent: Option<Arc<dyn Fn(&str) -> Result<String, CallbackError> + Send + Sync>>,
    pub save_oauth_tokens: Option<Arc<dyn Fn(&str, &str) -> Result<(), CallbackError> + Send + Sync>>,
}

impl std::fmt::Debug for ScheduleCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleCallbacks")
            .field("schedule_tool", &self.schedule_tool.is_some())
            .field("list_scheduled_jobs", &self.list_scheduled_jobs.is_some())
            .field("cancel_scheduled_job", &self.cancel_scheduled_job.is_some())
            .field("update_scheduled_job", &self.update_scheduled_job.is_some())
            .field("spawn_agent", &self.spawn_agent.is_some())
            .field("save_oauth_tokens", &self.save_oauth_tokens.is_some())
            .finish()
    }
}

/// Request shape for the `schedule_tool` / `update_scheduled_job` hooks.
#[derive(Debug, Clone)]
pub struct ScheduleToolRequest {
    pub tool_name: String,
    pub args: serde_json::Value,
    pub scheduled_for: chrono::DateTime<chrono::Utc>,
    pub recurrence: crate::scheduler::Recurrence,
}

/// Per-call context passed to every tool invocation.
///
/// `plan_mode` and `disabled_tools` are shared by reference (`Arc<RwLock<_>>`)
/// because the enclosing runtime may flip them mid-session (entering/leaving
/// plan mode, disabling a tool from a command) without rebuilding every
/// context already in flight.
#[derive(Clone, Debug, Default)]
pub struct ToolContext {
    /// Working directory built-in file/shell tools should operate relative to.
    pub cwd: std::path::PathBuf,
    /// Whether the agent is currently in plan mode (write tools filtered out).
    pub plan_mode: Arc<RwLock<bool>>,
    /// Tool names disabled for interactive use, regardless of mode.
    pub disabled_tools: Arc<RwLock<HashSet<String>>>,
    /// Opt-in allowlist of tool names a scheduled job may invoke.
    pub scheduled_allowed: Arc<RwLock<HashSet<String>>>,
    pub credentials: Credentials,
    pub callbacks: ScheduleCallbacks,
}

impl ToolContext {
    /// Builds a context rooted at `cwd` with empty policy sets, no
    /// credentials, and no callbacks wired up.
    pub fn new(cwd: impl Into<std::path::PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            ..Default::default()
        }
    }

    pub fn is_plan_mode(&self) -> bool {
        self.plan_mode.read().map(|g| *g).unwrap_or(false)
    }

    pub fn is_disabled(&self, tool_name: &str) -> bool {
        self.disabled_tools
            .read()
            .map(|g| g.contains(tool_name))
            .unwrap_or(false)
    }

    pub fn is_scheduled_allowed(&self, tool_name: &str) -> bool {
        self.scheduled_allowed
            .read()
            .map(|g| g.contains(tool_name))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_denies_everything() {
        let ctx = ToolContext::new("/tmp");
        assert!(!ctx.is_plan_mode());
        assert!(!ctx.is_disabled("bash"));
        assert!(!ctx.is_scheduled_allowed("bash"));
    }

    #[test]
    fn plan_mode_and_disabled_set_are_mutable_through_shared_handles() {
        let ctx = ToolContext::new("/tmp");
        *ctx.plan_mode.write().unwrap() = true;
        ctx.disabled_tools.write().unwrap().insert("bash".to_string());
        assert!(ctx.is_plan_mode());
        assert!(ctx.is_disabled("bash"));
    }
}
