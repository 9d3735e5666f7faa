//! The in-process catalogue of built-in tools, plus the policy filters that
//! narrow it for plan mode, sub-agent runs, and disabled-tool sets.
//!
//! MCP-provided tools are deliberately **not** registered here — they are
//! dispatched by [`crate::manager::McpManager`] and recognized by the agent
//! via [`crate::naming::is_mcp_tool`]. The registry and the manager together
//! form the one flat tool-name space the agent sees.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::context::ToolContext;
use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::Tool;

/// Tool names removed from the catalogue while the agent is in plan mode:
/// entering plan mode is meant to guarantee no side effect can occur before
/// the agent produces a change proposal.
const PLAN_MODE_BLOCKED: [&str; 4] = ["file_write", "file_edit", "bash", "patch_apply"];

/// Tool names removed from the catalogue inside a sub-agent run, to prevent
/// a spawned agent from recursively spawning more agents or scheduling jobs.
const SUB_AGENT_BLOCKED: [&str; 2] = ["task", "schedule_task"];

/// A coarse-grained risk classification, used for audit display. Pure
/// function of the tool name; unknown names default to [`RiskTag::Write`]
/// since an unrecognized tool should be treated conservatively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTag {
    Shell,
    Write,
    Network,
    Mcp,
    ReadOnly,
}

/// Classifies `tool_name` for audit display.
pub fn risk_tag(tool_name: &str) -> RiskTag {
    if crate::naming::is_mcp_tool(tool_name) {
        return RiskTag::Mcp;
    }
    match tool_name {
        "bash" => RiskTag::Shell,
        "file_write" | "file_edit" | "patch_apply" => RiskTag::Write,
        "web_search" | "sms_send" => RiskTag::Network,
        "file_read" | "ls" | "grep" | "task" | "schedule_task" => RiskTag::ReadOnly,
        _ => RiskTag::Write,
    }
}

/// A named disabled-tool preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Blocks shell, web, and social-write tools.
    Safe,
    /// Disables nothing.
    Coder,
    /// Blocks write tools (file, shell).
    Research,
}

impl Profile {
    /// Tool names disabled by this profile.
    pub fn disabled_tools(self) -> HashSet<String> {
        let names: &[&str] = match self {
            Profile::Safe => &["bash", "web_search", "sms_send"],
            Profile::Coder => &[],
            Profile::Research => &["bash", "file_write", "file_edit", "patch_apply"],
        };
        names.iter().map(|s| s.to_string()).collect()
    }
}

/// The built-in tool catalogue.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Known display-name aliases, normalized to their canonical name.
    aliases: HashMap<String, String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a built-in tool under its own [`Tool::name`].
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Registers a display-name alias that [`Self::normalize_name`] resolves
    /// to `canonical`.
    pub fn register_alias(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.aliases.insert(alias.into(), canonical.into());
    }

    /// Trims and lowercases `name`, then resolves any known alias.
    pub fn normalize_name(&self, name: &str) -> String {
        let normalized = name.trim().to_ascii_lowercase();
        self.aliases
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized)
    }

    /// All registered tool specs, in a stable (insertion-independent,
    /// alphabetical) order.
    pub fn all_tools(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|t| t.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Looks up a tool by its exact canonical name.
    pub fn find_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Tool specs visible under `ctx`'s current mode: plan mode and
    /// disabled-tool filters applied, in that order. Does not apply the
    /// sub-agent filter — see [`Self::tools_for_sub_agent`] for that.
    pub fn visible_tools(&self, ctx: &ToolContext) -> Vec<ToolSpec> {
        self.all_tools()
            .into_iter()
            .filter(|spec| !ctx.is_plan_mode() || !PLAN_MODE_BLOCKED.contains(&spec.name.as_str()))
            .filter(|spec| !ctx.is_disabled(&spec.name))
            .collect()
    }

    /// Tool specs visible to a spawned sub-agent: the sub-agent filter and
    /// the disabled-tool filter both apply; plan mode is orthogonal and
    /// applied on top if `ctx` is in plan mode.
    pub fn tools_for_sub_agent(&self, ctx: &ToolContext) -> Vec<ToolSpec> {
        self.visible_tools(ctx)
            .into_iter()
            .filter(|spec| !SUB_AGENT_BLOCKED.contains(&spec.name.as_str()))
            .collect()
    }

    /// Calls `name` with `args` under `ctx` if it exists and is not
    /// filtered out of `ctx`'s current view.
    pub async fn call(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let canonical = self.normalize_name(name);
        if ctx.is_disabled(&canonical) {
            return Err(ToolSourceError::NotFound(format!(
                "{canonical} is disabled"
            )));
        }
        if ctx.is_plan_mode() && PLAN_MODE_BLOCKED.contains(&canonical.as_str()) {
            return Err(ToolSourceError::NotFound(format!(
                "{canonical} is unavailable in plan mode"
            )));
        }
        let tool = self
            .find_tool(&canonical)
            .ok_or_else(|| ToolSourceError::NotFound(canonical.clone()))?;
        tool.call(args, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubTool(&'static str);

    #[async_trait]
    impl Tool for StubTool {
        fn name(&self) -> &str {
            self.0
        }
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: self.0.to_string(),
                description: None,
                input_schema: serde_json::json!({}),
            }
        }
        async fn call(
            &self,
            _args: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<ToolCallContent, ToolSourceError> {
            Ok(ToolCallContent {
                text: format!("{}-ran", self.0),
                is_error: false,
            })
        }
    }

    fn registry_with(names: &[&'static str]) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for name in names {
            registry.register(Arc::new(StubTool(name)));
        }
        registry
    }

    #[test]
    fn plan_mode_filters_write_tools() {
        let registry = registry_with(&["bash", "file_read"]);
        let ctx = ToolContext::new("/tmp");
        *ctx.plan_mode.write().unwrap() = true;
        let visible: Vec<String> = registry.visible_tools(&ctx).into_iter().map(|t| t.name).collect();
        assert_eq!(visible, vec!["file_read".to_string()]);
    }

    #[test]
    fn disabled_set_filters_on_top_of_plan_mode() {
        let registry = registry_with(&["file_read", "grep"]);
        let ctx = ToolContext::new("/tmp");
        ctx.disabled_tools.write().unwrap().insert("grep".to_string());
        let visible: Vec<String> = registry.visible_tools(&ctx).into_iter().map(|t| t.name).collect();
        assert_eq!(visible, vec!["file_read".to_string()]);
    }

    #[test]
    fn sub_agent_filter_removes_task_tools() {
        let registry = registry_with(&["task", "schedule_task", "file_read"]);
        let ctx = ToolContext::new("/tmp");
        let visible: Vec<String> = registry
            .tools_for_sub_agent(&ctx)
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(visible, vec!["file_read".to_string()]);
    }

    #[test]
    fn profile_presets_translate_to_disabled_sets() {
        assert!(Profile::Safe.disabled_tools().contains("bash"));
        assert!(Profile::Research.disabled_tools().contains("file_write"));
        assert!(Profile::Coder.disabled_tools().is_empty());
    }

    #[test]
    fn normalize_name_trims_lowercases_and_resolves_alias() {
        let mut registry = ToolRegistry::new();
        registry.register_alias("Shell", "bash");
        assert_eq!(registry.normalize_name("  BASH  "), "bash");
        assert_eq!(registry.normalize_name("Shell"), "bash");
    }

    #[test]
    fn risk_tag_classifies_known_and_mcp_tools() {
        assert_eq!(risk_tag("bash"), RiskTag::Shell);
        assert_eq!(risk_tag("file_read"), RiskTag::ReadOnly);
        assert_eq!(risk_tag("mcp__fs__read_file"), RiskTag::Mcp);
    }

    #[tokio::test]
    async fn call_rejects_disabled_and_plan_mode_blocked_tools() {
        let registry = registry_with(&["bash", "file_read"]);
        let ctx = ToolContext::new("/tmp");
        ctx.disabled_tools.write().unwrap().insert("file_read".to_string());
        assert!(registry.call("file_read", serde_json::json!({}), &ctx).await.is_err());

        *ctx.plan_mode.write().unwrap() = true;
        assert!(registry.call("bash", serde_json::json!({}), &ctx).await.is_err());
    }

    #[tokio::test]
    async fn call_dispatches_to_registered_tool() {
        let registry = registry_with(&["file_read"]);
        let ctx = ToolContext::new("/tmp");
        let out = registry.call("file_read", serde_json::json!({}), &ctx).await.unwrap();
        assert_eq!(out.text, "file_read-ran");
    }
}
