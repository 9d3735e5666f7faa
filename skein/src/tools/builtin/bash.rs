//! Shell tool: run a command in the system shell.
//!
//! `sh -c` on Unix, `cmd /C` on Windows. Blocked in plan mode by the registry
//! (see [`crate::registry`]) since it is the one built-in with unrestricted
//! side effects.

use async_trait::async_trait;
use serde_json::json;

use crate::context::ToolContext;
use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::Tool;

pub const TOOL_BASH: &str = "bash";

#[derive(Default)]
pub struct BashTool;

impl BashTool {
    pub fn new() -> Self {
        Self
    }
}

struct ShellOutput {
    stdout: String,
    stderr: String,
}

#[cfg(unix)]
async fn run_shell_command(
    command: &str,
    cwd: &std::path::Path,
    timeout_ms: u64,
) -> Result<ShellOutput, ToolSourceError> {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg(command).current_dir(cwd);
    run_with_timeout(cmd, timeout_ms).await
}

#[cfg(windows)]
async fn run_shell_command(
    command: &str,
    cwd: &std::path::Path,
    timeout_ms: u64,
) -> Result<ShellOutput, ToolSourceError> {
    let mut cmd = tokio::process::Command::new("cmd");
    cmd.args(["/C", command]).current_dir(cwd);
    run_with_timeout(cmd, timeout_ms).await
}

async fn run_with_timeout(
    mut cmd: tokio::process::Command,
    timeout_ms: u64,
) -> Result<ShellOutput, ToolSourceError> {
    let output = if timeout_ms == 0 {
        cmd.output()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("failed to run command: {e}")))?
    } else {
        tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), cmd.output())
            .await
            .map_err(|_| ToolSourceError::Transport("command timed out".to_string()))?
            .map_err(|e| ToolSourceError::Transport(format!("failed to run command: {e}")))?
    };
    Ok(ShellOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        TOOL_BASH
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_BASH.to_string(),
            description: Some(
                "Run a shell command in a subprocess with an optional timeout. Use for git, \
                 npm, cargo, and similar. Do not use for file read/write/search; use file_read, \
                 grep, or file_write instead."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to run."
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "Timeout in milliseconds (default 120000).",
                        "default": 120000
                    }
                },
                "required": ["command"]
            }),
        }
    }

    async fn call(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing command".to_string()))?;
        let timeout_ms = args.get("timeout").and_then(|v| v.as_u64()).unwrap_or(120_000);

        let output = run_shell_command(command, &ctx.cwd, timeout_ms).await?;
        let text = if output.stderr.is_empty() {
            output.stdout
        } else if output.stdout.is_empty() {
            format!("stderr:\n{}", output.stderr)
        } else {
            format!("stdout:\n{}\nstderr:\n{}", output.stdout, output.stderr)
        };

        Ok(ToolCallContent { text, is_error: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_command_and_captures_stdout() {
        let tool = BashTool::new();
        let ctx = ToolContext::new(std::env::temp_dir());
        let out = tool
            .call(json!({"command": "echo hello"}), &ctx)
            .await
            .unwrap();
        assert!(out.text.contains("hello"));
        assert!(!out.is_error);
    }

    #[tokio::test]
    async fn missing_command_is_invalid_input() {
        let tool = BashTool::new();
        let ctx = ToolContext::new(std::env::temp_dir());
        let err = tool.call(json!({}), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::InvalidInput(_)));
    }
}
