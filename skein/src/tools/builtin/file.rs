//! File tools: read, list, search, write, edit, and patch files under a
//! tool context's working directory.
//!
//! `file_read`/`ls`/`grep` are read-only; `file_write`/`file_edit`/
//! `patch_apply` are filtered out of the registry in plan mode (see
//! [`crate::registry`]). All six resolve paths through
//! [`super::path::resolve_path_under`] to stay inside `ctx.cwd`.

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::context::ToolContext;
use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::Tool;

use super::path::resolve_path_under;

pub const TOOL_FILE_READ: &str = "file_read";
pub const TOOL_LS: &str = "ls";
pub const TOOL_GREP: &str = "grep";
pub const TOOL_FILE_WRITE: &str = "file_write";
pub const TOOL_FILE_EDIT: &str = "file_edit";
pub const TOOL_PATCH_APPLY: &str = "patch_apply";

fn ok(text: String) -> ToolCallContent {
    ToolCallContent { text, is_error: false }
}

fn required_str<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolSourceError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolSourceError::InvalidInput(format!("missing {key}")))
}

#[derive(Default)]
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        TOOL_FILE_READ
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_FILE_READ.to_string(),
            description: Some(
                "Read the entire text content of a file. Path is relative to the working \
                 directory."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "File path relative to the working directory."}
                },
                "required": ["path"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
        let path_param = required_str(&args, "path")?;
        let path = resolve_path_under(&ctx.cwd, path_param)?;
        if !path.exists() {
            return Err(ToolSourceError::InvalidInput(format!("file not found: {}", path.display())));
        }
        if path.is_dir() {
            return Err(ToolSourceError::InvalidInput(format!(
                "is a directory, not a file: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ToolSourceError::Transport(format!("failed to read file: {e}")))?;
        Ok(ok(content))
    }
}

#[derive(Default)]
pub struct LsTool;

#[async_trait]
impl Tool for LsTool {
    fn name(&self) -> &str {
        TOOL_LS
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_LS.to_string(),
            description: Some(
                "List entries (files and subdirectories) in a directory. Use '.' for the \
                 working directory root."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Directory path relative to the working directory."}
                },
                "required": []
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
        let path_param = args.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let dir = resolve_path_under(&ctx.cwd, path_param)?;
        if !dir.is_dir() {
            return Err(ToolSourceError::InvalidInput(format!("not a directory: {}", dir.display())));
        }
        let mut entries: Vec<String> = std::fs::read_dir(&dir)
            .map_err(|e| ToolSourceError::Transport(format!("failed to read dir: {e}")))?
            .filter_map(|e| e.ok())
            .map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                let kind = if e.path().is_dir() { "dir" } else { "file" };
                format!("{name} ({kind})")
            })
            .collect();
        entries.sort();
        Ok(ok(entries.join("\n")))
    }
}

const MAX_GREP_MATCHES: usize = 100;

fn walk_files(root: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(root) else { return };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            walk_files(&path, out);
        } else if path.is_file() {
            out.push(path);
        }
    }
}

#[derive(Default)]
pub struct GrepTool;

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        TOOL_GREP
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_GREP.to_string(),
            description: Some(
                "Search file contents under the working directory using a regular expression. \
                 Returns matching file paths and line numbers."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "Regex to search for."},
                    "path": {"type": "string", "description": "Directory to search in. Defaults to '.'."}
                },
                "required": ["pattern"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
        let pattern = required_str(&args, "pattern")?.trim();
        if pattern.is_empty() {
            return Err(ToolSourceError::InvalidInput("pattern must be non-empty".to_string()));
        }
        let re = Regex::new(pattern).map_err(|e| ToolSourceError::InvalidInput(format!("invalid regex: {e}")))?;

        let path_param = args.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let search_root = resolve_path_under(&ctx.cwd, path_param)?;
        if !search_root.is_dir() {
            return Err(ToolSourceError::InvalidInput(format!(
                "path is not a directory: {}",
                search_root.display()
            )));
        }

        let mut files = Vec::new();
        walk_files(&search_root, &mut files);

        let mut output = Vec::new();
        let mut matched = 0usize;
        'files: for path in files {
            let Ok(bytes) = std::fs::read(&path) else { continue };
            if bytes.contains(&0u8) {
                continue;
            }
            let content = String::from_utf8_lossy(&bytes);
            for (line_idx, line) in content.lines().enumerate() {
                if re.is_match(line) {
                    output.push(format!("{}:{}: {}", path.display(), line_idx + 1, line));
                    matched += 1;
                    if matched >= MAX_GREP_MATCHES {
                        output.push("(results truncated)".to_string());
                        break 'files;
                    }
                }
            }
        }

        if output.is_empty() {
            return Ok(ok("No matches found".to_string()));
        }
        Ok(ok(output.join("\n")))
    }
}

#[derive(Default)]
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        TOOL_FILE_WRITE
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_FILE_WRITE.to_string(),
            description: Some(
                "Write text content to a file, creating it (and parent directories) or \
                 overwriting it if it already exists."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "File path relative to the working directory."},
                    "content": {"type": "string", "description": "Text content to write."}
                },
                "required": ["path", "content"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
        let path_param = required_str(&args, "path")?;
        let content = required_str(&args, "content")?;
        let path = resolve_path_under(&ctx.cwd, path_param)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolSourceError::Transport(format!("failed to create parent dirs: {e}")))?;
        }
        std::fs::write(&path, content)
            .map_err(|e| ToolSourceError::Transport(format!("failed to write file: {e}")))?;
        Ok(ok(format!("wrote {} bytes to {}", content.len(), path.display())))
    }
}

#[derive(Default)]
pub struct EditFileTool;

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        TOOL_FILE_EDIT
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_FILE_EDIT.to_string(),
            description: Some(
                "Replace an exact occurrence of old_string with new_string in a file. Fails if \
                 old_string is not found, or is found more than once unless replace_all is set."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "old_string": {"type": "string"},
                    "new_string": {"type": "string"},
                    "replace_all": {"type": "boolean", "default": false}
                },
                "required": ["path", "old_string", "new_string"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
        let path_param = required_str(&args, "path")?;
        let old_string = required_str(&args, "old_string")?;
        let new_string = required_str(&args, "new_string")?;
        let replace_all = args.get("replace_all").and_then(|v| v.as_bool()).unwrap_or(false);

        let path = resolve_path_under(&ctx.cwd, path_param)?;
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ToolSourceError::Transport(format!("failed to read file: {e}")))?;

        let occurrences = content.matches(old_string).count();
        if occurrences == 0 {
            return Err(ToolSourceError::InvalidInput("old_string not found in file".to_string()));
        }
        if occurrences > 1 && !replace_all {
            return Err(ToolSourceError::InvalidInput(format!(
                "old_string matches {occurrences} times; pass replace_all or narrow the match"
            )));
        }

        let updated = if replace_all {
            content.replace(old_string, new_string)
        } else {
            content.replacen(old_string, new_string, 1)
        };
        std::fs::write(&path, updated)
            .map_err(|e| ToolSourceError::Transport(format!("failed to write file: {e}")))?;
        Ok(ok(format!("replaced {occurrences} occurrence(s) in {}", path.display())))
    }
}

#[derive(Default)]
pub struct ApplyPatchTool;

/// A single `*** Add File:` / `*** Update File:` / `*** Delete File:` hunk.
enum Hunk {
    Add { path: String, contents: String },
    Delete { path: String },
    Update { path: String, old: String, new: String },
}

fn parse_patch(patch_text: &str) -> Result<Vec<Hunk>, String> {
    let body = patch_text
        .trim()
        .strip_prefix("*** Begin Patch")
        .ok_or("missing *** Begin Patch")?
        .trim_end()
        .strip_suffix("*** End Patch")
        .ok_or("missing *** End Patch")?;

    let lines: Vec<&str> = body.lines().collect();
    let mut hunks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        if let Some(path) = line.strip_prefix("*** Add File:") {
            let path = path.trim().to_string();
            i += 1;
            let mut contents = String::new();
            while i < lines.len() && !lines[i].trim_start().starts_with("***") {
                if let Some(body_line) = lines[i].strip_prefix('+') {
                    contents.push_str(body_line);
                    contents.push('\n');
                }
                i += 1;
            }
            hunks.push(Hunk::Add { path, contents });
        } else if let Some(path) = line.strip_prefix("*** Delete File:") {
            hunks.push(Hunk::Delete { path: path.trim().to_string() });
            i += 1;
        } else if let Some(path) = line.strip_prefix("*** Update File:") {
            let path = path.trim().to_string();
            i += 1;
            let mut old = String::new();
            let mut new = String::new();
            while i < lines.len() && !lines[i].trim_start().starts_with("***") {
                if let Some(removed) = lines[i].strip_prefix('-') {
                    old.push_str(removed);
                    old.push('\n');
                } else if let Some(added) = lines[i].strip_prefix('+') {
                    new.push_str(added);
                    new.push('\n');
                }
                i += 1;
            }
            hunks.push(Hunk::Update { path, old, new });
        } else {
            i += 1;
        }
    }
    Ok(hunks)
}

#[async_trait]
impl Tool for ApplyPatchTool {
    fn name(&self) -> &str {
        TOOL_PATCH_APPLY
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_PATCH_APPLY.to_string(),
            description: Some(
                "Apply a multi-file patch in the `*** Begin Patch` / `*** Add File:` / \
                 `*** Update File:` / `*** Delete File:` / `*** End Patch` format."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "patch": {"type": "string", "description": "The patch text."}
                },
                "required": ["patch"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
        let patch_text = required_str(&args, "patch")?;
        let hunks = parse_patch(patch_text).map_err(ToolSourceError::InvalidInput)?;
        if hunks.is_empty() {
            return Err(ToolSourceError::InvalidInput("patch contained no hunks".to_string()));
        }

        let mut summary = Vec::with_capacity(hunks.len());
        for hunk in hunks {
            match hunk {
                Hunk::Add { path, contents } => {
                    let resolved = resolve_path_under(&ctx.cwd, &path)?;
                    if let Some(parent) = resolved.parent() {
                        std::fs::create_dir_all(parent)
                            .map_err(|e| ToolSourceError::Transport(format!("failed to create parent dirs: {e}")))?;
                    }
                    std::fs::write(&resolved, contents)
                        .map_err(|e| ToolSourceError::Transport(format!("failed to write file: {e}")))?;
                    summary.push(format!("added {path}"));
                }
                Hunk::Delete { path } => {
                    let resolved = resolve_path_under(&ctx.cwd, &path)?;
                    std::fs::remove_file(&resolved)
                        .map_err(|e| ToolSourceError::Transport(format!("failed to delete file: {e}")))?;
                    summary.push(format!("deleted {path}"));
                }
                Hunk::Update { path, old, new } => {
                    let resolved = resolve_path_under(&ctx.cwd, &path)?;
                    let content = std::fs::read_to_string(&resolved)
                        .map_err(|e| ToolSourceError::Transport(format!("failed to read file: {e}")))?;
                    let old_trimmed = old.trim_end_matches('\n');
                    if !content.contains(old_trimmed) {
                        return Err(ToolSourceError::InvalidInput(format!(
                            "update chunk not found in {path}"
                        )));
                    }
                    let updated = content.replacen(old_trimmed, new.trim_end_matches('\n'), 1);
                    std::fs::write(&resolved, updated)
                        .map_err(|e| ToolSourceError::Transport(format!("failed to write file: {e}")))?;
                    summary.push(format!("updated {path}"));
                }
            }
        }
        Ok(ok(summary.join("\n")))
    }
}
