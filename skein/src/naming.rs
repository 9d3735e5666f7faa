//! Namespaced tool identifiers: `mcp__<sanitized-server>__<tool>`.
//!
//! Lets the tool registry and the MCP manager share one flat tool-name space
//! without collisions between built-in tools and MCP-provided ones.

/// Prefix marking a tool name as MCP-provided.
pub const MCP_PREFIX: &str = "mcp__";

/// Lowercases `name` and maps every rune outside `[a-z0-9-]` to `-`.
///
/// Underscores are deliberately excluded from the allowlist so the server
/// segment of a namespaced name never contains `__`; that keeps
/// [`parse_namespaced_name`] unambiguous even when the tool segment itself
/// contains `__`.
pub fn sanitize_server_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            let lower = c.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' {
                lower
            } else {
                '-'
            }
        })
        .collect()
}

/// Builds the namespaced tool name for `tool` exposed by MCP server `server`.
pub fn namespaced_name(server: &str, tool: &str) -> String {
    format!("{}{}__{}", MCP_PREFIX, sanitize_server_name(server), tool)
}

/// Returns `true` if `name` carries the MCP namespace prefix.
pub fn is_mcp_tool(name: &str) -> bool {
    name.starts_with(MCP_PREFIX)
}

/// Splits a namespaced tool name back into `(server, tool)`.
///
/// Returns `(String::new(), String::new(), false)` when `name` does not carry
/// a well-formed MCP namespace: missing prefix, no `__` boundary after the
/// prefix, or an empty server or tool segment. The split is at the *first*
/// `__` found after the prefix, so a tool name that itself contains `__`
/// survives intact in the tool segment.
pub fn parse_namespaced_name(name: &str) -> (String, String, bool) {
    let Some(rest) = name.strip_prefix(MCP_PREFIX) else {
        return (String::new(), String::new(), false);
    };
    match rest.find("__") {
        Some(idx) => {
            let server = &rest[..idx];
            let tool = &rest[idx + 2..];
            if server.is_empty() || tool.is_empty() {
                (String::new(), String::new(), false)
            } else {
                (server.to_string(), tool.to_string(), true)
            }
        }
        None => (String::new(), String::new(), false),
    }
}
