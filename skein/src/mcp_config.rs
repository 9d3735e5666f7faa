//! Loads and merges `mcp.json` (user scope) and `.mcp.json` (project scope)
//! into a single [`McpConfig`], expanding `${VAR}` / `${VAR:-default}`
//! placeholders along the way.
//!
//! Mirrors the host framework's XDG-plus-dotenv layering in `config::load_and_apply`,
//! but this file is deliberately independent of that crate: `mcp.json` has its
//! own schema and its own override precedence (project replaces user by whole
//! entry, not by field).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Errors from loading or validating an MCP server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine user config directory")]
    NoUserConfigDir,
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("server {name:?}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Transport kind for one MCP server entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerTransport {
    Stdio,
    Http,
}

impl Default for ServerTransport {
    fn default() -> Self {
        ServerTransport::Stdio
    }
}

impl ServerTransport {
    /// Parses a config file's raw `"type"` string. Empty or absent is
    /// treated as `stdio`; anything else not recognized is rejected by the
    /// caller as a named validation failure, not a generic parse error.
    fn parse(kind: Option<&str>) -> Option<Self> {
        match kind.unwrap_or("") {
            "" | "stdio" => Some(ServerTransport::Stdio),
            "http" => Some(ServerTransport::Http),
            _ => None,
        }
    }
}

/// One server entry as read from `mcp.json`, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(rename = "type", default)]
    pub transport: ServerTransport,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ServerConfig {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        match self.transport {
            ServerTransport::Stdio => {
                if self.command.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::Invalid {
                        name: name.to_string(),
                        reason: "stdio server requires a non-empty command".to_string(),
                    });
                }
            }
            ServerTransport::Http => {
                if self.url.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::Invalid {
                        name: name.to_string(),
                        reason: "http server requires a non-empty url".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn expand_env(&mut self, lookup: &dyn EnvLookup) {
        if let Some(command) = &self.command {
            self.command = Some(expand_placeholders(command, lookup));
        }
        if let Some(url) = &self.url {
            self.url = Some(expand_placeholders(url, lookup));
        }
        for arg in self.args.iter_mut() {
            *arg = expand_placeholders(arg, lookup);
        }
        for value in self.env.values_mut() {
            *value = expand_placeholders(value, lookup);
        }
    }
}

/// One server entry exactly as JSON parses it, before the `"type"` string is
/// validated into a [`ServerTransport`]. Kept separate from [`ServerConfig`]
/// so an unrecognized transport kind surfaces as [`ConfigError::Invalid`]
/// (a named validation failure) rather than a generic [`ConfigError::Parse`]
/// from serde's enum deserializer rejecting the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawServerConfig {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    url: Option<String>,
}

/// Top-level `mcp.json` shape: `{ "mcpServers": { name: entry, ... } }`.
#[derive(Debug, Clone, Default, Deserialize)]
struct McpConfigFile {
    #[serde(rename = "mcpServers", default)]
    mcp_servers: HashMap<String, RawServerConfig>,
}

/// Merged, env-expanded, validated server configuration.
pub type McpConfig = HashMap<String, ServerConfig>;

/// Injectable accessor for environment variables, so tests can substitute a
/// fixed map instead of mutating process-wide env state.
pub trait EnvLookup {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads from the real process environment.
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid regex")
});

/// Expands `${NAME}` / `${NAME:-default}` placeholders in `input` using `lookup`.
///
/// An unset variable falls back to the trimmed default token, or the empty
/// string when no default is given.
pub fn expand_placeholders(input: &str, lookup: &dyn EnvLookup) -> String {
    PLACEHOLDER
        .replace_all(input, |caps: &regex::Captures| {
            let name = &caps[1];
            if let Some(value) = lookup.get(name) {
                return value;
            }
            caps.get(2)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        })
        .into_owned()
}

/// Resolves the user-scope config directory (`<user-config-dir>/mcp.json`).
pub trait UserConfigDir {
    fn resolve(&self) -> Option<PathBuf>;
}

/// Resolves against the real OS user config directory.
pub struct OsUserConfigDir;

impl UserConfigDir for OsUserConfigDir {
    fn resolve(&self) -> Option<PathBuf> {
        dirs::config_dir()
    }
}

fn read_server_map(path: &Path) -> Result<HashMap<String, ServerConfig>, ConfigError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: McpConfigFile = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    file.mcp_servers
        .into_iter()
        .map(|(name, raw)| {
            let transport = ServerTransport::parse(raw.kind.as_deref()).ok_or_else(|| {
                ConfigError::Invalid {
                    name: name.clone(),
                    reason: format!("unknown transport type {:?}", raw.kind.unwrap_or_default()),
                }
            })?;
            Ok((
                name,
                ServerConfig {
                    transport,
                    command: raw.command,
                    args: raw.args,
                    env: raw.env,
                    url: raw.url,
                },
            ))
        })
        .collect()
}

/// Loads and merges `<user-config-dir>/mcp.json` with `<project_root>/.mcp.json`
/// (when `project_root` is given), expands env placeholders, and validates
/// every entry.
///
/// Project entries override user entries by full replacement: a server
/// redefined in the project file is not field-merged with the user's version.
pub fn load(
    project_root: Option<&Path>,
    user_config_dir: &dyn UserConfigDir,
    env: &dyn EnvLookup,
) -> Result<McpConfig, ConfigError> {
    let mut merged = HashMap::new();

    if let Some(dir) = user_config_dir.resolve() {
        let user_entries = read_server_map(&dir.join("mcp.json"))?;
        merged.extend(user_entries);
    }

    if let Some(root) = project_root {
        let project_entries = read_server_map(&root.join(".mcp.json"))?;
        merged.extend(project_entries);
    }

    for (name, entry) in merged.iter_mut() {
        entry.expand_env(env);
        entry.validate(name)?;
    }

    Ok(merged)
}

/// Loads configuration using the real OS user-config directory and process
/// environment. Convenience wrapper over [`load`].
pub fn load_default(project_root: Option<&Path>) -> Result<McpConfig, ConfigError> {
    load(project_root, &OsUserConfigDir, &ProcessEnv)
}
