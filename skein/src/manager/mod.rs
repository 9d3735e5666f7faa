//! Connects to configured MCP servers, tracks per-server connection state,
//! aggregates their tool catalogues under the namespaced name scheme, and
//! dispatches `call_tool` requests.
//!
//! One server's connection failure never blocks another's: `start_all`
//! walks the config sequentially, but each server gets its own 30s connect
//! deadline and a failure is recorded on that server's [`ConnectionRecord`]
//! rather than propagated. `call_tool` releases the servers lock before
//! awaiting the RPC, so concurrent calls against different servers are not
//! serialized through the manager — only the per-server transport serializes
//! its own calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::mcp_config::{McpConfig, ServerConfig, ServerTransport};
use crate::naming::namespaced_name;
use crate::tool_source::{McpToolSource, ToolCallContent, ToolSource, ToolSourceError, ToolSpec};

const CONNECT_DEADLINE: Duration = Duration::from_secs(30);
const CALL_DEADLINE: Duration = Duration::from_secs(30);

/// Errors from manager-level operations that are not per-server connection
/// failures (those are recorded on the [`ConnectionRecord`] instead).
#[derive(Debug, thiserror::Error)]
pub enum McpManagerError {
    #[error("server {0:?} not found")]
    NotFound(String),
}

/// Lifecycle state of one configured MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Manager-owned state for one configured server.
struct ConnectionRecord {
    config: ServerConfig,
    source: Option<Arc<McpToolSource>>,
    tools: Vec<ToolSpec>,
    status: ConnectionStatus,
    last_error: Option<String>,
}

impl ConnectionRecord {
    fn connecting(config: ServerConfig) -> Self {
        Self {
            config,
            source: None,
            tools: Vec::new(),
            status: ConnectionStatus::Connecting,
            last_error: None,
        }
    }

    fn disconnected(config: ServerConfig) -> Self {
        Self {
            config,
            source: None,
            tools: Vec::new(),
            status: ConnectionStatus::Disconnected,
            last_error: None,
        }
    }
}

/// Connects to and dispatches calls against a set of configured MCP servers.
pub struct McpManager {
    servers: RwLock<HashMap<String, ConnectionRecord>>,
}

impl Default for McpManager {
    fn default() -> Self {
        Self::new()
    }
}

impl McpManager {
    pub fn new() -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
        }
    }

    /// Connects to every server in `cfg`. Never fails: a per-server error is
    /// recorded on that server's status and logged, and the next server is
    /// tried regardless.
    pub async fn start_all(&self, cfg: &McpConfig) {
        for (name, config) in cfg {
            self.connect_one(name.clone(), config.clone()).await;
        }
    }

    async fn connect_one(&self, name: String, config: ServerConfig) {
        {
            let mut servers = self.servers.write().await;
            servers.insert(name.clone(), ConnectionRecord::connecting(config.clone()));
        }

        let outcome = tokio::time::timeout(CONNECT_DEADLINE, Self::connect(config.clone())).await;

        let mut servers = self.servers.write().await;
        match outcome {
            Ok(Ok((source, tools))) => {
                tracing::info!(server = %name, tool_count = tools.len(), "mcp server connected");
                servers.insert(
                    name,
                    ConnectionRecord {
                        config,
                        source: Some(Arc::new(source)),
                        tools,
                        status: ConnectionStatus::Connected,
                        last_error: None,
                    },
                );
            }
            Ok(Err(e)) => {
                tracing::warn!(server = %name, error = %e, "mcp server connection failed");
                servers.insert(
                    name,
                    ConnectionRecord {
                        config,
                        source: None,
                        tools: Vec::new(),
                        status: ConnectionStatus::Error,
                        last_error: Some(e.to_string()),
                    },
                );
            }
            Err(_) => {
                tracing::warn!(server = %name, "mcp server connect timed out");
                servers.insert(
                    name,
                    ConnectionRecord {
                        config,
                        source: None,
                        tools: Vec::new(),
                        status: ConnectionStatus::Error,
                        last_error: Some("connect timed out after 30s".to_string()),
                    },
                );
            }
        }
    }

    async fn connect(config: ServerConfig) -> Result<(McpToolSource, Vec<ToolSpec>), ToolSourceError> {
        let source = match config.transport {
            ServerTransport::Stdio => {
                let command = config.command.clone().unwrap_or_default();
                let args = config.args.clone();
                let env = config.env.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    if env.is_empty() {
                        McpToolSource::new(command, args, false)
                    } else {
                        McpToolSource::new_with_env(command, args, env, false)
                    }
                })
                .await
                .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
                joined.map_err(ToolSourceError::from)?
            }
            ServerTransport::Http => {
                let url = config.url.clone().unwrap_or_default();
                McpToolSource::new_http(url, std::iter::empty::<(String, String)>()).await?
            }
        };
        let tools = source.list_tools().await?;
        Ok((source, tools))
    }

    /// Closes every connection and marks every server disconnected. Dropping
    /// the manager's `Arc<McpToolSource>` releases the transport (for stdio,
    /// killing the child process) once no in-flight call still holds a
    /// clone of it.
    pub async fn stop_all(&self) {
        let mut servers = self.servers.write().await;
        for record in servers.values_mut() {
            let config = record.config.clone();
            *record = ConnectionRecord::disconnected(config);
        }
    }

    /// Namespaced tool descriptors for every currently connected server,
    /// with each server's raw `inputSchema` converted through
    /// [`crate::schema`] rather than forwarded as-is.
    pub async fn tool_specs(&self) -> Vec<ToolSpec> {
        let servers = self.servers.read().await;
        let mut specs = Vec::new();
        for (name, record) in servers.iter() {
            if record.status != ConnectionStatus::Connected {
                continue;
            }
            for tool in &record.tools {
                let descriptor = crate::schema::to_tool_descriptor(&tool.input_schema);
                specs.push(ToolSpec {
                    name: namespaced_name(name, &tool.name),
                    description: tool.description.clone(),
                    input_schema: crate::schema::descriptor_to_schema(&descriptor),
                });
            }
        }
        specs
    }

    /// Sorted namespaced tool names for every currently connected server.
    pub async fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tool_specs().await.into_iter().map(|t| t.name).collect();
        names.sort();
        names
    }

    /// Status of every configured server, keyed by server name. An `error`
    /// status has the last error message appended after a colon.
    pub async fn server_statuses(&self) -> HashMap<String, String> {
        let servers = self.servers.read().await;
        servers
            .iter()
            .map(|(name, record)| {
                let status = match (&record.status, &record.last_error) {
                    (ConnectionStatus::Error, Some(msg)) => format!("error: {msg}"),
                    (status, _) => status.to_string(),
                };
                (name.clone(), status)
            })
            .collect()
    }

    /// Calls `tool` on `server` with `args`. Never returns `Err`: unknown
    /// server, unavailable connection, timeout, and remote errors are all
    /// encoded as `(message, true)`; a successful call is `(text, false)`.
    pub async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        args: serde_json::Value,
    ) -> (String, bool) {
        let source = {
            let servers = self.servers.read().await;
            let Some(record) = servers.get(server) else {
                return (format!("MCP server {server:?} not found"), true);
            };
            match (&record.status, &record.source) {
                (ConnectionStatus::Connected, Some(source)) => Arc::clone(source),
                _ => {
                    let suffix = record
                        .last_error
                        .as_ref()
                        .map(|e| format!(": {e}"))
                        .unwrap_or_default();
                    return (format!("MCP server {server:?} is unavailable{suffix}"), true);
                }
            }
        };

        match tokio::time::timeout(CALL_DEADLINE, source.call_tool(tool, args)).await {
            Ok(Ok(ToolCallContent { text, is_error })) => (text, is_error),
            Ok(Err(ToolSourceError::Transport(msg))) if msg.contains("no text or structuredContent") => {
                ("MCP server returned empty response".to_string(), true)
            }
            Ok(Err(e)) => (format!("MCP tool call failed: {e}"), true),
            Err(_) => ("MCP tool call timed out after 30s".to_string(), true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp_config::ServerTransport;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn read_http_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut tmp = [0u8; 1024];
        loop {
            let n = stream.read(&mut tmp).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&tmp[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let header_end = pos + 4;
                let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
                let content_length = headers
                    .lines()
                    .find_map(|line| {
                        let lower = line.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .and_then(|v| v.trim().parse::<usize>().ok())
                    })
                    .unwrap_or(0);
                let mut body = buf[header_end..].to_vec();
                while body.len() < content_length {
                    let m = stream.read(&mut tmp).await.unwrap();
                    if m == 0 {
                        break;
                    }
                    body.extend_from_slice(&tmp[..m]);
                }
                return String::from_utf8_lossy(&body[..content_length]).to_string();
            }
        }
        String::new()
    }

    async fn write_http_response(stream: &mut TcpStream, status: &str, body: &str) {
        let resp = format!(
            "HTTP/1.1 {}\r\nConnection: close\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(resp.as_bytes()).await.unwrap();
    }

    /// Spawns a minimal in-memory MCP-over-HTTP server exposing `read_file`
    /// and `write_file`, or whatever `tools` JSON is given.
    async fn spawn_mock_server(
        tools_json: serde_json::Value,
        call_response: serde_json::Value,
        request_count: usize,
    ) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            for _ in 0..request_count {
                let (mut stream, _) = listener.accept().await.unwrap();
                let body = read_http_request(&mut stream).await;
                let json: serde_json::Value = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
                let method = json.get("method").and_then(|m| m.as_str()).unwrap_or("");
                match method {
                    "initialize" => {
                        write_http_response(
                            &mut stream,
                            "200 OK",
                            &serde_json::json!({"jsonrpc":"2.0","id":"skein-mcp-initialize","result":{}}).to_string(),
                        )
                        .await;
                    }
                    "notifications/initialized" => {
                        write_http_response(&mut stream, "202 Accepted", "").await;
                    }
                    "tools/list" => {
                        write_http_response(
                            &mut stream,
                            "200 OK",
                            &serde_json::json!({"jsonrpc":"2.0","id":"skein-tools-list","result":{"tools":tools_json}}).to_string(),
                        )
                        .await;
                    }
                    "tools/call" => {
                        write_http_response(
                            &mut stream,
                            "200 OK",
                            &serde_json::json!({"jsonrpc":"2.0","id":"call","result":call_response}).to_string(),
                        )
                        .await;
                    }
                    _ => panic!("unexpected method: {method}"),
                }
            }
        });
        (format!("http://{addr}"), handle)
    }

    fn http_config(url: String) -> ServerConfig {
        ServerConfig {
            transport: ServerTransport::Http,
            command: None,
            args: Vec::new(),
            env: HashMap::new(),
            url: Some(url),
        }
    }

    #[tokio::test]
    async fn start_all_discovers_connected_tools_sorted_and_namespaced() {
        let tools = serde_json::json!([
            {"name": "write_file", "description": "write", "inputSchema": {"type": "object"}},
            {"name": "read_file", "description": "read", "inputSchema": {"type": "object"}}
        ]);
        let (url, server) = spawn_mock_server(tools, serde_json::json!({}), 3).await;
        let mut cfg = McpConfig::new();
        cfg.insert("fs".to_string(), http_config(url));

        let manager = McpManager::new();
        manager.start_all(&cfg).await;

        let names = manager.tool_names().await;
        assert_eq!(
            names,
            vec![
                "mcp__fs__read_file".to_string(),
                "mcp__fs__write_file".to_string()
            ]
        );
        let statuses = manager.server_statuses().await;
        assert_eq!(statuses.get("fs").map(String::as_str), Some("connected"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn call_tool_round_trips_success() {
        let tools = serde_json::json!([{"name": "echo", "description": null, "inputSchema": {}}]);
        let call_result = serde_json::json!({"content": [{"type":"text","text":"echo: hello"}]});
        let (url, server) = spawn_mock_server(tools, call_result, 4).await;
        let mut cfg = McpConfig::new();
        cfg.insert("echo-svc".to_string(), http_config(url));

        let manager = McpManager::new();
        manager.start_all(&cfg).await;

        let (text, is_error) = manager
            .call_tool("echo-svc", "echo", serde_json::json!({"message": "hello"}))
            .await;
        assert_eq!(text, "echo: hello");
        assert!(!is_error);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn call_tool_surfaces_remote_is_error() {
        let tools = serde_json::json!([{"name": "fail", "description": null, "inputSchema": {}}]);
        let call_result = serde_json::json!({
            "isError": true,
            "content": [{"type":"text","text":"something went wrong"}]
        });
        let (url, server) = spawn_mock_server(tools, call_result, 4).await;
        let mut cfg = McpConfig::new();
        cfg.insert("failer".to_string(), http_config(url));

        let manager = McpManager::new();
        manager.start_all(&cfg).await;

        let (text, is_error) = manager.call_tool("failer", "fail", serde_json::json!({})).await;
        assert_eq!(text, "something went wrong");
        assert!(is_error);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn call_tool_surfaces_empty_response() {
        let tools = serde_json::json!([{"name": "silent", "description": null, "inputSchema": {}}]);
        let call_result = serde_json::json!({"content": []});
        let (url, server) = spawn_mock_server(tools, call_result, 4).await;
        let mut cfg = McpConfig::new();
        cfg.insert("quiet".to_string(), http_config(url));

        let manager = McpManager::new();
        manager.start_all(&cfg).await;

        let (text, is_error) = manager.call_tool("quiet", "silent", serde_json::json!({})).await;
        assert_eq!(text, "MCP server returned empty response");
        assert!(is_error);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn call_tool_unknown_server_reports_not_found_without_panicking() {
        let manager = McpManager::new();
        let (text, is_error) = manager.call_tool("ghost", "noop", serde_json::json!({})).await;
        assert!(is_error);
        assert!(text.contains("not found"));
    }

    #[tokio::test]
    async fn stop_all_disconnects_and_clears_tool_catalogue() {
        let tools = serde_json::json!([{"name": "t", "description": null, "inputSchema": {}}]);
        let (url, server) = spawn_mock_server(tools, serde_json::json!({}), 3).await;
        let mut cfg = McpConfig::new();
        cfg.insert("svc".to_string(), http_config(url));

        let manager = McpManager::new();
        manager.start_all(&cfg).await;
        assert_eq!(manager.tool_names().await.len(), 1);

        manager.stop_all().await;
        assert!(manager.tool_names().await.is_empty());
        assert_eq!(
            manager.server_statuses().await.get("svc").map(String::as_str),
            Some("disconnected")
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_failure_on_one_server_does_not_block_another() {
        let tools = serde_json::json!([{"name": "t", "description": null, "inputSchema": {}}]);
        let (good_url, server) = spawn_mock_server(tools, serde_json::json!({}), 3).await;

        let mut cfg = McpConfig::new();
        cfg.insert(
            "bad".to_string(),
            http_config("http://127.0.0.1:1".to_string()),
        );
        cfg.insert("good".to_string(), http_config(good_url));

        let manager = McpManager::new();
        manager.start_all(&cfg).await;

        let statuses = manager.server_statuses().await;
        assert!(statuses.get("bad").unwrap().starts_with("error"));
        assert_eq!(statuses.get("good").map(String::as_str), Some("connected"));
        server.await.unwrap();
    }
}
