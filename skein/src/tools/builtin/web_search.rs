//! Web search tool, grounded on the Exa-search request shape: a single
//! `query` POSTed with an API key header, truncated to a handful of
//! title/url/snippet results. Degrades to a stub response when
//! [`crate::context::Credentials::search_api_key`] is unset rather than
//! failing the call outright.

use async_trait::async_trait;
use serde_json::json;

use crate::context::ToolContext;
use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::Tool;

pub const TOOL_WEB_SEARCH: &str = "web_search";

const SEARCH_URL: &str = "https://api.exa.ai/search";
const MAX_RESULTS: u64 = 10;

#[derive(Default)]
pub struct WebSearchTool;

fn format_results(value: &serde_json::Value) -> String {
    let results = value
        .get("results")
        .and_then(|r| r.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[]);
    if results.is_empty() {
        return "No results".to_string();
    }
    let mut out = String::new();
    for (i, r) in results.iter().enumerate() {
        let title = r.get("title").and_then(|t| t.as_str()).unwrap_or("(no title)");
        let url = r.get("url").and_then(|u| u.as_str()).unwrap_or("");
        out.push_str(&format!("[{}] {title}\n  {url}\n", i + 1));
    }
    out
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        TOOL_WEB_SEARCH
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_WEB_SEARCH.to_string(),
            description: Some("Search the web and return titles, URLs, and short excerpts.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query."}
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing query".to_string()))?;

        let Some(api_key) = ctx.credentials.search_api_key.as_deref() else {
            return Ok(ToolCallContent {
                text: "web_search is not configured in this context (no search API key)".to_string(),
                is_error: true,
            });
        };

        let client = reqwest::Client::new();
        let response = client
            .post(SEARCH_URL)
            .header("x-api-key", api_key)
            .json(&json!({ "query": query, "numResults": MAX_RESULTS }))
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolSourceError::Transport(format!("search API error {status}: {body}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        Ok(ToolCallContent { text: format_results(&body), is_error: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stubs_when_no_api_key_configured() {
        let tool = WebSearchTool;
        let ctx = ToolContext::new("/tmp");
        let out = tool.call(json!({"query": "rust async"}), &ctx).await.unwrap();
        assert!(out.is_error);
        assert!(out.text.contains("not configured"));
    }

    #[tokio::test]
    async fn missing_query_is_invalid_input() {
        let tool = WebSearchTool;
        let ctx = ToolContext::new("/tmp");
        let err = tool.call(json!({}), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::InvalidInput(_)));
    }
}
