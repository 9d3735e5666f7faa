//! SMS-send tool: POSTs a message to a configured SMS gateway, keyed by
//! [`crate::context::Credentials::sms_api_key`]. Mirrors the credential-gated
//! degrade-to-stub shape of [`super::web_search::WebSearchTool`]; this is
//! the one reference tool without a direct teacher counterpart, since the
//! pack's social tooling (`twitter::search`) only reads, never sends.

use async_trait::async_trait;
use serde_json::json;

use crate::context::ToolContext;
use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::Tool;

pub const TOOL_SMS_SEND: &str = "sms_send";

const SMS_GATEWAY_URL: &str = "https://api.sms-gateway.example/v1/messages";

#[derive(Default)]
pub struct SmsSendTool;

#[async_trait]
impl Tool for SmsSendTool {
    fn name(&self) -> &str {
        TOOL_SMS_SEND
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_SMS_SEND.to_string(),
            description: Some("Send a text message to a phone number via the configured SMS gateway.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "to": {"type": "string", "description": "Destination phone number, E.164 format."},
                    "body": {"type": "string", "description": "Message text."}
                },
                "required": ["to", "body"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolCallContent, ToolSourceError> {
        let to = args
            .get("to")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing to".to_string()))?;
        let body = args
            .get("body")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing body".to_string()))?;

        let Some(api_key) = ctx.credentials.sms_api_key.as_deref() else {
            return Ok(ToolCallContent {
                text: "sms_send is not configured in this context (no SMS API key)".to_string(),
                is_error: true,
            });
        };

        let client = reqwest::Client::new();
        let response = client
            .post(SMS_GATEWAY_URL)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&json!({ "to": to, "body": body }))
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ToolSourceError::Transport(format!("sms gateway error {status}: {text}")));
        }

        Ok(ToolCallContent { text: format!("sent to {to}"), is_error: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stubs_when_no_api_key_configured() {
        let tool = SmsSendTool;
        let ctx = ToolContext::new("/tmp");
        let out = tool.call(json!({"to": "+15555550123", "body": "hi"}), &ctx).await.unwrap();
        assert!(out.is_error);
        assert!(out.text.contains("not configured"));
    }

    #[tokio::test]
    async fn missing_fields_are_invalid_input() {
        let tool = SmsSendTool;
        let ctx = ToolContext::new("/tmp");
        assert!(tool.call(json!({"body": "hi"}), &ctx).await.is_err());
        assert!(tool.call(json!({"to": "+15555550123"}), &ctx).await.is_err());
    }
}
