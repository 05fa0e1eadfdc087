//! Wire types for the OpenAI Chat Completions API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use timewise_domain::TimewiseError;

/// OpenAI API error types
#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    /// Network-level error (connection failed, timeout, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// OpenAI API returned an error response
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded - should retry after delay
    #[error("Rate limit exceeded (retry after {0}s)")]
    RateLimit(u64),

    /// Authentication failed (invalid API key)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Response body doesn't match expected schema
    #[error("Invalid response schema: {0}")]
    InvalidSchema(String),
}

impl From<OpenAiError> for TimewiseError {
    fn from(value: OpenAiError) -> Self {
        match value {
            OpenAiError::Network(msg) => TimewiseError::Network(msg),
            other => TimewiseError::Completion(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'static str>,
}

/// One chat message on the wire. Role decides which optional fields apply:
/// assistant turns may carry `tool_calls`, tool turns carry `tool_call_id`.
#[derive(Debug, Serialize)]
pub(crate) struct ApiMessage {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ApiMessage {
    pub fn text(role: &'static str, content: impl Into<String>) -> Self {
        Self { role, content: Some(content.into()), tool_calls: None, tool_call_id: None }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApiToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ApiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApiFunctionCall {
    pub name: String,
    /// JSON-encoded argument map.
    pub arguments: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: ToolFunction,
}

#[derive(Debug, Serialize)]
pub(crate) struct ToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ApiToolCall>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_tool_call_response() {
        let json = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "create_meeting",
                            "arguments": "{\"title\": \"Standup\"}"
                        }
                    }]
                }
            }]
        }"#;

        let response: ChatCompletionResponse =
            serde_json::from_str(json).expect("should deserialize");
        let message = &response.choices[0].message;
        assert!(message.content.is_none());
        assert_eq!(message.tool_calls[0].function.name, "create_meeting");
    }

    #[test]
    fn deserializes_a_direct_reply_without_tool_calls() {
        let json = r#"{
            "choices": [{ "message": { "content": "All set." } }]
        }"#;

        let response: ChatCompletionResponse =
            serde_json::from_str(json).expect("should deserialize");
        let message = &response.choices[0].message;
        assert_eq!(message.content.as_deref(), Some("All set."));
        assert!(message.tool_calls.is_empty());
    }

    #[test]
    fn tool_turns_serialize_only_their_relevant_fields() {
        let message = ApiMessage {
            role: "tool",
            content: Some("{\"status\":\"ok\"}".to_string()),
            tool_calls: None,
            tool_call_id: Some("call_1".to_string()),
        };
        let encoded = serde_json::to_string(&message).expect("serialize");
        assert!(encoded.contains("tool_call_id"));
        assert!(!encoded.contains("tool_calls"));
    }
}
