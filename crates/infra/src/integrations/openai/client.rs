//! OpenAI-backed completion client for the scheduling agent.

use async_trait::async_trait;
use reqwest::Method;
use timewise_core::agent::ports::{
    CompletionOutcome, CompletionPort, OperationRequest, PromptMessage, ToolSpec,
};
use timewise_domain::Result;
use tracing::{debug, warn};

use super::types::{
    ApiFunctionCall, ApiMessage, ApiToolCall, ChatCompletionRequest, ChatCompletionResponse,
    OpenAiError, ToolDefinition, ToolFunction,
};
use crate::http::HttpClient;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Chat Completions client with function calling enabled.
pub struct OpenAiCompletionClient {
    http_client: HttpClient,
    api_key: String,
    model: String,
    api_url: String,
}

impl OpenAiCompletionClient {
    pub fn new(api_key: String, http_client: HttpClient) -> Self {
        Self {
            http_client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_url: OPENAI_API_URL.to_string(),
        }
    }

    /// Override the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API URL (for testing).
    #[cfg(test)]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    async fn call_api(
        &self,
        request_payload: &ChatCompletionRequest,
    ) -> std::result::Result<ChatCompletionResponse, OpenAiError> {
        let request_builder = self
            .http_client
            .request(Method::POST, &self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request_payload);

        let response = self
            .http_client
            .send(request_builder)
            .await
            .map_err(|err| OpenAiError::Network(err.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), "received completion response");

        if !status.is_success() {
            return Err(error_for_status(status.as_u16(), response).await);
        }

        response
            .json()
            .await
            .map_err(|err| OpenAiError::InvalidSchema(format!("failed to parse response: {err}")))
    }
}

#[async_trait]
impl CompletionPort for OpenAiCompletionClient {
    async fn complete(
        &self,
        system_prompt: &str,
        conversation: &[PromptMessage],
        tools: &[ToolSpec],
    ) -> Result<CompletionOutcome> {
        let mut messages = vec![ApiMessage::text("system", system_prompt)];
        messages.extend(conversation.iter().map(encode_message));

        let request_payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            tools: (!tools.is_empty()).then(|| tools.iter().map(encode_tool).collect()),
            tool_choice: (!tools.is_empty()).then_some("auto"),
        };

        let response = self.call_api(&request_payload).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OpenAiError::InvalidSchema("response contained no choices".into()))?;

        if choice.message.tool_calls.is_empty() {
            return Ok(CompletionOutcome::Direct(choice.message.content.unwrap_or_default()));
        }
        Ok(CompletionOutcome::Operations(
            choice.message.tool_calls.into_iter().map(decode_tool_call).collect(),
        ))
    }
}

fn encode_message(message: &PromptMessage) -> ApiMessage {
    match message {
        PromptMessage::User(content) => ApiMessage::text("user", content.clone()),
        PromptMessage::Assistant(content) => ApiMessage::text("assistant", content.clone()),
        PromptMessage::AssistantOperations(ops) => ApiMessage {
            role: "assistant",
            content: None,
            tool_calls: Some(
                ops.iter()
                    .map(|op| ApiToolCall {
                        id: op.call_id.clone(),
                        kind: "function".to_string(),
                        function: ApiFunctionCall {
                            name: op.name.clone(),
                            arguments: op.arguments.to_string(),
                        },
                    })
                    .collect(),
            ),
            tool_call_id: None,
        },
        PromptMessage::OperationResult { call_id, content, .. } => ApiMessage {
            role: "tool",
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: Some(call_id.clone()),
        },
    }
}

fn encode_tool(spec: &ToolSpec) -> ToolDefinition {
    ToolDefinition {
        kind: "function",
        function: ToolFunction {
            name: spec.name.to_string(),
            description: spec.description.to_string(),
            parameters: spec.parameters.clone(),
        },
    }
}

/// Unparsable argument payloads degrade to an empty map; the agent reports
/// the missing arguments back through the normal operation-result channel.
fn decode_tool_call(call: ApiToolCall) -> OperationRequest {
    let arguments = serde_json::from_str(&call.function.arguments).unwrap_or_else(|err| {
        warn!(call_id = %call.id, error = %err, "unparsable tool-call arguments");
        serde_json::json!({})
    });
    OperationRequest { call_id: call.id, name: call.function.name, arguments }
}

async fn error_for_status(status: u16, response: reqwest::Response) -> OpenAiError {
    let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

    match status {
        401 | 403 => OpenAiError::Authentication(format!("Invalid API key ({status})")),
        429 => OpenAiError::RateLimit(60),
        _ => OpenAiError::Api { status, message },
    }
}
