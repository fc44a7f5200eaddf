// OpenAI chat-completions adapter
// Also used for OpenRouter and Groq, which expose the same wire format.
// API Reference: https://platform.openai.com/docs/api-reference/chat/create

use crate::llm::provider::LLMAdapter;
use crate::types::{
    AppError, AppResult, LLMMessage, LLMProvider, LLMRequest, LLMResponse, Role, TokenUsage,
    ToolCall, ToolChoice, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub struct OpenAICompatibleAdapter {
    client: Client,
    api_key: String,
    base_url: String,
}

// Request types
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Serialize)]
struct WireMessage {
    role: Role,
    // null is only sent for assistant turns that carry tool calls
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDefinition,
}

#[derive(Serialize)]
struct WireFunctionDefinition {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    // Documented as a JSON-encoded string; some compatible servers send an object.
    #[serde(default)]
    arguments: serde_json::Value,
}

fn function_kind() -> String {
    "function".to_string()
}

// Response types
#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

impl OpenAICompatibleAdapter {
    /// Adapter for the public OpenAI endpoint.
    pub fn new(api_key: &str) -> Self {
        Self::for_provider(LLMProvider::OpenAI, api_key)
    }

    pub fn for_provider(provider: LLMProvider, api_key: &str) -> Self {
        Self::with_base_url(api_key, provider.default_base_url())
    }

    /// Adapter for any server exposing `POST {base_url}/chat/completions`.
    pub fn with_base_url(api_key: &str, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn convert_message(msg: &LLMMessage) -> WireMessage {
        let content = if msg.content.is_empty() && !msg.tool_calls.is_empty() {
            None
        } else {
            Some(msg.content.clone())
        };

        WireMessage {
            role: msg.role,
            content,
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: function_kind(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: serde_json::Value::String(call.arguments.clone()),
                    },
                })
                .collect(),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    fn convert_tool(tool: &ToolDefinition) -> WireTool {
        WireTool {
            kind: "function",
            function: WireFunctionDefinition {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }

    fn build_request(request: &LLMRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(instruction) = &request.system_instruction {
            messages.push(Self::convert_message(&LLMMessage::system(instruction.clone())));
        }
        messages.extend(request.messages.iter().map(Self::convert_message));

        let tools: Vec<WireTool> = request.tools.iter().map(Self::convert_tool).collect();
        let tool_choice = if tools.is_empty() { None } else { request.tool_choice };

        ChatCompletionRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools,
            tool_choice,
        }
    }

    fn convert_tool_call(call: WireToolCall) -> ToolCall {
        let arguments = match call.function.arguments {
            serde_json::Value::String(raw) => raw,
            serde_json::Value::Null => "{}".to_string(),
            other => other.to_string(),
        };
        ToolCall::new(call.id, call.function.name, arguments)
    }
}

#[async_trait]
impl LLMAdapter for OpenAICompatibleAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::LLMApi("No API key configured".to_string()));
        }

        let url = format!("{}/chat/completions", self.base_url());
        let body = Self::build_request(request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMApi(format!("Request failed: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                return Err(AppError::LLMApi(format!(
                    "API error ({}): {} (type: {:?})",
                    status, error_response.error.message, error_response.error.error_type
                )));
            }

            return Err(AppError::LLMApi(format!("API error ({}): {}", status, error_text)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("Failed to parse response: {}", e)))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::LLMApi("Model returned no choices".to_string()))?;

        let usage = completion
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(Self::convert_tool_call)
                .collect(),
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn request_with_tools() -> LLMRequest {
        LLMRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![
                LLMMessage::user("How is patient 1?"),
                LLMMessage::assistant_with_tool_calls(
                    "",
                    vec![ToolCall::new("call_1", "get_patient", r#"{"patient_id":1}"#)],
                ),
                LLMMessage::tool_result("call_1", "{\"id\": 1}"),
            ],
            max_tokens: Some(100),
            temperature: Some(0.7),
            system_instruction: Some("Be brief.".to_string()),
            tools: vec![ToolDefinition {
                name: "get_patient".to_string(),
                description: "Get a patient".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            }],
            tool_choice: Some(ToolChoice::Auto),
        }
    }

    #[test]
    fn test_base_url_selection() {
        assert_eq!(OpenAICompatibleAdapter::new("k").base_url(), "https://api.openai.com/v1");
        assert_eq!(
            OpenAICompatibleAdapter::for_provider(LLMProvider::Groq, "k").base_url(),
            "https://api.groq.com/openai/v1"
        );
        assert_eq!(
            OpenAICompatibleAdapter::with_base_url("k", "http://localhost:8080/v1/").base_url(),
            "http://localhost:8080/v1"
        );
    }

    #[test]
    fn test_wire_format() {
        let wire = serde_json::to_value(OpenAICompatibleAdapter::build_request(&request_with_tools())).unwrap();

        assert_eq!(wire["messages"][0]["role"], "system");
        assert_eq!(wire["messages"][0]["content"], "Be brief.");
        assert_eq!(wire["messages"][2]["content"], serde_json::Value::Null);
        assert_eq!(wire["messages"][2]["tool_calls"][0]["type"], "function");
        assert_eq!(wire["messages"][2]["tool_calls"][0]["function"]["arguments"], r#"{"patient_id":1}"#);
        assert_eq!(wire["messages"][3]["role"], "tool");
        assert_eq!(wire["messages"][3]["tool_call_id"], "call_1");
        assert_eq!(wire["tools"][0]["type"], "function");
        assert_eq!(wire["tools"][0]["function"]["name"], "get_patient");
        assert_eq!(wire["tool_choice"], "auto");
    }

    #[test]
    fn test_plain_request_omits_tools() {
        let mut request = request_with_tools();
        request.tools.clear();
        let wire = serde_json::to_value(OpenAICompatibleAdapter::build_request(&request)).unwrap();
        assert!(wire.get("tools").is_none());
        assert!(wire.get("tool_choice").is_none());
    }

    #[tokio::test]
    async fn test_parses_tool_calls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({"model": "gpt-3.5-turbo", "tool_choice": "auto"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{
                        "index": 0,
                        "message": {
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [
                                {"id": "call_a", "type": "function",
                                 "function": {"name": "search_patients", "arguments": "{\"query\":\"smith\"}"}},
                                {"id": "call_b", "type": "function",
                                 "function": {"name": "get_all_patients", "arguments": {}}}
                            ]
                        },
                        "finish_reason": "tool_calls"
                    }],
                    "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let adapter = OpenAICompatibleAdapter::with_base_url("test-key", server.url());
        let response = adapter.create_chat_completion(&request_with_tools()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "");
        assert_eq!(response.finish_reason, "tool_calls");
        assert_eq!(response.usage.total_tokens, 15);
        assert_eq!(
            response.tool_calls,
            vec![
                ToolCall::new("call_a", "search_patients", r#"{"query":"smith"}"#),
                ToolCall::new("call_b", "get_all_patients", "{}"),
            ]
        );
    }

    #[tokio::test]
    async fn test_error_response_is_llm_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#)
            .create_async()
            .await;

        let adapter = OpenAICompatibleAdapter::with_base_url("bad-key", server.url());
        let err = adapter.create_chat_completion(&request_with_tools()).await.unwrap_err();

        match err {
            AppError::LLMApi(message) => assert!(message.contains("Incorrect API key")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let adapter = OpenAICompatibleAdapter::with_base_url("", "http://127.0.0.1:9");
        let err = adapter.create_chat_completion(&request_with_tools()).await.unwrap_err();
        assert!(matches!(err, AppError::LLMApi(_)));
    }
}
