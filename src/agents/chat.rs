//! Chat Agent
//!
//! Drives the tool-calling dialogue behind `/api/chat`: the model sees the
//! transcript plus the tool declarations, may request data lookups, gets the
//! results appended, and is asked again until it answers in plain text or
//! the round cap is hit.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::LLMConfig;
use crate::dataset::Dataset;
use crate::llm::provider::LLM;
use crate::tools::{tool_definitions, ToolExecutor};
use crate::types::{
    AppError, AppResult, LLMMessage, LLMRequest, LLMResponse, ToolCall, ToolChoice,
    ToolDefinition,
};

/// Tool-calling rounds allowed before the loop is forced to stop.
pub const MAX_TOOL_ITERATIONS: u32 = 5;

pub const FALLBACK_RESPONSE: &str = "I'm sorry, I couldn't generate a response.";

const CHAT_FAILURE: &str = "Failed to process chat request. Please try again.";

const SYSTEM_PROMPT: &str = "You are a helpful medical AI assistant with access to a clinical \
database of patients and their biomarker results. Use the available tools to look up patients, \
retrieve biomarker measurements and analyze abnormal values before answering. Only state facts \
that come from the tool results. Be concise and professional, use markdown formatting, and remind \
the user that your answers are informational and not a substitute for professional medical advice.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model answered without requesting tools.
    Completed,
    /// The round cap was reached; the answer is the last model content.
    IterationLimit,
}

#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub response: String,
    pub rounds: u32,
    pub stop_reason: StopReason,
    pub transcript: Vec<LLMMessage>,
}

enum LoopState {
    AwaitingModel,
    ExecutingTools(LLMResponse),
    Done(String, StopReason),
}

pub struct ChatAgent {
    llm: Arc<LLM>,
    tools: ToolExecutor,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatAgent {
    pub fn new(llm: Arc<LLM>, dataset: Arc<Dataset>, config: &LLMConfig) -> Self {
        Self {
            llm,
            tools: ToolExecutor::new(dataset),
            model: config.model.clone(),
            max_tokens: config.chat_max_tokens,
            temperature: config.temperature,
        }
    }

    /// Runs one conversation turn over the caller-supplied history.
    ///
    /// A failed model call aborts the loop with [`AppError::Generation`];
    /// failed tools never do.
    pub async fn run(&self, messages: Vec<LLMMessage>) -> AppResult<ChatOutcome> {
        let mut transcript = Vec::with_capacity(messages.len() + 1);
        transcript.push(LLMMessage::system(SYSTEM_PROMPT));
        transcript.extend(messages);

        let tools = tool_definitions();
        let mut rounds = 0;
        let mut state = LoopState::AwaitingModel;

        info!(messages = transcript.len(), "Starting chat loop");

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    let request = self.build_request(&transcript, &tools);
                    let response = self.llm.create_chat_completion(&request).await.map_err(|e| {
                        error!(error = %e, round = rounds, "Model call failed");
                        AppError::Generation(CHAT_FAILURE.to_string())
                    })?;

                    if response.has_tool_calls() {
                        transcript.push(LLMMessage::assistant_with_tool_calls(
                            response.content.clone(),
                            response.tool_calls.clone(),
                        ));
                        LoopState::ExecutingTools(response)
                    } else {
                        LoopState::Done(or_fallback(response.content), StopReason::Completed)
                    }
                }
                LoopState::ExecutingTools(response) => {
                    let names: Vec<&str> =
                        response.tool_calls.iter().map(|c| c.name.as_str()).collect();
                    info!(round = rounds + 1, tools = ?names, "Executing tool calls");

                    for call in &response.tool_calls {
                        let content = self.run_tool_call(call);
                        transcript.push(LLMMessage::tool_result(call.id.clone(), content));
                    }

                    rounds += 1;
                    if rounds >= MAX_TOOL_ITERATIONS {
                        warn!(rounds, "Tool iteration limit reached, returning last response");
                        LoopState::Done(or_fallback(response.content), StopReason::IterationLimit)
                    } else {
                        LoopState::AwaitingModel
                    }
                }
                LoopState::Done(response, stop_reason) => {
                    info!(rounds, ?stop_reason, response_len = response.len(), "Chat loop finished");
                    return Ok(ChatOutcome {
                        response,
                        rounds,
                        stop_reason,
                        transcript,
                    });
                }
            };
        }
    }

    fn build_request(&self, transcript: &[LLMMessage], tools: &[ToolDefinition]) -> LLMRequest {
        LLMRequest {
            model: self.model.clone(),
            messages: transcript.to_vec(),
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            system_instruction: None,
            tools: tools.to_vec(),
            tool_choice: Some(ToolChoice::Auto),
        }
    }

    /// Text fed back to the model for one invocation.
    fn run_tool_call(&self, call: &ToolCall) -> String {
        match self.invoke_tool(call) {
            Ok(content) => content,
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool invocation failed");
                format!("Error: {}", e)
            }
        }
    }

    fn invoke_tool(&self, call: &ToolCall) -> AppResult<String> {
        let args: Value = if call.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&call.arguments).map_err(|e| {
                AppError::InvalidRequest(format!("invalid arguments for {}: {}", call.name, e))
            })?
        };

        let result = self.tools.execute(&call.name, &args);
        if result.is_error {
            debug!(tool = %call.name, content = %result.content, "Tool returned an error result");
        }
        Ok(result.content)
    }
}

fn or_fallback(content: String) -> String {
    if content.is_empty() {
        FALLBACK_RESPONSE.to_string()
    } else {
        content
    }
}
