use async_trait::async_trait;
use tracing::debug;

use crate::config::LLMConfig;
use crate::llm::openai::OpenAICompatibleAdapter;
use crate::types::{AppError, AppResult, LLMProvider, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Configuration for LLM provider (renamed to avoid conflict with LLMProvider enum in types.rs)
pub struct LLMProviderConfig {
    pub name: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

impl From<&LLMConfig> for LLMProviderConfig {
    fn from(config: &LLMConfig) -> Self {
        Self {
            name: config.provider.clone(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    provider_name: String,
}

impl LLM {
    pub fn new(provider: LLMProviderConfig) -> AppResult<Self> {
        let kind = LLMProvider::from_id(&provider.name).ok_or_else(|| {
            AppError::Config(format!("Unsupported LLM provider: {}", provider.name))
        })?;

        // Every supported provider speaks the OpenAI chat-completions format.
        let adapter = match provider.base_url {
            Some(base_url) => OpenAICompatibleAdapter::with_base_url(&provider.api_key, base_url),
            None => OpenAICompatibleAdapter::for_provider(kind, &provider.api_key),
        };

        Ok(Self {
            adapter: Box::new(adapter),
            provider_name: kind.to_string(),
        })
    }

    pub fn from_adapter(adapter: Box<dyn LLMAdapter>) -> Self {
        Self {
            adapter,
            provider_name: "custom".to_string(),
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        debug!(
            provider = %self.provider_name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Calling model endpoint"
        );
        self.adapter.create_chat_completion(request).await
    }
}
