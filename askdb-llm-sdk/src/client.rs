use crate::{
    error::LlmError,
    types::{CompletionRequest, CompletionResponse},
};
use async_trait::async_trait;

/// Core trait for LLM clients
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete a request (non-streaming)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Get provider name (e.g., "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model name (e.g., "openai/gpt-oss-120b", "llama3.1")
    fn model_name(&self) -> &str;
}
