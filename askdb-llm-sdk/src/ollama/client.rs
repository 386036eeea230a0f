use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::{
    error::LlmError,
    ollama::types::{
        OllamaChatRequest, OllamaChatResponse, OllamaFormat, OllamaMessage, OllamaOptions,
        OllamaRole,
    },
    types::{CompletionRequest, CompletionResponse, ResponseFormat, Role, Usage},
};

/// Ollama local LLM client
pub struct OllamaClient {
    base_url: String,
    model: String,
    http_client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default base URL
    pub fn new() -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::Network { source: e })?;

        Ok(Self {
            base_url: crate::models::ollama::BASE_URL.to_string(),
            model: crate::models::ollama::LLAMA_3_1_ID.to_string(),
            http_client,
        })
    }

    /// Set a custom base URL for the API
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model reported by [`crate::client::LlmClient::model_name`]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Create a chat message using the Ollama /api/chat endpoint
    pub async fn create_chat(
        &self,
        request: OllamaChatRequest,
    ) -> Result<OllamaChatResponse, LlmError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if std::env::var("ASKDB_LLM_LOG_PAYLOADS").is_ok() {
            if let Ok(json_str) = serde_json::to_string_pretty(&request) {
                tracing::debug!(provider = "ollama", "request payload:\n{}", json_str);
            }
        }

        let response = self
            .http_client
            .post(&url)
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Network { source: e })?;

        let status = response.status();

        if status.is_success() {
            let ollama_response: OllamaChatResponse = response
                .json()
                .await
                .map_err(|e| LlmError::internal(format!("Failed to parse response: {}", e)))?;
            Ok(ollama_response)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            tracing::warn!(status = status.as_u16(), error = %error_text, "ollama chat failed");
            Err(LlmError::from_status(status, error_text, None))
        }
    }
}

#[async_trait]
impl crate::client::LlmClient for OllamaClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let messages = request
            .messages
            .into_iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::User => OllamaRole::User,
                    Role::Assistant => OllamaRole::Assistant,
                    Role::System => OllamaRole::System,
                };
                OllamaMessage::new(role, msg.content)
            })
            .collect();

        let options = OllamaOptions {
            temperature: request.temperature,
            num_predict: (request.max_tokens > 0).then_some(request.max_tokens),
        };

        let format = match request.response_format {
            Some(ResponseFormat::JsonObject) => Some(OllamaFormat::json()),
            Some(ResponseFormat::Text) | None => None,
        };

        let ollama_request = OllamaChatRequest {
            model: request.model,
            messages,
            format,
            options: options.into_option(),
            stream: Some(false), // single JSON body instead of NDJSON chunks
        };

        let ollama_response = self.create_chat(ollama_request).await?;

        Ok(CompletionResponse {
            content: ollama_response.message.content,
            role: Role::Assistant,
            usage: Usage {
                input_tokens: ollama_response.prompt_eval_count.unwrap_or(0),
                output_tokens: ollama_response.eval_count.unwrap_or(0),
            },
            stop_reason: ollama_response.done_reason,
        })
    }

    fn provider_name(&self) -> &str {
        crate::providers::OLLAMA
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
