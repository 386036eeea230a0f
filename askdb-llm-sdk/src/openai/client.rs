use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::{
    error::LlmError,
    openai::types::{
        OpenAIChatCompletionRequest, OpenAIChatCompletionResponse, OpenAIErrorResponse,
        OpenAIMessage, OpenAIResponseFormat, OpenAIRole,
    },
    types::{CompletionRequest, CompletionResponse, ResponseFormat, Role, Usage},
};

/// Client for OpenAI-compatible chat completion endpoints
pub struct OpenAIClient {
    api_key: String,
    base_url: String,
    model: String,
    http_client: reqwest::Client,
}

impl OpenAIClient {
    /// Create a new client with the given API key
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LlmError::authentication("API key cannot be empty"));
        }

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300)) // 5 minute timeout
            .build()
            .map_err(|e| LlmError::Network { source: e })?;

        Ok(Self {
            api_key,
            base_url: crate::models::openai::BASE_URL.to_string(),
            model: crate::models::openai::GPT_4O_MINI_ID.to_string(),
            http_client,
        })
    }

    /// Set a custom base URL, including the version segment (e.g. `.../openai/v1`)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model reported by [`crate::client::LlmClient::model_name`]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Create a chat completion using the Chat Completions API
    pub async fn create_chat_completion(
        &self,
        request: OpenAIChatCompletionRequest,
    ) -> Result<OpenAIChatCompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| LlmError::authentication("Invalid API key format"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if std::env::var("ASKDB_LLM_LOG_PAYLOADS").is_ok() {
            if let Ok(json_str) = serde_json::to_string_pretty(&request) {
                tracing::debug!(provider = "openai", "request payload:\n{}", json_str);
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
            let openai_response: OpenAIChatCompletionResponse = response
                .json()
                .await
                .map_err(|e| LlmError::internal(format!("Failed to parse response: {}", e)))?;
            Ok(openai_response)
        } else {
            // Extract retry-after header before consuming the response
            let retry_after = if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                response
                    .headers()
                    .get("retry-after")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
            } else {
                None
            };

            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = match serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                Ok(error_response) => error_response.error.describe(),
                // Fallback for non-standard error responses
                Err(_) => error_text,
            };

            tracing::warn!(status = status.as_u16(), error = %message, "chat completion failed");
            Err(LlmError::from_status(status, message, retry_after))
        }
    }
}

#[async_trait]
impl crate::client::LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let messages = request
            .messages
            .into_iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::User => OpenAIRole::User,
                    Role::Assistant => OpenAIRole::Assistant,
                    Role::System => OpenAIRole::System,
                };
                OpenAIMessage::new(role, msg.content)
            })
            .collect();

        let response_format = request.response_format.map(|format| match format {
            ResponseFormat::Text => OpenAIResponseFormat::text(),
            ResponseFormat::JsonObject => OpenAIResponseFormat::json_object(),
        });

        let openai_request = OpenAIChatCompletionRequest {
            model: request.model,
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: request.temperature,
            stream: None,
            response_format,
        };

        let openai_response = self.create_chat_completion(openai_request).await?;

        let choice = openai_response
            .choices
            .first()
            .ok_or_else(|| LlmError::internal("No completion choices returned"))?;

        let usage = openai_response
            .usage
            .as_ref()
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content.clone().unwrap_or_default(),
            role: Role::Assistant,
            usage,
            stop_reason: choice.finish_reason.clone(),
        })
    }

    fn provider_name(&self) -> &str {
        crate::providers::OPENAI
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LlmClient;
    use crate::types::Message;

    fn json_request(model: &str) -> CompletionRequest {
        CompletionRequest {
            messages: vec![Message::system("sys"), Message::user("How many users?")],
            max_tokens: 128,
            model: model.to_string(),
            temperature: None,
            response_format: Some(ResponseFormat::JsonObject),
        }
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "openai/gpt-oss-120b",
                "response_format": {"type": "json_object"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "chatcmpl-1",
                    "object": "chat.completion",
                    "created": 1700000000,
                    "model": "openai/gpt-oss-120b",
                    "choices": [{
                        "index": 0,
                        "message": {"role": "assistant", "content": "{\"type\":\"answer\",\"content\":\"5\"}"},
                        "finish_reason": "stop"
                    }],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
                }"#,
            )
            .create_async()
            .await;

        let client = OpenAIClient::new("test-key")
            .unwrap()
            .with_base_url(format!("{}/v1/", server.url()))
            .with_model("openai/gpt-oss-120b");

        let response = client
            .complete(json_request(client.model_name()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, r#"{"type":"answer","content":"5"}"#);
        assert_eq!(response.usage.input_tokens, 12);
        assert_eq!(response.usage.output_tokens, 7);
        assert_eq!(response.stop_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn test_json_validate_failure_maps_to_invalid_request() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/openai/v1/chat/completions")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error":{"message":"Failed to generate JSON. Please adjust your prompt.","type":"invalid_request_error","code":"json_validate_failed"}}"#,
            )
            .create_async()
            .await;

        let client = OpenAIClient::new("test-key")
            .unwrap()
            .with_base_url(format!("{}/openai/v1", server.url()));

        let err = client.complete(json_request("m")).await.unwrap_err();
        match err {
            LlmError::InvalidRequest { message } => {
                assert!(message.starts_with("json_validate_failed"));
            }
            other => panic!("Expected InvalidRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let client = OpenAIClient::new("bad-key")
            .unwrap()
            .with_base_url(format!("{}/v1", server.url()));

        let err = client.complete(json_request("m")).await.unwrap_err();
        assert!(matches!(err, LlmError::Authentication { .. }));
    }

    #[tokio::test]
    async fn test_empty_choices_is_internal_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"x","model":"m","choices":[]}"#)
            .create_async()
            .await;

        let client = OpenAIClient::new("test-key")
            .unwrap()
            .with_base_url(format!("{}/v1", server.url()));

        let err = client.complete(json_request("m")).await.unwrap_err();
        assert!(matches!(err, LlmError::Internal { .. }));
    }
}
