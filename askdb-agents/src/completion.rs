//! JSON-mode completions with a small local retry policy.
//!
//! Some OpenAI-compatible gateways (Groq in particular) validate JSON mode output
//! server side and answer with HTTP 400 `json_validate_failed` when the model
//! strays. Those failures are worth another attempt after reminding the model of
//! the output contract; everything else is returned to the caller as an empty
//! reply.

use askdb_llm_sdk::client::LlmClient;
use askdb_llm_sdk::error::LlmError;
use askdb_llm_sdk::types::{CompletionRequest, ResponseFormat, Role};

use crate::conversation::Conversation;

pub const JSON_ONLY_REMINDER: &str =
    "IMPORTANT: You must respond ONLY with a valid JSON object. No conversational text before or after.";

#[derive(Debug, Clone)]
pub struct CompletionRetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Case-insensitive markers that flag a format-validation failure
    pub retryable_markers: Vec<String>,
    /// System message appended before a retry
    pub reminder: String,
}

impl Default for CompletionRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retryable_markers: vec!["json_validate_failed".to_string()],
            reminder: JSON_ONLY_REMINDER.to_string(),
        }
    }
}

impl CompletionRetryPolicy {
    pub fn is_retryable(&self, error: &LlmError) -> bool {
        if error.status() == Some(400) {
            return true;
        }

        let description = error.to_string().to_lowercase();
        self.retryable_markers
            .iter()
            .any(|marker| description.contains(&marker.to_lowercase()))
    }

    /// Append the reminder unless the conversation already ends with a system message
    pub fn prepare_retry(&self, conversation: &mut Conversation) {
        if conversation.last_role() != Some(Role::System) {
            conversation.push_system(self.reminder.clone());
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub json_mode: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            temperature: None,
            json_mode: true,
        }
    }
}

/// Request one assistant reply for `conversation`.
///
/// Returns the raw reply text, or an empty string when the provider failed in a
/// way the policy does not retry or every attempt was used up.
pub async fn complete_json(
    client: &dyn LlmClient,
    policy: &CompletionRetryPolicy,
    conversation: &mut Conversation,
    options: &CompletionOptions,
) -> String {
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        let request = CompletionRequest {
            messages: conversation.messages().to_vec(),
            max_tokens: options.max_tokens,
            model: client.model_name().to_string(),
            temperature: options.temperature,
            response_format: options.json_mode.then_some(ResponseFormat::JsonObject),
        };

        match client.complete(request).await {
            Ok(response) => {
                tracing::debug!(
                    attempt,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "completion received"
                );
                return response.content;
            }
            Err(error) if policy.is_retryable(&error) && attempt < attempts => {
                tracing::warn!(attempt, error = %error, "format validation failed, retrying");
                policy.prepare_retry(conversation);
            }
            Err(error) => {
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    provider = client.provider_name(),
                    error = %error,
                    "completion failed"
                );
                return String::new();
            }
        }
    }

    String::new()
}
