use std::collections::VecDeque;
use std::sync::Mutex;

use askdb_llm_sdk::client::LlmClient;
use askdb_llm_sdk::error::LlmError;
use askdb_llm_sdk::types::{CompletionRequest, CompletionResponse, Message, Role, Usage};
use async_trait::async_trait;

/// In-process [`LlmClient`] replaying canned replies and recording every request
pub(crate) struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    /// Reply with `text` forever once the script runs out
    pub fn repeating(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn messages(&self, call: usize) -> Vec<Message> {
        self.requests.lock().unwrap()[call].messages.clone()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request);

        let next = self.replies.lock().unwrap().pop_front();
        let content = match (next, &self.fallback) {
            (Some(reply), _) => reply?,
            (None, Some(text)) => text.clone(),
            (None, None) => String::new(),
        };

        Ok(CompletionResponse {
            content,
            role: Role::Assistant,
            usage: Usage::default(),
            stop_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}
