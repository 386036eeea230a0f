//! Text-to-SQL agent.
//!
//! A run alternates between asking the model for a JSON decision and executing
//! the SQL it proposes, feeding every result back into the conversation until
//! the model answers or the step budget runs out. Progress is exposed as a
//! stream of [`AgentEvent`]s; nothing happens until the stream is polled and
//! dropping it stops the run before the next provider or database call.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use askdb_llm_sdk::client::LlmClient;
use askdb_tools::{load_schema_context, run_sql, QueryResult};
use futures_util::stream::{self, Stream, StreamExt};

use crate::completion::{complete_json, CompletionOptions, CompletionRetryPolicy};
use crate::config::AgentConfig;
use crate::conversation::Conversation;
use crate::decision::{Decision, DecisionError};
use crate::events::{AgentEvent, AgentFailure};

mod feedback;
mod prompt;

pub use prompt::generate_system_prompt;


pub struct SqlAgent {
    client: Arc<dyn LlmClient>,
    db_path: PathBuf,
    config: AgentConfig,
    retry_policy: CompletionRetryPolicy,
}

impl SqlAgent {
    pub fn new(client: Arc<dyn LlmClient>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            db_path: db_path.into(),
            config: AgentConfig::default(),
            retry_policy: CompletionRetryPolicy::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: CompletionRetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Rendered schema block, empty when the database cannot be inspected
    pub async fn schema_context(&self) -> String {
        load_schema(self.db_path.clone()).await
    }

    /// Start answering `question`. Each call gets its own conversation.
    pub fn run(
        &self,
        question: impl Into<String>,
    ) -> impl Stream<Item = AgentEvent> + Send + 'static {
        event_stream(AgentRun::new(self, question.into()))
    }

    /// Drive a run to completion and collect every event
    pub async fn ask(&self, question: impl Into<String>) -> Vec<AgentEvent> {
        self.run(question).collect().await
    }
}

fn event_stream(run: AgentRun) -> impl Stream<Item = AgentEvent> + Send + 'static {
    stream::unfold(run, |mut run| async move {
        let event = run.next_event().await?;
        Some((event, run))
    })
}

async fn load_schema(db_path: PathBuf) -> String {
    tokio::task::spawn_blocking(move || load_schema_context(&db_path))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "schema inspection task failed");
            String::new()
        })
}

enum Phase {
    Starting,
    AwaitingDecision,
    /// `Executing SQL` has been emitted; the statement runs on the next poll
    IssuingSql { raw: String, sql: String },
    Finished,
}

struct AgentRun {
    client: Arc<dyn LlmClient>,
    db_path: PathBuf,
    config: AgentConfig,
    retry_policy: CompletionRetryPolicy,
    question: String,
    conversation: Option<Conversation>,
    phase: Phase,
    step: usize,
    pending: VecDeque<AgentEvent>,
}

impl AgentRun {
    fn new(agent: &SqlAgent, question: String) -> Self {
        Self {
            client: agent.client.clone(),
            db_path: agent.db_path.clone(),
            config: agent.config.clone(),
            retry_policy: agent.retry_policy.clone(),
            question,
            conversation: None,
            phase: Phase::Starting,
            step: 0,
            pending: VecDeque::new(),
        }
    }

    async fn next_event(&mut self) -> Option<AgentEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::Starting => self.start().await,
                Phase::AwaitingDecision => self.decide().await,
                Phase::IssuingSql { raw, sql } => self.issue_sql(raw, sql).await,
                Phase::Finished => return None,
            }
        }
    }

    fn finish(&mut self, event: AgentEvent) {
        tracing::info!(steps = self.step, outcome = %event, "sql agent run finished");
        self.pending.push_back(event);
        self.phase = Phase::Finished;
    }

    async fn start(&mut self) {
        tracing::info!(db = %self.db_path.display(), "starting sql agent run");

        let schema_context = load_schema(self.db_path.clone()).await;
        if schema_context.is_empty() {
            self.finish(AgentEvent::Error(AgentFailure::SchemaUnavailable));
            return;
        }

        let system_prompt = generate_system_prompt(&schema_context);
        self.conversation = Some(Conversation::new(
            system_prompt,
            std::mem::take(&mut self.question),
        ));
        self.phase = Phase::AwaitingDecision;
    }

    async fn decide(&mut self) {
        if self.step >= self.config.max_steps {
            self.finish(AgentEvent::Error(AgentFailure::StepLimitExceeded));
            return;
        }
        self.step += 1;

        let Some(conversation) = self.conversation.as_mut() else {
            self.phase = Phase::Finished;
            return;
        };

        let options = CompletionOptions {
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            json_mode: true,
        };
        let raw = complete_json(
            self.client.as_ref(),
            &self.retry_policy,
            conversation,
            &options,
        )
        .await;

        match Decision::parse(&raw) {
            Ok(decision) => {
                if let Some(thought) = decision.thought() {
                    self.pending.push_back(AgentEvent::Thought(thought.to_string()));
                }

                match decision {
                    Decision::Sql { sql, .. } => {
                        tracing::debug!(step = self.step, sql = %sql, "model issued sql");
                        self.pending.push_back(AgentEvent::ExecutingSql(sql.clone()));
                        self.phase = Phase::IssuingSql { raw, sql };
                    }
                    Decision::Answer { content, .. } => {
                        tracing::debug!(step = self.step, "model answered");
                        self.finish(AgentEvent::FinalAnswer(content));
                    }
                }
            }
            Err(DecisionError::InvalidJson { raw }) => {
                tracing::warn!(step = self.step, "model reply is not a JSON object");
                self.pending.push_back(AgentEvent::Debug(format!(
                    "Failed to parse JSON response: {}",
                    raw
                )));
                conversation.push_user(prompt::INVALID_JSON_NOTICE);
                self.phase = Phase::AwaitingDecision;
            }
            Err(DecisionError::UnknownType { kind, thought }) => {
                let kind = kind.unwrap_or_else(|| "missing".to_string());
                tracing::warn!(step = self.step, kind = %kind, "model reply has no usable type");
                if let Some(thought) = thought {
                    self.pending.push_back(AgentEvent::Thought(thought));
                }
                self.pending
                    .push_back(AgentEvent::Debug(format!("Unknown response type: {}", kind)));
                conversation.push_user(prompt::UNKNOWN_TYPE_NOTICE);
                self.phase = Phase::AwaitingDecision;
            }
        }
    }

    async fn issue_sql(&mut self, raw: String, sql: String) {
        let db_path = self.db_path.clone();
        let result = tokio::task::spawn_blocking(move || run_sql(&db_path, &sql))
            .await
            .unwrap_or_else(|e| QueryResult::error(format!("SQL execution task failed: {}", e)));

        let feedback = feedback::summarize(&result, self.config.preview_rows);
        tracing::debug!(step = self.step, rows = result.row_count(), "sql step complete");

        if let Some(conversation) = self.conversation.as_mut() {
            conversation.push_assistant(raw);
            conversation.push_user(feedback.message);
        }
        self.pending.push_back(feedback.event);
        self.phase = Phase::AwaitingDecision;
    }
}
