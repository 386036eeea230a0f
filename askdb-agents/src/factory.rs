use std::path::PathBuf;
use std::sync::Arc;

use askdb_llm_sdk::client::LlmClient;
use askdb_llm_sdk::ollama::OllamaClient;
use askdb_llm_sdk::openai::OpenAIClient;

use crate::config::{LlmSettings, Provider, Settings};
use crate::sql_agent::SqlAgent;

/// Build the provider client described by `settings`
pub fn create_llm_client(settings: &LlmSettings) -> anyhow::Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match settings.provider {
        Provider::OpenAI => {
            let api_key = settings.api_key.as_deref().unwrap_or_default();
            if api_key.is_empty() {
                anyhow::bail!(
                    "No API key configured. Set GROQ_API_KEY, OPENAI_API_KEY or llm.api_key in the config file"
                );
            }
            Arc::new(
                OpenAIClient::new(api_key)?
                    .with_base_url(settings.effective_base_url())
                    .with_model(&settings.model),
            )
        }
        Provider::Ollama => Arc::new(
            OllamaClient::new()?
                .with_base_url(settings.effective_base_url())
                .with_model(&settings.model),
        ),
    };

    tracing::debug!(
        provider = client.provider_name(),
        model = client.model_name(),
        "created llm client"
    );
    Ok(client)
}

/// Create a [`SqlAgent`] over `db_path` using the LLM and agent sections of `settings`
pub fn create_sql_agent(
    settings: &Settings,
    db_path: impl Into<PathBuf>,
) -> anyhow::Result<SqlAgent> {
    let client = create_llm_client(&settings.llm)?;
    Ok(SqlAgent::new(client, db_path).with_config(settings.agent.clone()))
}
