use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Tuning knobs for one agent run
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Completion rounds before giving up
    pub max_steps: usize,
    /// Rows echoed back to the model when a query returns more
    pub preview_rows: usize,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            preview_rows: 10,
            max_tokens: 4000,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Provider {
    /// Any OpenAI-compatible `/chat/completions` endpoint (Groq by default)
    #[default]
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "ollama")]
    Ollama,
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "groq" => Ok(Provider::OpenAI),
            "ollama" => Ok(Provider::Ollama),
            other => Err(format!(
                "Unknown provider '{}'. Expected 'openai' or 'ollama'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: Provider,
    /// Overrides the provider's default endpoint
    pub base_url: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAI,
            base_url: None,
            model: askdb_llm_sdk::models::groq::GPT_OSS_120B_ID.to_string(),
            api_key: None,
        }
    }
}

impl LlmSettings {
    pub fn effective_base_url(&self) -> &str {
        match (&self.base_url, self.provider) {
            (Some(url), _) => url,
            (None, Provider::OpenAI) => askdb_llm_sdk::models::groq::BASE_URL,
            (None, Provider::Ollama) => askdb_llm_sdk::models::ollama::BASE_URL,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub agent: AgentConfig,
    pub database: DatabaseSettings,
}

impl Settings {
    /// Load settings from a TOML file and `ASKDB_*` environment variables.
    ///
    /// An explicit `path` must exist; the default location
    /// (`<config dir>/askdb/askdb.toml`) is optional. Environment variables use
    /// `__` between sections, e.g. `ASKDB_LLM__MODEL` or `ASKDB_AGENT__MAX_STEPS`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(default_path) = get_config_path() {
                    builder = builder.add_source(File::from(default_path).required(false));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("ASKDB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if settings.llm.api_key.is_none() {
            settings.llm.api_key = ["GROQ_API_KEY", "OPENAI_API_KEY"]
                .iter()
                .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()));
        }

        if let Some(db_path) = settings.database.path.take() {
            settings.database.path = Some(expand_home(db_path));
        }

        Ok(settings)
    }
}

pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("askdb").join("askdb.toml"))
}

fn expand_home(path: PathBuf) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path,
    }
}
