//! # askdb LLM SDK
//!
//! Minimal chat-completion clients behind a single provider-agnostic trait,
//! [`client::LlmClient`]. Two backends are provided:
//!
//! - [`openai::OpenAIClient`] for any OpenAI-compatible `/chat/completions`
//!   endpoint (OpenAI, Groq, vLLM, ...)
//! - [`ollama::OllamaClient`] for a local Ollama server
//!
//! Both honour [`types::ResponseFormat::JsonObject`] so callers can ask for a
//! single JSON object as the assistant reply.
//!
//! ## Example
//!
//! ```rust,no_run
//! use askdb_llm_sdk::client::LlmClient;
//! use askdb_llm_sdk::openai::OpenAIClient;
//! use askdb_llm_sdk::types::{CompletionRequest, Message, ResponseFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenAIClient::new("your-groq-key")?
//!         .with_base_url("https://api.groq.com/openai/v1")
//!         .with_model("openai/gpt-oss-120b");
//!
//!     let request = CompletionRequest {
//!         messages: vec![
//!             Message::system("Reply with a JSON object."),
//!             Message::user("Say hello"),
//!         ],
//!         max_tokens: 256,
//!         model: client.model_name().to_string(),
//!         temperature: None,
//!         response_format: Some(ResponseFormat::JsonObject),
//!     };
//!
//!     let response = client.complete(request).await?;
//!     println!("{}", response.content);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod ollama;
pub mod openai;
pub mod providers;
pub mod types;
