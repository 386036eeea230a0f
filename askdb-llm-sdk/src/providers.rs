//! Provider name constants
//!
//! This module defines canonical provider names used throughout the SDK

/// OpenAI-compatible chat completions provider (OpenAI, Groq, ...)
pub const OPENAI: &str = "openai";

/// Ollama local provider
pub const OLLAMA: &str = "ollama";
