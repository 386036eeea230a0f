//! Default endpoints and model IDs for the supported backends

/// Groq (OpenAI-compatible endpoint)
pub mod groq {
    pub const BASE_URL: &str = "https://api.groq.com/openai/v1";

    /// GPT-OSS 120B served by Groq; supports JSON object mode
    pub const GPT_OSS_120B_ID: &str = "openai/gpt-oss-120b";
}

/// OpenAI
pub mod openai {
    pub const BASE_URL: &str = "https://api.openai.com/v1";

    pub const GPT_4O_MINI_ID: &str = "gpt-4o-mini";
}

/// Ollama
pub mod ollama {
    pub const BASE_URL: &str = "http://localhost:11434";

    pub const LLAMA_3_1_ID: &str = "llama3.1";
}
