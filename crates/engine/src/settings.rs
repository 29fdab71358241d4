//! Engine operational settings, loaded from the environment.

use crate::infrastructure::ollama::{
    DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL, DEFAULT_TIMEOUT_SECS,
};
use crate::infrastructure::resilient_llm::RetryConfig;

/// Operational knobs for the engine. Game-level options travel in
/// `GameConfig`; these configure transports and storage.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub llm_base_url: String,
    pub llm_model: String,
    /// Overall deadline for one LLM call, in seconds.
    pub llm_timeout_secs: u64,
    /// SQLite database path; `None` selects the in-memory gateway.
    pub database_path: Option<String>,
    pub retry: RetryConfig,
    /// Fixed RNG seed for reproducible sessions; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            llm_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            llm_model: DEFAULT_OLLAMA_MODEL.to_string(),
            llm_timeout_secs: DEFAULT_TIMEOUT_SECS,
            database_path: None,
            retry: RetryConfig::default(),
            rng_seed: None,
        }
    }
}

impl EngineSettings {
    /// Load settings from environment variables, falling back to defaults.
    ///
    /// Recognized: `OLLAMA_BASE_URL`, `OLLAMA_MODEL`,
    /// `QUESTWEAVER_LLM_TIMEOUT_SECS`, `QUESTWEAVER_DB_PATH`,
    /// `QUESTWEAVER_RNG_SEED`.
    pub fn from_env() -> Self {
        // A missing .env file is fine; explicit env always wins.
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        Self {
            llm_base_url: std::env::var("OLLAMA_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_model: std::env::var("OLLAMA_MODEL").unwrap_or(defaults.llm_model),
            llm_timeout_secs: std::env::var("QUESTWEAVER_LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.llm_timeout_secs),
            database_path: std::env::var("QUESTWEAVER_DB_PATH").ok(),
            retry: defaults.retry,
            rng_seed: std::env::var("QUESTWEAVER_RNG_SEED")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}
