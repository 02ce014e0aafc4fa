use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TheramindConfig {
    pub llm: LlmConfig,
    pub memory: MemoryConfig,
    pub chat: ChatConfig,
}

impl TheramindConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: TheramindConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("OPENROUTER_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.llm.timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("MEMORY_SUMMARY_THRESHOLD") {
            if let Ok(n) = v.parse() {
                self.memory.summary_threshold = n;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Bearer key for the completion service. When absent, every generation
    /// attempt fails deterministically and the engine falls back to a canned line.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    /// Per-attempt request timeout.
    pub timeout_secs: u64,
    /// Retries after the first attempt.
    pub retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.65,
            top_p: 0.9,
            presence_penalty: 0.3,
            timeout_secs: 12,
            retries: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// User turns per summarization cycle.
    pub summary_threshold: usize,
    /// Maximum summaries injected into the prompt.
    pub top_k: usize,
    /// Hard cap on a stored summary's length.
    pub summary_max_len: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            summary_threshold: 6,
            top_k: 3,
            summary_max_len: 800,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Hard cap on an inbound user message.
    pub max_message_len: usize,
    /// Raw turns forwarded when remote processing is consented to.
    pub history_window: usize,
    /// Turns folded into the recap when consent is withheld.
    pub recap_window: usize,
    /// Per-message cap inside the forwarded window.
    pub per_message_max: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_len: 2000,
            history_window: 18,
            recap_window: 6,
            per_message_max: 1200,
        }
    }
}
