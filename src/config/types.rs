//! Struct definitions and serde defaults for tally configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for tally, deserialized from `config.toml`.
///
/// Fields use serde defaults so tally can run with sensible defaults
/// when no config file exists.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Default model identifier (e.g. `"gemini-2.0-flash"`).
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Default provider name (e.g., "gemini", "openai").
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Agent loop settings.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Tool server launch settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Returns the default model identifier.
///
/// Used by serde's `#[serde(default)]` attribute during deserialization.
pub(super) fn default_model() -> String {
    crate::constants::DEFAULT_MODEL.to_string()
}

/// Provider-specific configuration map.
///
/// Each field corresponds to a supported LLM provider. Only providers
/// the user has configured will be `Some`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    /// Configuration for the Google Gemini API provider.
    pub gemini: Option<ProviderEntry>,
    /// Configuration for the OpenAI API provider.
    pub openai: Option<ProviderEntry>,
    /// Configuration for the Anthropic API provider.
    pub anthropic: Option<ProviderEntry>,
    /// Configuration for the local Ollama provider.
    pub ollama: Option<ProviderEntry>,
    /// Configuration for the OpenRouter API provider.
    pub openrouter: Option<ProviderEntry>,
}

/// Connection details for a single LLM provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderEntry {
    /// API key for authentication. Can also be set via environment variables.
    pub api_key: Option<String>,
    /// Custom base URL for the provider's API (useful for proxies or self-hosted instances).
    pub base_url: Option<String>,
    /// Model identifier to use with this provider, overriding the global default.
    pub model: Option<String>,
}

/// Agent loop tuning. Unset fields fall back to the constants in
/// [`crate::constants`].
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct AgentConfig {
    /// Task statement given to the model on the first iteration.
    pub task: Option<String>,
    /// Maximum number of loop passes.
    pub max_iterations: Option<usize>,
    /// Bounded wait for each generation call.
    pub generation_timeout_secs: Option<u64>,
    /// Pause after opening the paint application.
    pub settle_delay_ms: Option<u64>,
}

/// How to launch the MCP tool server.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Executable to spawn.
    pub command: Option<String>,
    /// Arguments passed to `command`.
    pub args: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            provider: ProviderConfig::default(),
            default_provider: None,
            agent: AgentConfig::default(),
            server: ServerConfig::default(),
        }
    }
}
