//! LLM provider client.
//!
//! Contains the [`Provider`] struct which wraps rig-core provider clients
//! behind enum dispatch, keeping provider-specific details out of the agent
//! loop. Supports Gemini, Anthropic, OpenAI, OpenRouter, and Ollama.

use anyhow::{Context, Result};
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::{anthropic, gemini, openai, openrouter};
use tracing::warn;

use super::kind::ProviderKind;
use super::resolve::ModelSelection;
use super::LanguageModel;
use crate::config::Config;

/// Internal enum wrapping provider-specific clients.
enum ClientKind {
    Gemini(gemini::Client),
    Anthropic(anthropic::Client),
    OpenAI(openai::Client),
    OpenRouter(openrouter::Client),
    Ollama(openai::Client),
}

/// A configured LLM provider ready to handle completion requests.
///
/// Wraps a rig-core provider client and the target model name. Agents are
/// constructed on each call since they are cheap to create.
pub struct Provider {
    client: ClientKind,
    model: String,
}

/// Builds a preamble-less agent from the given client and model, then
/// executes the provided block with the agent bound to `$agent`.
///
/// The agent's system prompt travels inside the prompt text itself, so no
/// preamble is attached.
macro_rules! with_agent {
    ($client:expr, $model:expr, |$agent:ident| $body:expr) => {{
        let $agent = $client
            .agent($model)
            .max_tokens(crate::constants::MAX_TOKENS)
            .build();
        $body
    }};
}

/// Dispatches an operation across provider-specific clients.
///
/// Matches on [`ClientKind`] and executes the same block for each variant,
/// letting the compiler monomorphize per provider.
macro_rules! dispatch {
    ($self:expr, |$client:ident| $body:expr) => {
        match &$self.client {
            ClientKind::Gemini($client) => $body,
            ClientKind::Anthropic($client) => $body,
            ClientKind::OpenAI($client) => $body,
            ClientKind::OpenRouter($client) => $body,
            ClientKind::Ollama($client) => $body,
        }
    };
}

impl Provider {
    /// Creates a new [`Provider`] from the loaded application config.
    ///
    /// Resolves the API key through tally's config precedence chain
    /// (env var → config file → substitution). A missing key is not fatal
    /// here: the client is built with an empty key and the first generation
    /// call reports the failure.
    ///
    /// # Errors
    ///
    /// Returns an error if client construction fails.
    pub fn from_config(config: &Config, selection: &ModelSelection) -> Result<Self> {
        let client = match selection.provider {
            ProviderKind::Gemini => {
                let api_key = api_key_or_empty(config, selection.provider);
                ClientKind::Gemini(
                    gemini::Client::new(&api_key).context("Failed to create Gemini client")?,
                )
            }
            ProviderKind::Anthropic => {
                let api_key = api_key_or_empty(config, selection.provider);
                ClientKind::Anthropic(
                    anthropic::Client::new(&api_key)
                        .context("Failed to create Anthropic client")?,
                )
            }
            ProviderKind::OpenAI => {
                let api_key = api_key_or_empty(config, selection.provider);
                ClientKind::OpenAI(
                    openai::Client::new(&api_key).context("Failed to create OpenAI client")?,
                )
            }
            ProviderKind::OpenRouter => {
                let api_key = api_key_or_empty(config, selection.provider);
                ClientKind::OpenRouter(
                    openrouter::Client::new(&api_key)
                        .context("Failed to create OpenRouter client")?,
                )
            }
            ProviderKind::Ollama => {
                let base_url = config
                    .provider
                    .ollama
                    .as_ref()
                    .and_then(|o| o.base_url.as_deref())
                    .unwrap_or(crate::constants::OLLAMA_DEFAULT_BASE_URL);
                ClientKind::Ollama(
                    openai::Client::builder()
                        .api_key("ollama")
                        .base_url(format!("{}/v1", base_url))
                        .build()
                        .context("Failed to create Ollama client")?,
                )
            }
        };

        Ok(Self {
            client,
            model: selection.model.clone(),
        })
    }

    /// Sends a non-streaming prompt to the LLM and returns the full response.
    pub async fn prompt(&self, prompt_text: &str) -> Result<String> {
        dispatch!(self, |client| {
            let response = with_agent!(client, &self.model, |agent| {
                agent.prompt(prompt_text).await
            });
            Ok(response.context("LLM API call failed")?)
        })
    }
}

#[async_trait::async_trait(?Send)]
impl LanguageModel for Provider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompt(prompt).await
    }
}

fn api_key_or_empty(config: &Config, provider: ProviderKind) -> String {
    config.resolve_api_key(provider.key()).unwrap_or_else(|| {
        warn!(
            "no API key found for {}; set {}_API_KEY or configure it in config.toml",
            provider.key(),
            provider.key().to_uppercase()
        );
        String::new()
    })
}
