//! LLM provider abstraction for tally.
//!
//! Wraps rig-core's provider clients behind a [`Provider`] struct with enum
//! dispatch, keeping provider-specific details out of the agent loop. Supports
//! Gemini, Anthropic, OpenAI, OpenRouter, and Ollama (local) via [`ProviderKind`].

mod client;
mod kind;
mod resolve;

use anyhow::Result;

pub use client::Provider;
#[allow(unused_imports)]
pub use kind::{default_model_for, ProviderKind};
pub use resolve::resolve_model;

/// Anything that can turn a prompt into generated text.
///
/// The agent loop only needs one-shot generation; [`Provider`] implements
/// it over rig-core and tests substitute scripted fakes.
#[async_trait::async_trait(?Send)]
pub trait LanguageModel {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
