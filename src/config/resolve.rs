//! Environment variable substitution, API key resolution, and typed
//! accessors with defaults.

use std::time::Duration;

use super::types::{Config, ProviderEntry};

use crate::constants::{
    DEFAULT_SERVER_ARGS, DEFAULT_SERVER_COMMAND, DEFAULT_TASK, GENERATION_TIMEOUT_SECS,
    MAX_ITERATIONS, PAINT_SETTLE_DELAY_MS,
};

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        self.model = Self::resolve_str(&self.model);
        if let Some(ref mut dp) = self.default_provider {
            *dp = Self::resolve_str(dp);
        }
        if let Some(ref mut task) = self.agent.task {
            *task = Self::resolve_str(task);
        }
        if let Some(ref mut command) = self.server.command {
            *command = Self::resolve_str(command);
        }
        if let Some(ref mut args) = self.server.args {
            for arg in args.iter_mut() {
                *arg = Self::resolve_str(arg);
            }
        }
        Self::resolve_provider_entry(&mut self.provider.gemini);
        Self::resolve_provider_entry(&mut self.provider.openai);
        Self::resolve_provider_entry(&mut self.provider.anthropic);
        Self::resolve_provider_entry(&mut self.provider.ollama);
        Self::resolve_provider_entry(&mut self.provider.openrouter);
    }

    /// Resolves `{env:VAR}` patterns in a single provider entry's `api_key` and `base_url`.
    fn resolve_provider_entry(entry: &mut Option<ProviderEntry>) {
        if let Some(ref mut e) = entry {
            if let Some(ref mut key) = e.api_key {
                *key = Self::resolve_str(key);
            }
            if let Some(ref mut url) = e.base_url {
                *url = Self::resolve_str(url);
            }
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        while let Some(start) = result.find("{env:") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 5..start + end];
                let value = std::env::var(var_name).unwrap_or_default();
                result = format!(
                    "{}{}{}",
                    &result[..start],
                    value,
                    &result[start + end + 1..]
                );
            } else {
                break;
            }
        }
        result
    }

    /// Resolve API key for a provider: env var first, then config value.
    /// Empty values count as missing.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        let env_key = format!("{}_API_KEY", provider.to_uppercase());
        if let Ok(val) = std::env::var(&env_key) {
            if !val.is_empty() {
                return Some(val);
            }
        }

        let entry = match provider {
            "gemini" => &self.provider.gemini,
            "openai" => &self.provider.openai,
            "anthropic" => &self.provider.anthropic,
            "ollama" => &self.provider.ollama,
            "openrouter" => &self.provider.openrouter,
            _ => &None,
        };
        entry
            .as_ref()
            .and_then(|e| e.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    /// Get the configured default provider name, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.default_provider.as_deref()
    }

    /// Get the model name from config, stripping provider prefix if present.
    /// Returns None if the model is the compile-time default (meaning user hasn't configured it).
    pub fn model_name(&self) -> Option<String> {
        let m = &self.model;
        if m == crate::constants::DEFAULT_MODEL {
            return None;
        }
        if let Some((_prov, model)) = m.split_once('/') {
            Some(model.to_string())
        } else {
            Some(m.to_string())
        }
    }

    /// Task statement for the first iteration.
    pub fn task(&self) -> String {
        self.agent
            .task
            .clone()
            .unwrap_or_else(|| DEFAULT_TASK.to_string())
    }

    /// Maximum number of loop passes.
    pub fn max_iterations(&self) -> usize {
        self.agent.max_iterations.unwrap_or(MAX_ITERATIONS)
    }

    /// Bounded wait for each generation call.
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(
            self.agent
                .generation_timeout_secs
                .unwrap_or(GENERATION_TIMEOUT_SECS),
        )
    }

    /// Pause after opening the paint application.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.agent.settle_delay_ms.unwrap_or(PAINT_SETTLE_DELAY_MS))
    }

    /// Command and arguments used to launch the tool server.
    pub fn server_command(&self) -> (String, Vec<String>) {
        let command = self
            .server
            .command
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVER_COMMAND.to_string());
        let args = self
            .server
            .args
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVER_ARGS.iter().map(|a| a.to_string()).collect());
        (command, args)
    }
}
