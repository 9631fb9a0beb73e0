//! File loading and merging for tally configuration.

use anyhow::{Context, Result};
use std::fs;

use super::types::{default_model, AgentConfig, Config, ProviderConfig, ProviderEntry, ServerConfig};
use crate::constants::{
    DEFAULT_SERVER_ARGS, DEFAULT_SERVER_COMMAND, GENERATION_TIMEOUT_SECS, MAX_ITERATIONS,
};

impl Config {
    /// Loads the global config from `~/.config/tally/config.toml`.
    ///
    /// If no config file exists, creates one with sensible defaults
    /// (including `{env:VAR}` placeholders for API keys) and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = Self::default_toml();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            let config: Config = toml::from_str(&default_toml)
                .with_context(|| "Failed to parse default config".to_string())?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {:?}", path))?;
        Ok(config)
    }

    /// Contents written on first run.
    pub(super) fn default_toml() -> String {
        let args = DEFAULT_SERVER_ARGS
            .iter()
            .map(|a| format!("{a:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            r#"model = "{model}"

[provider]

[provider.gemini]
api_key = "{{env:GEMINI_API_KEY}}"

[provider.anthropic]
api_key = "{{env:ANTHROPIC_API_KEY}}"

[provider.openai]
api_key = "{{env:OPENAI_API_KEY}}"

[provider.openrouter]
api_key = "{{env:OPENROUTER_API_KEY}}"

[provider.ollama]
base_url = "http://localhost:11434"

[agent]
max_iterations = {max_iterations}
generation_timeout_secs = {timeout}

[server]
command = "{command}"
args = [{args}]
"#,
            model = default_model(),
            max_iterations = MAX_ITERATIONS,
            timeout = GENERATION_TIMEOUT_SECS,
            command = DEFAULT_SERVER_COMMAND,
        )
    }

    /// Look for tally.toml in current dir, then walk up to git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                let contents = fs::read_to_string(&candidate)?;
                let config: Config = toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config at {:?}", candidate))?;
                return Ok(Some(config));
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Merge project config over global config.
    /// Project values win when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        Config {
            model: if project.model != default_model() {
                project.model
            } else {
                global.model
            },
            provider: ProviderConfig {
                gemini: merge_entry(project.provider.gemini, global.provider.gemini),
                openai: merge_entry(project.provider.openai, global.provider.openai),
                anthropic: merge_entry(project.provider.anthropic, global.provider.anthropic),
                ollama: merge_entry(project.provider.ollama, global.provider.ollama),
                openrouter: merge_entry(project.provider.openrouter, global.provider.openrouter),
            },
            default_provider: project.default_provider.or(global.default_provider),
            agent: AgentConfig {
                task: project.agent.task.or(global.agent.task),
                max_iterations: project.agent.max_iterations.or(global.agent.max_iterations),
                generation_timeout_secs: project
                    .agent
                    .generation_timeout_secs
                    .or(global.agent.generation_timeout_secs),
                settle_delay_ms: project
                    .agent
                    .settle_delay_ms
                    .or(global.agent.settle_delay_ms),
            },
            server: ServerConfig {
                command: project.server.command.or(global.server.command),
                args: project.server.args.or(global.server.args),
            },
        }
    }
}

/// Field-wise merge of one provider table; project fields win.
fn merge_entry(project: Option<ProviderEntry>, global: Option<ProviderEntry>) -> Option<ProviderEntry> {
    match (project, global) {
        (Some(p), Some(g)) => Some(ProviderEntry {
            api_key: p.api_key.or(g.api_key),
            base_url: p.base_url.or(g.base_url),
            model: p.model.or(g.model),
        }),
        (p, g) => p.or(g),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_toml_parses() {
        let config: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.agent.max_iterations, Some(10));
        assert_eq!(config.server.command.as_deref(), Some("python"));
        assert_eq!(
            config.server.args,
            Some(vec!["mcp_paint_app/example2-3.py".to_string()])
        );
        assert_eq!(
            config.provider.gemini.unwrap().api_key.as_deref(),
            Some("{env:GEMINI_API_KEY}")
        );
    }

    #[test]
    fn test_merge_prefers_project_values() {
        let global: Config = toml::from_str(
            r#"
model = "gemini-1.5-pro"
[agent]
max_iterations = 10
generation_timeout_secs = 10
[server]
command = "python"
args = ["server.py"]
"#,
        )
        .unwrap();
        let project: Config = toml::from_str(
            r#"
[agent]
max_iterations = 4
task = "Add 2 and 3."
[server]
args = ["local_server.py"]
"#,
        )
        .unwrap();

        let merged = Config::merge(global, project);
        assert_eq!(merged.model, "gemini-1.5-pro");
        assert_eq!(merged.agent.max_iterations, Some(4));
        assert_eq!(merged.agent.generation_timeout_secs, Some(10));
        assert_eq!(merged.agent.task.as_deref(), Some("Add 2 and 3."));
        assert_eq!(merged.server.command.as_deref(), Some("python"));
        assert_eq!(merged.server.args, Some(vec!["local_server.py".to_string()]));
    }

    #[test]
    fn test_merge_combines_provider_tables() {
        let global: Config = toml::from_str(
            r#"
[provider.gemini]
api_key = "global-key"
base_url = "https://global.example"

[provider.openai]
api_key = "openai-key"
"#,
        )
        .unwrap();
        let project: Config = toml::from_str(
            r#"
[provider.gemini]
api_key = "project-key"

[provider.ollama]
base_url = "http://gpu-box:11434"
"#,
        )
        .unwrap();

        let merged = Config::merge(global, project);
        let gemini = merged.provider.gemini.unwrap();
        assert_eq!(gemini.api_key.as_deref(), Some("project-key"));
        assert_eq!(gemini.base_url.as_deref(), Some("https://global.example"));
        assert_eq!(
            merged.provider.openai.unwrap().api_key.as_deref(),
            Some("openai-key")
        );
        assert_eq!(
            merged.provider.ollama.unwrap().base_url.as_deref(),
            Some("http://gpu-box:11434")
        );
        assert!(merged.provider.anthropic.is_none());
    }
}
