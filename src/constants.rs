//! Centralized constants for tally.
//!
//! All magic numbers, default strings, and configuration constants live here
//! so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "tally";

/// Client version reported to tool servers during the handshake.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "tally.toml";

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV_VAR: &str = "TALLY_LOG";

/// Filter used when [`LOG_ENV_VAR`] is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "warn";

// --- Provider defaults ---

/// Default provider when none is configured.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Default LLM model identifier.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default LLM model identifier for Anthropic.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-6";

/// Default LLM model identifier for OpenAI.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";

/// Default LLM model identifier for OpenRouter.
pub const DEFAULT_OPENROUTER_MODEL: &str = "arcee-ai/trinity-large-preview:free";

/// Default base URL for local Ollama server.
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default LLM model identifier for Ollama.
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3";

/// Maximum tokens for LLM completions.
pub const MAX_TOKENS: u64 = 1024;

// --- Agent loop ---

/// Task statement used when neither the CLI nor the config supplies one.
pub const DEFAULT_TASK: &str = "Return the sum of first 20 Fibonacci numbers.";

/// Maximum number of loop passes before the run is cut off.
pub const MAX_ITERATIONS: usize = 10;

/// Bounded wait for a single generation call, in seconds.
pub const GENERATION_TIMEOUT_SECS: u64 = 10;

/// Pause after opening the paint application, in milliseconds.
pub const PAINT_SETTLE_DELAY_MS: u64 = 1000;

/// Tool-name prefix that triggers the settle pause.
pub const PAINT_OPEN_PREFIX: &str = "open_paint";

/// Suffix appended to the query once results start accumulating.
pub const NEXT_STEP_SUFFIX: &str = "  What should I do next?";

/// Canvas rectangle the model is told to draw: `(x1, y1, x2, y2)`.
pub const PAINT_RECTANGLE: (u32, u32, u32, u32) = (763, 595, 1788, 1123);

// --- Tool server ---

/// Default command used to launch the MCP tool server.
pub const DEFAULT_SERVER_COMMAND: &str = "python";

/// Default arguments passed to [`DEFAULT_SERVER_COMMAND`].
pub const DEFAULT_SERVER_ARGS: &[&str] = &["mcp_paint_app/example2-3.py"];

/// MCP protocol revision announced in `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// How long to wait for the server to exit after its stdin is closed.
pub const SERVER_SHUTDOWN_GRACE_MS: u64 = 2000;
