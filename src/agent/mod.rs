//! The directive loop.
//!
//! Each pass builds a prompt from the system prompt and the growing query,
//! asks the model for one line, parses it into a [`Directive`], and acts on
//! it: tool calls go through the [`Dispatcher`] and their results are folded
//! into the history that feeds the next query. The loop ends on
//! `COMPLETE_RUN`, at the iteration cap, or on the first error.

pub mod prompt;
pub mod state;

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::constants::{GENERATION_TIMEOUT_SECS, MAX_ITERATIONS, PAINT_SETTLE_DELAY_MS};
use crate::directive::{select_line, Directive};
use crate::error::AgentError;
use crate::output::Renderer;
use crate::provider::LanguageModel;
use crate::tools::{Dispatcher, ToolCatalog, ToolSession};

pub use state::{IterationState, RunOutcome, StopReason};

/// Knobs for a single run.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub task: String,
    pub max_iterations: usize,
    pub generation_timeout: Duration,
    pub settle_delay: Duration,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            task: crate::constants::DEFAULT_TASK.to_string(),
            max_iterations: MAX_ITERATIONS,
            generation_timeout: Duration::from_secs(GENERATION_TIMEOUT_SECS),
            settle_delay: Duration::from_millis(PAINT_SETTLE_DELAY_MS),
        }
    }
}

impl AgentOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            task: config.task(),
            max_iterations: config.max_iterations(),
            generation_timeout: config.generation_timeout(),
            settle_delay: config.settle_delay(),
        }
    }
}

/// Fetches the session's tool catalog and runs the loop against it.
///
/// # Errors
///
/// Only failing to list tools is an `Err`; everything that goes wrong
/// inside the loop is reported through [`RunOutcome::stop_reason`].
pub async fn run(
    model: &dyn LanguageModel,
    session: &mut dyn ToolSession,
    renderer: &mut dyn Renderer,
    options: &AgentOptions,
) -> Result<RunOutcome> {
    let tools = session
        .list_tools()
        .await
        .context("Failed to list tools from tool server")?;
    info!("retrieved {} tools", tools.len());

    let dispatcher =
        Dispatcher::new(ToolCatalog::from_wire(&tools)).with_settle_delay(options.settle_delay);
    Ok(agent_loop(model, session, &dispatcher, renderer, options).await)
}

/// Runs directive passes until completion, the cap, or an error.
pub async fn agent_loop(
    model: &dyn LanguageModel,
    session: &mut dyn ToolSession,
    dispatcher: &Dispatcher,
    renderer: &mut dyn Renderer,
    options: &AgentOptions,
) -> RunOutcome {
    let system_prompt = prompt::system_prompt(dispatcher.catalog());
    let mut state = IterationState::new(options.task.as_str());

    let stop_reason = loop {
        if state.iteration >= options.max_iterations {
            info!("iteration cap of {} reached", options.max_iterations);
            break StopReason::IterationCap;
        }
        let n = state.begin_iteration();
        renderer.iteration_start(n, options.max_iterations);

        let full_prompt = prompt::compose(&system_prompt, state.next_query());
        let response =
            match generate_with_timeout(model, &full_prompt, options.generation_timeout).await {
                Ok(text) => text,
                Err(err) => {
                    renderer.render_error(&err.to_string());
                    break StopReason::Aborted(err);
                }
            };
        let response = response.trim();
        renderer.model_response(response);

        match Directive::classify(select_line(response)) {
            Directive::FunctionCall { kind, tool, args } => {
                debug!(?kind, tool = %tool, ?args, "parsed tool call");
                renderer.tool_start(&tool, &args);
                match dispatcher.dispatch(session, &tool, &args).await {
                    Ok(dispatch) => {
                        renderer.tool_result(&dispatch.tool, &dispatch.output.to_string());
                        state.record_dispatch(dispatch);
                    }
                    Err(err) => {
                        state.record_error(&err);
                        renderer.render_error(&err.to_string());
                        break StopReason::Aborted(err);
                    }
                }
            }
            Directive::FinalAnswer { value, line } => {
                renderer.final_answer(&value);
                state.record_final_answer(&value, &line);
            }
            Directive::CompleteRun => {
                info!("model signalled COMPLETE_RUN at iteration {n}");
                break StopReason::Completed;
            }
            Directive::Unrecognized { line, reason } => {
                warn!("ignoring unrecognized response at iteration {n}: {reason}");
                renderer.unrecognized(&line);
            }
        }
    };

    let outcome = state.finish(stop_reason);
    renderer.render_done(&outcome);
    outcome
}

/// One generation call under a bounded wait. No retries.
async fn generate_with_timeout(
    model: &dyn LanguageModel,
    prompt: &str,
    limit: Duration,
) -> Result<String, AgentError> {
    debug!("starting LLM generation");
    match tokio::time::timeout(limit, model.generate(prompt)).await {
        Ok(Ok(text)) => {
            debug!(response = %text, "LLM generation completed");
            Ok(text)
        }
        Ok(Err(err)) => Err(AgentError::GenerationFailure(format!("{err:#}"))),
        Err(_) => Err(AgentError::GenerationTimeout {
            secs: limit.as_secs_f64(),
        }),
    }
}

#[cfg(test)]
mod tests;
