//! Per-run loop state and the outcome it folds into.

use crate::constants::NEXT_STEP_SUFFIX;
use crate::error::AgentError;
use crate::tools::{Dispatch, ToolOutput};

use super::prompt;

/// Why a run ended.
#[derive(Debug)]
pub enum StopReason {
    /// The model sent `COMPLETE_RUN`.
    Completed,
    /// The iteration cap was reached first.
    IterationCap,
    /// Generation or dispatch failed.
    Aborted(AgentError),
}

impl StopReason {
    #[cfg(test)]
    pub fn error(&self) -> Option<&AgentError> {
        match self {
            StopReason::Aborted(err) => Some(err),
            _ => None,
        }
    }
}

/// What a finished run leaves behind.
#[derive(Debug)]
pub struct RunOutcome {
    /// Loop passes started, including the one that stopped the run.
    pub iterations: usize,
    pub stop_reason: StopReason,
    pub history: Vec<String>,
    pub last_result: Option<ToolOutput>,
    pub final_answer: Option<String>,
}

/// Mutable state of one run.
///
/// Created fresh by every run and consumed by [`IterationState::finish`],
/// so nothing carries over between runs.
#[derive(Debug)]
pub struct IterationState {
    /// 1-based number of the pass in progress; 0 before the first pass.
    pub iteration: usize,
    pub last_result: Option<ToolOutput>,
    pub history: Vec<String>,
    pub final_answer: Option<String>,
    task: String,
    query: String,
}

impl IterationState {
    pub fn new(task: impl Into<String>) -> Self {
        let task = task.into();
        Self {
            iteration: 0,
            last_result: None,
            history: Vec::new(),
            final_answer: None,
            query: task.clone(),
            task,
        }
    }

    /// Starts the next pass and returns its 1-based number.
    pub fn begin_iteration(&mut self) -> usize {
        self.iteration += 1;
        self.iteration
    }

    /// Builds the query for the pass about to run.
    ///
    /// Until a result exists the bare task is used. Afterwards the previous
    /// query grows by the full history and the next-step suffix each pass.
    pub fn next_query(&mut self) -> &str {
        if self.last_result.is_none() {
            self.query = self.task.clone();
        } else {
            self.query = format!(
                "{}\n\n{}{}",
                self.query,
                self.history.join(" "),
                NEXT_STEP_SUFFIX
            );
        }
        &self.query
    }

    pub fn record_dispatch(&mut self, dispatch: Dispatch) {
        self.history.push(prompt::call_entry(
            self.iteration,
            &dispatch.tool,
            &dispatch.arguments,
            &dispatch.output,
        ));
        self.last_result = Some(dispatch.output);
    }

    /// Queues the paint instructions. The last dispatch result is kept; if
    /// there is none yet the answer stands in for it so the instruction
    /// reaches the next prompt.
    pub fn record_final_answer(&mut self, value: &str, line: &str) {
        self.history
            .push(prompt::final_answer_entry(self.iteration, line));
        if self.last_result.is_none() {
            self.last_result = Some(ToolOutput::Text(value.to_string()));
        }
        self.final_answer = Some(value.to_string());
    }

    pub fn record_error(&mut self, err: &AgentError) {
        self.history.push(prompt::error_entry(self.iteration, err));
    }

    pub fn finish(self, stop_reason: StopReason) -> RunOutcome {
        RunOutcome {
            iterations: self.iteration,
            stop_reason,
            history: self.history,
            last_result: self.last_result,
            final_answer: self.final_answer,
        }
    }
}
