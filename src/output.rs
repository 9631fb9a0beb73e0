//! Output rendering abstraction for tally.
//!
//! Defines the [`Renderer`] trait that decouples the agent loop from the
//! display layer. [`StdoutRenderer`] prints progress to the terminal.

use colored::Colorize;

use crate::agent::{RunOutcome, StopReason};

/// Longest model response echoed before it is elided.
const MAX_ECHO_CHARS: usize = 500;

/// Receives progress events from the agent loop.
pub trait Renderer {
    /// A new loop pass is starting.
    fn iteration_start(&mut self, iteration: usize, max_iterations: usize);

    /// The model's raw (trimmed) reply.
    fn model_response(&mut self, text: &str);

    /// A tool call is about to be dispatched.
    fn tool_start(&mut self, name: &str, args: &[String]);

    /// A tool call returned.
    fn tool_result(&mut self, name: &str, result: &str);

    /// The model reported its final answer.
    fn final_answer(&mut self, value: &str);

    /// The reply matched no directive and was ignored.
    fn unrecognized(&mut self, line: &str);

    /// Called when an error ends the run.
    fn render_error(&mut self, err: &str);

    /// Called once the run is over.
    fn render_done(&mut self, outcome: &RunOutcome);
}

/// Renders agent progress directly to stdout (errors to stderr).
pub struct StdoutRenderer;

impl StdoutRenderer {
    pub fn new() -> Self {
        Self
    }
}

fn elide(text: &str) -> String {
    match text.char_indices().nth(MAX_ECHO_CHARS) {
        Some((end, _)) => format!("{}…", &text[..end]),
        None => text.to_string(),
    }
}

impl Renderer for StdoutRenderer {
    fn iteration_start(&mut self, iteration: usize, max_iterations: usize) {
        println!();
        println!(
            "{}",
            format!("--- Iteration {iteration}/{max_iterations} ---").bold()
        );
    }

    fn model_response(&mut self, text: &str) {
        println!("{} {}", "llm:".dimmed(), elide(text));
    }

    fn tool_start(&mut self, name: &str, args: &[String]) {
        println!("{} {}({})", "→".cyan(), name.cyan().bold(), args.join(", "));
    }

    fn tool_result(&mut self, _name: &str, result: &str) {
        println!("{} {}", "←".green(), elide(result));
    }

    fn final_answer(&mut self, value: &str) {
        println!("{} {}", "final answer:".green().bold(), value.yellow());
    }

    fn unrecognized(&mut self, line: &str) {
        println!("{} {}", "ignored:".yellow(), elide(line).dimmed());
    }

    fn render_error(&mut self, err: &str) {
        eprintln!();
        eprintln!("{} {}", "error:".red().bold(), err);
    }

    fn render_done(&mut self, outcome: &RunOutcome) {
        println!();
        let summary = match &outcome.stop_reason {
            StopReason::Completed => "Task complete.".green().bold(),
            StopReason::IterationCap => "Stopped at the iteration cap.".yellow().bold(),
            StopReason::Aborted(_) => "Run aborted.".red().bold(),
        };
        println!(
            "{} {}",
            summary,
            format!("[{} iterations]", outcome.iterations).dimmed()
        );
    }
}
