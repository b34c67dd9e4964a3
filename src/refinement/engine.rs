//! Refinement loop engine
//!
//! Generic retry-until-valid loop around one model invocation per iteration.
//! Each prompt carries the task, the serialized input, the previous candidate,
//! the previous validation errors, and a trailing window of recent attempt
//! summaries so the prompt cannot grow without bound. Invocation failures are
//! retried inside the loop; only iteration exhaustion escalates.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::errors::{PipelineError, Result};
use crate::llm::{ChatClient, ChatMessage, ChatOptions};
use crate::refinement::interpreter::interpret;
use crate::refinement::signal::contains_completion_signal;
use crate::telemetry::{IterationEvent, ProgressHook};
use crate::validation::ValidationResult;

/// Default iteration budget per loop
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Fixed pause between iterations, backpressure against rate limits.
/// Constant regardless of error type.
const ITERATION_PAUSE: Duration = Duration::from_millis(100);

/// How many previous attempt summaries a prompt carries
const ATTEMPT_WINDOW: usize = 3;

/// Per-call options for one refinement run
pub struct RefineOptions {
    /// Stage id reported to the progress hook
    pub stage_id: u8,

    pub max_iterations: usize,

    /// Phrase the model must emit (promise-wrapped) to signal completion
    pub completion_phrase: String,

    /// Fixed system message for every iteration
    pub system_prompt: String,

    pub chat: ChatOptions,

    /// Scores a candidate output; errors feed the next iteration's prompt
    pub validate: Arc<dyn Fn(&Value) -> ValidationResult + Send + Sync>,
}

impl RefineOptions {
    /// Options with the default iteration budget and generation settings
    pub fn new(
        stage_id: u8,
        completion_phrase: impl Into<String>,
        system_prompt: impl Into<String>,
        validate: Arc<dyn Fn(&Value) -> ValidationResult + Send + Sync>,
    ) -> Self {
        Self {
            stage_id,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            completion_phrase: completion_phrase.into(),
            system_prompt: system_prompt.into(),
            chat: ChatOptions::default(),
            validate,
        }
    }
}

/// Retry-until-valid loop around a chat model
pub struct RefinementLoop {
    client: Arc<dyn ChatClient>,
    hook: Arc<dyn ProgressHook>,
    pause: Duration,
    verbose: bool,
}

impl RefinementLoop {
    /// Create a loop with the default inter-iteration pause
    pub fn new(client: Arc<dyn ChatClient>, hook: Arc<dyn ProgressHook>) -> Self {
        Self {
            client,
            hook,
            pause: ITERATION_PAUSE,
            verbose: false,
        }
    }

    /// Override the inter-iteration pause (tests use zero)
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Enable verbose stderr logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Iteratively refine output for `task` until validation accepts it.
    ///
    /// Returns the accepted candidate, or `MaxIterationsExceeded` carrying
    /// the most recent error list once the budget is spent.
    pub async fn refine(&self, task: &str, input: &Value, options: &RefineOptions) -> Result<Value> {
        let mut output: Option<Value> = None;
        let mut errors: Vec<String> = Vec::new();
        let mut attempts: Vec<String> = Vec::new();

        for iteration in 1..=options.max_iterations {
            let prompt = build_prompt(task, input, output.as_ref(), &errors, &attempts);
            let messages = vec![
                ChatMessage::system(options.system_prompt.clone()),
                ChatMessage::user(prompt),
            ];

            match self.client.chat(&messages, &options.chat).await {
                Ok(response) => {
                    let candidate = interpret(&response.content);

                    if contains_completion_signal(&response.content, &options.completion_phrase) {
                        let validation = (options.validate)(&candidate);
                        if validation.valid {
                            self.hook.on_iteration(IterationEvent {
                                stage: options.stage_id,
                                iteration,
                                error_count: 0,
                            });
                            return Ok(candidate);
                        }

                        errors = validation.errors;
                        attempts.push(format!("Iteration {}: {}", iteration, errors.join("; ")));
                    } else {
                        errors = vec!["Completion signal missing from response".to_string()];
                        attempts.push(format!("Iteration {}: missing completion signal", iteration));
                    }

                    output = Some(candidate);
                }
                Err(err) => {
                    // Invocation failures are retried, not fatal; the previous
                    // candidate stays in the prompt context
                    errors = vec![format!("Error in iteration {}: {}", iteration, err)];
                    attempts.push(errors[0].clone());
                }
            }

            self.hook.on_iteration(IterationEvent {
                stage: options.stage_id,
                iteration,
                error_count: errors.len(),
            });

            if self.verbose {
                eprintln!(
                    "[stage {}] iteration {}/{} - {}",
                    options.stage_id,
                    iteration,
                    options.max_iterations,
                    errors.join("; ")
                );
            }

            sleep(self.pause).await;
        }

        Err(PipelineError::MaxIterationsExceeded {
            iterations: options.max_iterations,
            last_errors: errors,
        })
    }
}

/// Assemble the user prompt for one iteration
fn build_prompt(
    task: &str,
    input: &Value,
    current_output: Option<&Value>,
    errors: &[String],
    attempts: &[String],
) -> String {
    let mut prompt = format!("Task: {}\n\n", task);

    prompt.push_str(&format!(
        "Input:\n{}\n\n",
        serde_json::to_string_pretty(input).unwrap_or_default()
    ));

    if let Some(current) = current_output {
        prompt.push_str(&format!(
            "Current Output:\n{}\n\n",
            serde_json::to_string_pretty(current).unwrap_or_default()
        ));
    }

    if !errors.is_empty() {
        let numbered: Vec<String> = errors
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{}. {}", i + 1, e))
            .collect();
        prompt.push_str(&format!(
            "Validation Errors (fix these):\n{}\n\n",
            numbered.join("\n")
        ));
    }

    if !attempts.is_empty() {
        let window = &attempts[attempts.len().saturating_sub(ATTEMPT_WINDOW)..];
        prompt.push_str(&format!("Previous Attempts:\n{}\n\n", window.join("\n")));
    }

    prompt.push_str("Please fix any issues and ensure the output passes validation.");
    prompt
}
