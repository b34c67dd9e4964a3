//! Iterative refinement of model output
//!
//! A generic retry-until-valid loop around a chat model: build a prompt from
//! the task and previous failures, invoke the model, recover structured JSON
//! from the reply, check the completion signal, validate, and loop until the
//! output is accepted or the iteration budget runs out.

pub mod engine;
pub mod interpreter;
pub mod signal;

pub use engine::{RefineOptions, RefinementLoop, DEFAULT_MAX_ITERATIONS};
pub use interpreter::interpret;
pub use signal::{contains_completion_signal, strip_promise_tags, PROMISE_CLOSE, PROMISE_OPEN};
