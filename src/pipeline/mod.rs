//! Six-stage document processing pipeline
//!
//! The orchestrator runs the ordered generative stages through the refinement
//! loop, merging each stage's typed increment into an ephemeral processing
//! context, and finalizes by persisting requirements with their attached test
//! cases. Failure is fail-fast: a stage that exhausts its loop aborts the
//! run and marks the document errored.

pub mod context;
pub mod orchestrator;
pub mod stages;

pub use context::{FinalReview, ProcessingContext, StageIncrement};
pub use orchestrator::{PipelineConfig, ProcessingPipeline, StartAck};
pub use stages::{default_strategies, StageStrategy};
