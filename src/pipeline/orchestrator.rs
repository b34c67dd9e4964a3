//! Pipeline orchestrator
//!
//! Sequences the six stages for one document: five refinement loops plus
//! finalization. Stage statuses move forward only; a failed loop marks its
//! stage and the document errored and nothing after it runs. Retries happen
//! inside a stage's loop, never across stages.
//!
//! Processing runs as a detached task. The triggering call returns as soon as
//! the task is scheduled, and starting an already processing or completed
//! document is an acknowledged no-op.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{PipelineError, Result};
use crate::ingest::{parse_pdf, DocumentSource};
use crate::llm::{ChatClient, ChatOptions};
use crate::pipeline::context::{FinalReview, ProcessingContext, StageIncrement};
use crate::pipeline::stages::{default_strategies, system_prompt, StageStrategy};
use crate::refinement::{RefineOptions, RefinementLoop};
use crate::store::DocumentStore;
use crate::telemetry::ProgressHook;
use crate::types::{Document, DocumentStatus, StageStatus, StatusReport};

/// Stage id of the finalization step
const FINALIZE_STAGE_ID: u8 = 6;

/// Outcome of a processing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAck {
    /// A background run was scheduled
    Started,

    /// A run is already underway; nothing scheduled
    AlreadyProcessing,

    /// The document is already fully processed; nothing scheduled
    AlreadyCompleted,
}

/// Tuning knobs for a pipeline instance
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Generation options used for every stage
    pub chat: ChatOptions,

    /// Pause between refinement iterations
    pub iteration_pause: Duration,

    /// Verbose stderr logging
    pub verbose: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chat: ChatOptions::default(),
            iteration_pause: Duration::from_millis(100),
            verbose: false,
        }
    }
}

/// Six-stage document processing pipeline
pub struct ProcessingPipeline {
    store: Arc<dyn DocumentStore>,
    source: Arc<dyn DocumentSource>,
    engine: RefinementLoop,
    strategies: Vec<Arc<dyn StageStrategy>>,
    config: PipelineConfig,
}

impl ProcessingPipeline {
    /// Create a pipeline over the given collaborators
    pub fn new(
        store: Arc<dyn DocumentStore>,
        source: Arc<dyn DocumentSource>,
        client: Arc<dyn ChatClient>,
        hook: Arc<dyn ProgressHook>,
        config: PipelineConfig,
    ) -> Self {
        let engine = RefinementLoop::new(client, hook)
            .with_pause(config.iteration_pause)
            .with_verbose(config.verbose);

        Self {
            store,
            source,
            engine,
            strategies: default_strategies(),
            config,
        }
    }

    /// Schedule background processing for a document.
    ///
    /// Idempotent by status check: a document already `processing` or
    /// `completed` is acknowledged without scheduling a second run. A
    /// document in `error` status is restarted from scratch.
    pub async fn start_processing(self: &Arc<Self>, document_id: &str) -> Result<StartAck> {
        let document = self
            .store
            .get_document(document_id)
            .await?
            .ok_or_else(|| PipelineError::DocumentNotFound(document_id.to_string()))?;

        match document.status {
            DocumentStatus::Processing => return Ok(StartAck::AlreadyProcessing),
            DocumentStatus::Completed => return Ok(StartAck::AlreadyCompleted),
            DocumentStatus::Error => {
                // Fresh run: put the stage records back to pending first
                for stage in &document.stages {
                    self.store
                        .update_stage(document_id, stage.id, StageStatus::Pending, None, None)
                        .await?;
                }
            }
            DocumentStatus::Uploaded => {}
        }

        self.store
            .update_document_status(document_id, DocumentStatus::Processing, None)
            .await?;

        let pipeline = Arc::clone(self);
        let id = document_id.to_string();
        tokio::spawn(async move {
            if let Err(err) = pipeline.process_document(&id).await {
                eprintln!("Error processing document {}: {}", id, err);
                let _ = pipeline
                    .store
                    .update_document_status(&id, DocumentStatus::Error, None)
                    .await;
            }
        });

        Ok(StartAck::Started)
    }

    /// Progress snapshot for a document.
    ///
    /// `current_stage_index` is the index of the stage now processing, else
    /// one past the last completed stage clamped to the final index, else 0.
    pub async fn get_status(&self, document_id: &str) -> Result<StatusReport> {
        let document = self
            .store
            .get_document(document_id)
            .await?
            .ok_or_else(|| PipelineError::DocumentNotFound(document_id.to_string()))?;

        let current_stage_index = document
            .stages
            .iter()
            .position(|s| s.status == StageStatus::Processing)
            .or_else(|| {
                document
                    .stages
                    .iter()
                    .rposition(|s| s.status == StageStatus::Completed)
                    .map(|i| (i + 1).min(document.stages.len().saturating_sub(1)))
            })
            .unwrap_or(0);

        Ok(StatusReport {
            status: document.status,
            stages: document.stages,
            current_stage_index,
        })
    }

    /// Run all six stages for one document
    async fn process_document(&self, document_id: &str) -> Result<()> {
        let document = self
            .store
            .get_document(document_id)
            .await?
            .ok_or_else(|| PipelineError::DocumentNotFound(document_id.to_string()))?;

        let text = self.load_document_text(&document).await;
        let mut ctx = ProcessingContext::new(text);

        for strategy in &self.strategies {
            let stage_id = strategy.id();
            self.set_stage(document_id, stage_id, StageStatus::Processing)
                .await?;

            match self.run_stage(Arc::clone(strategy), &ctx).await {
                Ok(increment) => {
                    ctx.merge(increment);
                    self.set_stage(document_id, stage_id, StageStatus::Completed)
                        .await?;
                }
                Err(err) => {
                    self.set_stage(document_id, stage_id, StageStatus::Error)
                        .await?;
                    return Err(err);
                }
            }
        }

        let review = ctx.review.take().ok_or_else(|| {
            PipelineError::Generic("Final review stage produced no output".to_string())
        })?;

        self.set_stage(document_id, FINALIZE_STAGE_ID, StageStatus::Processing)
            .await?;
        match self.finalize(document_id, review).await {
            Ok(()) => {
                self.set_stage(document_id, FINALIZE_STAGE_ID, StageStatus::Completed)
                    .await
            }
            Err(err) => {
                self.set_stage(document_id, FINALIZE_STAGE_ID, StageStatus::Error)
                    .await?;
                Err(err)
            }
        }
    }

    /// Run one generative stage through the refinement loop
    async fn run_stage(
        &self,
        strategy: Arc<dyn StageStrategy>,
        ctx: &ProcessingContext,
    ) -> Result<StageIncrement> {
        let validate: Arc<dyn Fn(&Value) -> crate::validation::ValidationResult + Send + Sync> = {
            let strategy = Arc::clone(&strategy);
            Arc::new(move |candidate: &Value| strategy.validate(candidate))
        };

        let options = RefineOptions {
            stage_id: strategy.id(),
            max_iterations: strategy.max_iterations(),
            completion_phrase: strategy.completion_phrase().to_string(),
            system_prompt: system_prompt(strategy.task(), strategy.completion_phrase()),
            chat: ChatOptions {
                tools: strategy.tools(),
                ..self.config.chat.clone()
            },
            validate,
        };

        let accepted = self
            .engine
            .refine(strategy.task(), &strategy.build_input(ctx), &options)
            .await?;

        strategy.parse_output(accepted)
    }

    /// Attach test cases to their requirements and persist the result
    async fn finalize(&self, document_id: &str, review: FinalReview) -> Result<()> {
        let FinalReview {
            mut requirements,
            test_cases,
        } = review;

        for requirement in &mut requirements {
            requirement.test_cases = test_cases
                .iter()
                .filter(|tc| tc.requirement_id == requirement.id)
                .cloned()
                .collect();
        }

        self.store
            .save_requirements(document_id, &requirements)
            .await?;
        self.store
            .update_document_status(document_id, DocumentStatus::Completed, Some(Utc::now()))
            .await?;

        Ok(())
    }

    /// Recover text for a document, falling back to placeholders
    async fn load_document_text(&self, document: &Document) -> String {
        match self.source.pdf_bytes(&document.id).await {
            Ok(Some(bytes)) => match parse_pdf(&bytes) {
                Ok(parsed) => parsed.text,
                Err(err) => {
                    eprintln!("Error extracting document content: {}", err);
                    format!(
                        "[Document content for {} unavailable: {}]",
                        document.file_name, err
                    )
                }
            },
            Ok(None) => format!("[Simulated document content for {}]", document.file_name),
            Err(err) => {
                eprintln!("Error reading document bytes: {}", err);
                format!(
                    "[Document content for {} unavailable: {}]",
                    document.file_name, err
                )
            }
        }
    }

    /// Update one stage's status, stamping start/completion times
    async fn set_stage(&self, document_id: &str, stage_id: u8, status: StageStatus) -> Result<()> {
        let started_at = (status == StageStatus::Processing).then(Utc::now);
        let completed_at = (status == StageStatus::Completed).then(Utc::now);

        self.store
            .update_stage(document_id, stage_id, status, started_at, completed_at)
            .await
    }
}
