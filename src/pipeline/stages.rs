//! Stage strategies for the generative pipeline
//!
//! Each generative stage is a strategy: it names its task and completion
//! phrase, builds its input payload from the processing context, validates a
//! candidate, and decodes the accepted candidate into a typed increment.
//! Stage 6 (finalization) is orchestrator logic and has no strategy.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::errors::Result;
use crate::pipeline::context::{FinalReview, ProcessingContext, StageIncrement};
use crate::types::{Requirement, TestCase};
use crate::validation::{
    validate_final_review, validate_negative_labels, validate_requirements, validate_test_cases,
    validate_test_types, ValidationResult,
};

/// One generative stage of the pipeline
pub trait StageStrategy: Send + Sync {
    /// Stage id, 1-based, matching the document's stage catalog
    fn id(&self) -> u8;

    /// Task description embedded in every prompt
    fn task(&self) -> &'static str;

    /// Phrase the model must promise to signal completion
    fn completion_phrase(&self) -> &'static str;

    /// Iteration budget for this stage's refinement loop
    fn max_iterations(&self) -> usize;

    /// Input payload for the prompt, drawn from the accumulated context
    fn build_input(&self, ctx: &ProcessingContext) -> Value;

    /// Score a candidate output
    fn validate(&self, candidate: &Value) -> ValidationResult;

    /// Decode an accepted candidate into a typed increment
    fn parse_output(&self, candidate: Value) -> Result<StageIncrement>;

    /// Tool specifications offered to the model, none by default
    fn tools(&self) -> Vec<Value> {
        Vec::new()
    }
}

/// The five generative strategies in pipeline order
pub fn default_strategies() -> Vec<Arc<dyn StageStrategy>> {
    vec![
        Arc::new(RequirementExtraction),
        Arc::new(TestCaseGeneration),
        Arc::new(NegativeLabeling),
        Arc::new(TypeClassification),
        Arc::new(ReviewStage),
    ]
}

/// Fixed system message for a stage's refinement loop
pub fn system_prompt(task: &str, completion_phrase: &str) -> String {
    format!(
        "You are a specialized AI agent working on: {}\n\n\
         Process:\n\
         1. Analyze the input carefully\n\
         2. Generate the required output following best practices\n\
         3. Self-validate your work\n\
         4. If validation fails, identify issues and fix them\n\
         5. Repeat until perfect\n\n\
         When complete, output: <promise>{}</promise>\n\n\
         If stuck after multiple iterations:\n\
         - Document what you've accomplished\n\
         - List remaining issues\n\
         - Suggest next steps",
        task, completion_phrase
    )
}

/// Stage 1: extract requirements from document text
pub struct RequirementExtraction;

impl StageStrategy for RequirementExtraction {
    fn id(&self) -> u8 {
        1
    }

    fn task(&self) -> &'static str {
        "Extract all functional and non-functional requirements from the PRD document"
    }

    fn completion_phrase(&self) -> &'static str {
        "All requirements extracted and validated"
    }

    fn max_iterations(&self) -> usize {
        15
    }

    fn build_input(&self, ctx: &ProcessingContext) -> Value {
        json!({ "documentText": ctx.document_text })
    }

    fn validate(&self, candidate: &Value) -> ValidationResult {
        validate_requirements(candidate)
    }

    fn parse_output(&self, candidate: Value) -> Result<StageIncrement> {
        let requirements: Vec<Requirement> = serde_json::from_value(candidate)?;
        Ok(StageIncrement::Requirements(requirements))
    }
}

/// Stage 2: generate test cases from requirements only.
/// Document text is deliberately dropped here to bound prompt size.
pub struct TestCaseGeneration;

impl StageStrategy for TestCaseGeneration {
    fn id(&self) -> u8 {
        2
    }

    fn task(&self) -> &'static str {
        "Generate positive and negative test cases for each requirement using the 7 testing principles"
    }

    fn completion_phrase(&self) -> &'static str {
        "All test cases generated and conform to 7 testing principles"
    }

    fn max_iterations(&self) -> usize {
        20
    }

    fn build_input(&self, ctx: &ProcessingContext) -> Value {
        json!({ "requirements": ctx.requirements })
    }

    fn validate(&self, candidate: &Value) -> ValidationResult {
        validate_test_cases(candidate)
    }

    fn parse_output(&self, candidate: Value) -> Result<StageIncrement> {
        let test_cases: Vec<TestCase> = serde_json::from_value(candidate)?;
        Ok(StageIncrement::TestCases(test_cases))
    }
}

/// Stage 3: relabel negative test cases
pub struct NegativeLabeling;

impl StageStrategy for NegativeLabeling {
    fn id(&self) -> u8 {
        3
    }

    fn task(&self) -> &'static str {
        "Review all test cases and correctly label negative test cases"
    }

    fn completion_phrase(&self) -> &'static str {
        "All negative test cases properly labeled"
    }

    fn max_iterations(&self) -> usize {
        10
    }

    fn build_input(&self, ctx: &ProcessingContext) -> Value {
        json!({ "testCases": ctx.test_cases })
    }

    fn validate(&self, candidate: &Value) -> ValidationResult {
        validate_negative_labels(candidate)
    }

    fn parse_output(&self, candidate: Value) -> Result<StageIncrement> {
        let test_cases: Vec<TestCase> = serde_json::from_value(candidate)?;
        Ok(StageIncrement::TestCases(test_cases))
    }
}

/// Stage 4: classify test cases by test type
pub struct TypeClassification;

impl StageStrategy for TypeClassification {
    fn id(&self) -> u8 {
        4
    }

    fn task(&self) -> &'static str {
        "Classify all test cases by their testing types (unit, integration, system, etc.)"
    }

    fn completion_phrase(&self) -> &'static str {
        "All test cases classified by type"
    }

    fn max_iterations(&self) -> usize {
        10
    }

    fn build_input(&self, ctx: &ProcessingContext) -> Value {
        json!({ "testCases": ctx.test_cases })
    }

    fn validate(&self, candidate: &Value) -> ValidationResult {
        validate_test_types(candidate)
    }

    fn parse_output(&self, candidate: Value) -> Result<StageIncrement> {
        let test_cases: Vec<TestCase> = serde_json::from_value(candidate)?;
        Ok(StageIncrement::TestCases(test_cases))
    }
}

/// Stage 5: final review over a lightweight summary
pub struct ReviewStage;

impl StageStrategy for ReviewStage {
    fn id(&self) -> u8 {
        5
    }

    fn task(&self) -> &'static str {
        "Review all requirements and test cases to ensure they conform to the 7 testing principles"
    }

    fn completion_phrase(&self) -> &'static str {
        "Final review complete - all requirements and test cases validated"
    }

    fn max_iterations(&self) -> usize {
        15
    }

    fn build_input(&self, ctx: &ProcessingContext) -> Value {
        let functional = ctx
            .requirements
            .iter()
            .filter(|r| r.is_functional())
            .count();

        json!({
            "requirementCount": ctx.requirements.len(),
            "testCaseCount": ctx.test_cases.len(),
            "functionalCount": functional,
            "nonFunctionalCount": ctx.requirements.len() - functional,
            "requirements": ctx.requirements,
            "testCases": ctx.test_cases,
        })
    }

    fn validate(&self, candidate: &Value) -> ValidationResult {
        validate_final_review(candidate)
    }

    fn parse_output(&self, candidate: Value) -> Result<StageIncrement> {
        let review: FinalReview = serde_json::from_value(candidate)?;
        Ok(StageIncrement::Review(review))
    }
}
