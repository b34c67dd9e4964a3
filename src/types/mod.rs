//! Core domain types for documents, requirements and test cases

pub mod document;
pub mod requirement;

pub use document::{AgentStage, Document, DocumentStatus, StageStatus, StatusReport, STAGE_COUNT};
pub use requirement::{Requirement, RequirementKind, TestCase};
