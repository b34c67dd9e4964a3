//! Requirement and test case types
//!
//! These mirror the JSON shapes the model is asked to produce, so wire field
//! names are camelCase (`requirementId`, `isPositive`, `testCases`). Raw model
//! output stays a `serde_json::Value` until a stage validator accepts it; only
//! then is it decoded into these structs.

use serde::{Deserialize, Serialize};

/// Requirement classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequirementKind {
    #[serde(rename = "functional")]
    Functional,

    #[serde(rename = "non-functional")]
    NonFunctional,
}

/// A testable statement of system behavior extracted from a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    /// Unique within a document
    pub id: String,

    /// Display number such as FR-001 or NFR-001
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    #[serde(rename = "type")]
    pub kind: RequirementKind,

    pub description: String,

    /// Empty until finalization attaches the generated cases
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl Requirement {
    pub fn is_functional(&self) -> bool {
        self.kind == RequirementKind::Functional
    }
}

/// A concrete check against a requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Unique within a document
    pub id: String,

    /// Must reference a requirement in the same document
    pub requirement_id: String,

    pub description: String,

    /// Expected-path check
    pub is_positive: bool,

    /// Failure-path check
    pub is_negative: bool,

    /// Test type tags assigned during classification
    #[serde(default)]
    pub test_types: Vec<String>,
}
