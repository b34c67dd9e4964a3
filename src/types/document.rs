//! Document and pipeline stage types
//!
//! A document owns a fixed, ordered sequence of six agent stages. Stage and
//! document statuses only move forward within a run: pending → processing →
//! completed | error, and uploaded → processing → completed | error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Requirement;

/// Number of pipeline stages per document
pub const STAGE_COUNT: usize = 6;

/// Fixed stage catalog: (id, name, description)
const STAGE_CATALOG: [(u8, &str, &str); STAGE_COUNT] = [
    (
        1,
        "Requirement Extraction",
        "Reviewing document and extracting functional and non-functional requirements",
    ),
    (
        2,
        "Test Case Generation",
        "Creating positive and negative test cases per requirement using the 7 testing principles",
    ),
    (
        3,
        "Negative Test Labeling",
        "Reviewing requirements and test cases, then labeling negative test cases",
    ),
    (
        4,
        "Test Type Classification",
        "Reviewing requirements and test cases, then labeling them according to their testing types",
    ),
    (
        5,
        "Final Review",
        "Reviewing everything to ensure requirements and test cases make sense and conform to the 7 testing principles",
    ),
    (
        6,
        "Document Finalization",
        "Saving the final document and preparing it for review",
    ),
];

/// Lifecycle status of a single agent stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl StageStatus {
    /// Terminal statuses accept no further transitions within a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Error)
    }
}

/// Lifecycle status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Completed,
    Error,
}

/// One of the six ordered processing stages of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStage {
    /// Stage id, 1-based and fixed per the catalog
    pub id: u8,

    pub name: String,

    pub description: String,

    pub status: StageStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl AgentStage {
    /// Build the initial six-stage sequence for a new document
    pub fn initial_set() -> Vec<AgentStage> {
        STAGE_CATALOG
            .iter()
            .map(|(id, name, description)| AgentStage {
                id: *id,
                name: (*name).to_string(),
                description: (*description).to_string(),
                status: StageStatus::Pending,
                started_at: None,
                completed_at: None,
            })
            .collect()
    }
}

/// A document under processing, as held by the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,

    pub file_name: String,

    pub uploaded_at: DateTime<Utc>,

    pub status: DocumentStatus,

    pub stages: Vec<AgentStage>,

    /// Populated at finalization, nested test cases included
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<Requirement>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Progress snapshot returned by the pipeline's status query
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: DocumentStatus,

    pub stages: Vec<AgentStage>,

    /// Index of the stage currently processing, else one past the last
    /// completed stage (clamped to the last valid index), else 0
    pub current_stage_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_set_shape() {
        let stages = AgentStage::initial_set();
        assert_eq!(stages.len(), STAGE_COUNT);
        assert_eq!(stages[0].id, 1);
        assert_eq!(stages[5].id, 6);
        assert_eq!(stages[0].name, "Requirement Extraction");
        assert_eq!(stages[5].name, "Document Finalization");
        assert!(stages.iter().all(|s| s.status == StageStatus::Pending));
        assert!(stages.iter().all(|s| s.started_at.is_none()));
    }

    #[test]
    fn test_stage_status_terminal() {
        assert!(StageStatus::Completed.is_terminal());
        assert!(StageStatus::Error.is_terminal());
        assert!(!StageStatus::Pending.is_terminal());
        assert!(!StageStatus::Processing.is_terminal());
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&DocumentStatus::Uploaded).unwrap();
        assert_eq!(json, r#""uploaded""#);

        let status: StageStatus = serde_json::from_str(r#""processing""#).unwrap();
        assert_eq!(status, StageStatus::Processing);
    }

    #[test]
    fn test_stage_serialization_camel_case() {
        let stage = &AgentStage::initial_set()[2];
        let json = serde_json::to_string(stage).unwrap();
        assert!(json.contains(r#""status":"pending""#));
        // Unset timestamps are omitted from the wire form
        assert!(!json.contains("startedAt"));
    }
}
