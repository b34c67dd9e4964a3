//! Per-run processing context
//!
//! Accumulates the document text plus each stage's output for the lifetime of
//! one pipeline run. Stages produce typed increments; the orchestrator merges
//! them here explicitly. Never persisted.

use serde::{Deserialize, Serialize};

use crate::types::{Requirement, TestCase};

/// The reviewed end state produced by the final review stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReview {
    pub requirements: Vec<Requirement>,
    pub test_cases: Vec<TestCase>,
}

/// Typed output of one generative stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageIncrement {
    /// Stage 1: extracted requirements
    Requirements(Vec<Requirement>),

    /// Stages 2-4: the current shape of the test case set
    TestCases(Vec<TestCase>),

    /// Stage 5: reviewed requirements and test cases
    Review(FinalReview),
}

/// Ephemeral accumulator for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct ProcessingContext {
    /// Raw text recovered from the document
    pub document_text: String,

    pub requirements: Vec<Requirement>,

    /// Latest test case set; stages 3 and 4 replace it wholesale
    pub test_cases: Vec<TestCase>,

    pub review: Option<FinalReview>,
}

impl ProcessingContext {
    pub fn new(document_text: String) -> Self {
        Self {
            document_text,
            ..Self::default()
        }
    }

    /// Merge one stage's increment into the accumulated state
    pub fn merge(&mut self, increment: StageIncrement) {
        match increment {
            StageIncrement::Requirements(requirements) => self.requirements = requirements,
            StageIncrement::TestCases(test_cases) => self.test_cases = test_cases,
            StageIncrement::Review(review) => self.review = Some(review),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequirementKind;

    fn requirement(id: &str) -> Requirement {
        Requirement {
            id: id.to_string(),
            number: None,
            kind: RequirementKind::Functional,
            description: "The system shall allow users to authenticate".to_string(),
            test_cases: Vec::new(),
        }
    }

    fn test_case(id: &str) -> TestCase {
        TestCase {
            id: id.to_string(),
            requirement_id: "req-1".to_string(),
            description: "Verify login".to_string(),
            is_positive: true,
            is_negative: false,
            test_types: Vec::new(),
        }
    }

    #[test]
    fn test_new_context_is_bare() {
        let ctx = ProcessingContext::new("document body".to_string());
        assert_eq!(ctx.document_text, "document body");
        assert!(ctx.requirements.is_empty());
        assert!(ctx.test_cases.is_empty());
        assert!(ctx.review.is_none());
    }

    #[test]
    fn test_merge_replaces_test_cases_wholesale() {
        let mut ctx = ProcessingContext::new(String::new());
        ctx.merge(StageIncrement::TestCases(vec![test_case("tc-1")]));
        ctx.merge(StageIncrement::TestCases(vec![
            test_case("tc-2"),
            test_case("tc-3"),
        ]));

        let ids: Vec<&str> = ctx.test_cases.iter().map(|tc| tc.id.as_str()).collect();
        assert_eq!(ids, vec!["tc-2", "tc-3"]);
    }

    #[test]
    fn test_merge_accumulates_independent_slots() {
        let mut ctx = ProcessingContext::new(String::new());
        ctx.merge(StageIncrement::Requirements(vec![requirement("req-1")]));
        ctx.merge(StageIncrement::TestCases(vec![test_case("tc-1")]));
        ctx.merge(StageIncrement::Review(FinalReview {
            requirements: vec![requirement("req-1")],
            test_cases: vec![test_case("tc-1")],
        }));

        assert_eq!(ctx.requirements.len(), 1);
        assert_eq!(ctx.test_cases.len(), 1);
        assert!(ctx.review.is_some());
    }

    #[test]
    fn test_final_review_wire_names() {
        let review = FinalReview {
            requirements: vec![requirement("req-1")],
            test_cases: vec![test_case("tc-1")],
        };
        let json = serde_json::to_string(&review).unwrap();
        assert!(json.contains("testCases"));

        let parsed: FinalReview =
            serde_json::from_str(r#"{"requirements": [], "testCases": []}"#).unwrap();
        assert!(parsed.requirements.is_empty());
    }
}
