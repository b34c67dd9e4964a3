//! Semantic validation of stage outputs
//!
//! One pure validator per generative stage. Errors block progress and feed
//! the next refinement iteration; warnings never block.

pub mod types;
pub mod validators;

pub use types::ValidationResult;
pub use validators::{
    validate_final_review, validate_negative_labels, validate_requirements, validate_test_cases,
    validate_test_types, TEST_TYPE_VOCABULARY,
};
