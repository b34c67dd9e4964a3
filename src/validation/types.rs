//! Validation result type

/// Outcome of validating one candidate stage output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// True when no errors were recorded
    pub valid: bool,

    /// Blocking problems, in the order they were found
    pub errors: Vec<String>,

    /// Non-blocking observations
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// A passing result with no findings
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// A failing result from a single error
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            errors: vec![error.into()],
            warnings: Vec::new(),
        }
    }

    /// Build a result from accumulated findings; validity is derived from
    /// the absence of errors
    pub fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}
