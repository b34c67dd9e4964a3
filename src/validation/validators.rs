//! Per-stage semantic validators
//!
//! Each validator scores one candidate stage output. Candidates arrive as
//! `serde_json::Value` because the model is free to omit or mangle fields;
//! the checks here are what decide whether the JSON is trustworthy enough to
//! decode into domain types.

use serde_json::Value;
use std::collections::HashSet;

use crate::validation::ValidationResult;

/// The accepted test type vocabulary
pub const TEST_TYPE_VOCABULARY: [&str; 11] = [
    "unit",
    "integration",
    "system",
    "acceptance",
    "performance",
    "security",
    "usability",
    "compatibility",
    "regression",
    "smoke",
    "sanity",
];

/// Keywords expected somewhere in a failure-path description
const NEGATIVE_KEYWORDS: [&str; 7] = [
    "fail",
    "error",
    "invalid",
    "reject",
    "deny",
    "exception",
    "negative",
];

/// Minimum length for a requirement description
const MIN_REQUIREMENT_DESCRIPTION: usize = 20;

/// Minimum length for a test case description
const MIN_TEST_CASE_DESCRIPTION: usize = 10;

fn str_field<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str)
}

fn has_id(entry: &Value, key: &str) -> bool {
    str_field(entry, key).map(|s| !s.is_empty()).unwrap_or(false)
}

fn flag_is_true(entry: &Value, key: &str) -> bool {
    entry.get(key).and_then(Value::as_bool) == Some(true)
}

fn is_boolean(entry: &Value, key: &str) -> bool {
    entry.get(key).map(Value::is_boolean).unwrap_or(false)
}

/// Validate extracted requirements (stage 1 output)
pub fn validate_requirements(output: &Value) -> ValidationResult {
    let Some(items) = output.as_array() else {
        return ValidationResult::invalid("Output must be an array of requirements");
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if items.is_empty() {
        errors.push("No requirements extracted".to_string());
    }

    let functional = items
        .iter()
        .filter(|r| str_field(r, "type") == Some("functional"))
        .count();
    let non_functional = items
        .iter()
        .filter(|r| str_field(r, "type") == Some("non-functional"))
        .count();

    if functional == 0 {
        errors.push("No functional requirements found".to_string());
    }
    if non_functional == 0 {
        warnings.push("No non-functional requirements found (may be acceptable)".to_string());
    }

    for (i, req) in items.iter().enumerate() {
        let pos = i + 1;
        if !has_id(req, "id") {
            errors.push(format!("Requirement {} missing ID", pos));
        }
        match str_field(req, "description") {
            Some(d) if d.trim().len() >= MIN_REQUIREMENT_DESCRIPTION => {}
            _ => errors.push(format!(
                "Requirement {} description too short or missing",
                pos
            )),
        }
        match str_field(req, "type") {
            Some("functional") | Some("non-functional") => {}
            _ => errors.push(format!("Requirement {} has invalid type", pos)),
        }
        if !req.get("testCases").map(Value::is_array).unwrap_or(false) {
            errors.push(format!("Requirement {} missing testCases array", pos));
        }
    }

    ValidationResult::from_findings(errors, warnings)
}

/// Validate generated test cases (stage 2 output)
pub fn validate_test_cases(output: &Value) -> ValidationResult {
    let Some(items) = output.as_array() else {
        return ValidationResult::invalid("Output must be an array of test cases");
    };

    let mut errors = Vec::new();

    if items.is_empty() {
        errors.push("No test cases generated".to_string());
    }

    let positive = items.iter().filter(|tc| flag_is_true(tc, "isPositive")).count();
    let negative = items.iter().filter(|tc| flag_is_true(tc, "isNegative")).count();

    if positive == 0 {
        errors.push("No positive test cases found".to_string());
    }
    if negative == 0 {
        errors.push("No negative test cases found".to_string());
    }

    for (i, tc) in items.iter().enumerate() {
        let pos = i + 1;
        if !has_id(tc, "id") {
            errors.push(format!("Test case {} missing ID", pos));
        }
        if !has_id(tc, "requirementId") {
            errors.push(format!("Test case {} missing requirementId", pos));
        }
        match str_field(tc, "description") {
            Some(d) if d.trim().len() >= MIN_TEST_CASE_DESCRIPTION => {}
            _ => errors.push(format!(
                "Test case {} description too short or missing",
                pos
            )),
        }
        if !is_boolean(tc, "isPositive") {
            errors.push(format!("Test case {} missing isPositive flag", pos));
        }
        if !is_boolean(tc, "isNegative") {
            errors.push(format!("Test case {} missing isNegative flag", pos));
        }
        if !tc.get("testTypes").map(Value::is_array).unwrap_or(false) {
            errors.push(format!("Test case {} missing testTypes array", pos));
        }
    }

    ValidationResult::from_findings(errors, Vec::new())
}

/// Validate negative test labeling (stage 3 output)
///
/// The mutual-exclusivity check is one-directional: a case flagged negative
/// must not also be flagged positive. The reverse direction is not checked.
pub fn validate_negative_labels(output: &Value) -> ValidationResult {
    let Some(items) = output.as_array() else {
        return ValidationResult::invalid("Output must be an array of test cases");
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let negative = items.iter().filter(|tc| flag_is_true(tc, "isNegative")).count();
    if negative == 0 {
        errors.push("No negative test cases found after labeling".to_string());
    }

    let mislabeled = items
        .iter()
        .filter(|tc| flag_is_true(tc, "isNegative") && flag_is_true(tc, "isPositive"))
        .count();
    if mislabeled > 0 {
        errors.push(format!(
            "{} test cases incorrectly labeled as both positive and negative",
            mislabeled
        ));
    }

    // Soft check: a substantial negative description should read like a
    // failure path. Never blocks.
    for (i, tc) in items.iter().enumerate() {
        if !flag_is_true(tc, "isNegative") {
            continue;
        }
        if let Some(desc) = str_field(tc, "description") {
            let lower = desc.to_lowercase();
            if lower.len() > 20 && !NEGATIVE_KEYWORDS.iter().any(|k| lower.contains(k)) {
                warnings.push(format!(
                    "Test case {} is negative but its description does not mention a failure condition",
                    i + 1
                ));
            }
        }
    }

    ValidationResult::from_findings(errors, warnings)
}

/// Validate test type classification (stage 4 output)
pub fn validate_test_types(output: &Value) -> ValidationResult {
    let Some(items) = output.as_array() else {
        return ValidationResult::invalid("Output must be an array of test cases");
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if items.is_empty() {
        errors.push("No test cases to classify".to_string());
    }

    for (i, tc) in items.iter().enumerate() {
        let pos = i + 1;
        match tc.get("testTypes").and_then(Value::as_array) {
            None => errors.push(format!("Test case {} has no test types assigned", pos)),
            Some(types) if types.is_empty() => {
                errors.push(format!("Test case {} has no test types assigned", pos));
            }
            Some(types) => {
                let unknown: Vec<String> = types
                    .iter()
                    .filter_map(|t| match t.as_str() {
                        Some(s) if TEST_TYPE_VOCABULARY.contains(&s.to_lowercase().as_str()) => {
                            None
                        }
                        Some(s) => Some(s.to_string()),
                        None => Some(t.to_string()),
                    })
                    .collect();
                if !unknown.is_empty() {
                    warnings.push(format!(
                        "Test case {} has potentially invalid test types: {}",
                        pos,
                        unknown.join(", ")
                    ));
                }
            }
        }
    }

    ValidationResult::from_findings(errors, warnings)
}

/// Validate the final review (stage 5 output)
pub fn validate_final_review(output: &Value) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let requirements = output.get("requirements").and_then(Value::as_array);
    let test_cases = output.get("testCases").and_then(Value::as_array);

    if requirements.is_none() {
        errors.push("Requirements missing or invalid".to_string());
    }
    if test_cases.is_none() {
        errors.push("Test cases missing or invalid".to_string());
    }

    if let Some(reqs) = requirements {
        if reqs.is_empty() {
            errors.push("No requirements to review".to_string());
        }
    }
    if let Some(cases) = test_cases {
        if cases.is_empty() {
            errors.push("No test cases to review".to_string());
        }

        let mut distinct: HashSet<String> = HashSet::new();
        for tc in cases {
            if let Some(types) = tc.get("testTypes").and_then(Value::as_array) {
                for t in types.iter().filter_map(Value::as_str) {
                    distinct.insert(t.to_lowercase());
                }
            }
        }
        if distinct.len() < 3 {
            warnings
                .push("Limited test type diversity - consider more varied test types".to_string());
        }
    }

    if let (Some(reqs), Some(cases)) = (requirements, test_cases) {
        for req in reqs {
            if let Some(id) = str_field(req, "id") {
                let related = cases
                    .iter()
                    .filter(|tc| str_field(tc, "requirementId") == Some(id))
                    .count();
                if related == 0 {
                    errors.push(format!("Requirement {} has no associated test cases", id));
                }
            }
        }
    }

    ValidationResult::from_findings(errors, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn requirement(id: &str, kind: &str, description: &str) -> Value {
        json!({
            "id": id,
            "type": kind,
            "description": description,
            "testCases": []
        })
    }

    fn test_case(id: &str, req: &str, desc: &str, positive: bool, negative: bool) -> Value {
        json!({
            "id": id,
            "requirementId": req,
            "description": desc,
            "isPositive": positive,
            "isNegative": negative,
            "testTypes": []
        })
    }

    #[test]
    fn test_requirements_not_an_array() {
        let result = validate_requirements(&json!({"oops": true}));
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["Output must be an array of requirements"]);
    }

    #[test]
    fn test_requirements_empty_is_invalid() {
        let result = validate_requirements(&json!([]));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e == "No requirements extracted"));
    }

    #[test]
    fn test_requirements_valid_pair_has_zero_errors() {
        let output = json!([
            requirement("req-1", "functional", "The system shall allow users to authenticate"),
            requirement("req-2", "non-functional", "The system shall respond within two seconds"),
        ]);

        let result = validate_requirements(&output);
        assert!(result.valid, "unexpected errors: {:?}", result.errors);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_requirements_functional_only_warns() {
        let output = json!([requirement(
            "req-1",
            "functional",
            "The system shall allow users to authenticate"
        )]);

        let result = validate_requirements(&output);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_requirements_no_functional_is_error() {
        let output = json!([requirement(
            "req-1",
            "non-functional",
            "The system shall respond within two seconds"
        )]);

        let result = validate_requirements(&output);
        assert!(!result.valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e == "No functional requirements found"));
    }

    #[test]
    fn test_requirements_entry_checks() {
        let output = json!([{
            "type": "imaginary",
            "description": "too short",
        }]);

        let result = validate_requirements(&output);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("missing ID")));
        assert!(result.errors.iter().any(|e| e.contains("description too short")));
        assert!(result.errors.iter().any(|e| e.contains("invalid type")));
        assert!(result.errors.iter().any(|e| e.contains("missing testCases array")));
    }

    #[test]
    fn test_test_cases_empty_is_invalid() {
        let result = validate_test_cases(&json!([]));
        assert!(!result.valid);
    }

    #[test]
    fn test_test_cases_need_both_polarities() {
        let only_positive = json!([test_case(
            "tc-1",
            "req-1",
            "Verify login succeeds",
            true,
            false
        )]);

        let result = validate_test_cases(&only_positive);
        assert!(!result.valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e == "No negative test cases found"));
    }

    #[test]
    fn test_test_cases_valid_pair_passes() {
        let output = json!([
            test_case("tc-1", "req-1", "Verify login succeeds", true, false),
            test_case("tc-2", "req-1", "Verify login rejected", false, true),
        ]);

        let result = validate_test_cases(&output);
        assert!(result.valid, "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn test_test_cases_flag_must_be_boolean() {
        let output = json!([{
            "id": "tc-1",
            "requirementId": "req-1",
            "description": "Verify login succeeds",
            "isPositive": "yes",
            "isNegative": false,
            "testTypes": []
        }]);

        let result = validate_test_cases(&output);
        assert!(!result.valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("missing isPositive flag")));
    }

    #[test]
    fn test_negative_labels_not_an_array() {
        assert!(!validate_negative_labels(&json!("nope")).valid);
    }

    #[test]
    fn test_negative_labels_empty_is_invalid() {
        let result = validate_negative_labels(&json!([]));
        assert!(!result.valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e == "No negative test cases found after labeling"));
    }

    #[test]
    fn test_negative_labels_mislabeled_both_ways() {
        let output = json!([
            test_case("tc-1", "req-1", "Verify rejection on bad input", false, true),
            test_case("tc-2", "req-1", "Verify error on timeout shown", true, true),
        ]);

        let result = validate_negative_labels(&output);
        assert!(!result.valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("incorrectly labeled as both positive and negative")));
    }

    #[test]
    fn test_negative_labels_positive_also_negative_not_flagged_in_reverse() {
        // Only the negative-also-positive direction is checked
        let output = json!([
            test_case("tc-1", "req-1", "Verify rejection on invalid input", false, true),
            test_case("tc-2", "req-1", "Verify the dashboard loads correctly", true, false),
        ]);

        let result = validate_negative_labels(&output);
        assert!(result.valid);
    }

    #[test]
    fn test_negative_labels_soft_keyword_warning_is_non_blocking() {
        let output = json!([test_case(
            "tc-1",
            "req-1",
            "Verify the settings page renders the avatar",
            false,
            true
        )]);

        let result = validate_negative_labels(&output);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_test_types_empty_input_is_invalid() {
        let result = validate_test_types(&json!([]));
        assert!(!result.valid);
    }

    #[test]
    fn test_test_types_missing_assignment_is_error() {
        let output = json!([test_case("tc-1", "req-1", "Verify login succeeds", true, false)]);

        let result = validate_test_types(&output);
        assert!(!result.valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("has no test types assigned")));
    }

    #[test]
    fn test_test_types_unknown_type_warns_only() {
        let output = json!([{
            "id": "tc-1",
            "requirementId": "req-1",
            "description": "Verify login succeeds",
            "isPositive": true,
            "isNegative": false,
            "testTypes": ["unit", "telepathy"]
        }]);

        let result = validate_test_types(&output);
        assert!(result.valid);
        assert!(result.warnings[0].contains("telepathy"));
        assert!(!result.warnings[0].contains("unit"));
    }

    #[test]
    fn test_test_types_vocabulary_is_case_insensitive() {
        let output = json!([{
            "id": "tc-1",
            "requirementId": "req-1",
            "description": "Verify login succeeds",
            "isPositive": true,
            "isNegative": false,
            "testTypes": ["Security", "REGRESSION"]
        }]);

        let result = validate_test_types(&output);
        assert!(result.valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_final_review_missing_sections() {
        let result = validate_final_review(&json!({}));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e == "Requirements missing or invalid"));
        assert!(result.errors.iter().any(|e| e == "Test cases missing or invalid"));
    }

    #[test]
    fn test_final_review_empty_sequences_are_invalid() {
        let result = validate_final_review(&json!({"requirements": [], "testCases": []}));
        assert!(!result.valid);
    }

    #[test]
    fn test_final_review_uncovered_requirement() {
        let output = json!({
            "requirements": [
                requirement("req-1", "functional", "The system shall allow users to authenticate"),
                requirement("req-2", "non-functional", "The system shall respond within two seconds"),
            ],
            "testCases": [
                test_case("tc-1", "req-1", "Verify login succeeds", true, false),
            ]
        });

        let result = validate_final_review(&output);
        assert!(!result.valid);
        assert!(result
            .errors
            .iter()
            .any(|e| e == "Requirement req-2 has no associated test cases"));
    }

    #[test]
    fn test_final_review_diversity_warning() {
        let output = json!({
            "requirements": [
                requirement("req-1", "functional", "The system shall allow users to authenticate"),
            ],
            "testCases": [{
                "id": "tc-1",
                "requirementId": "req-1",
                "description": "Verify login succeeds",
                "isPositive": true,
                "isNegative": false,
                "testTypes": ["unit", "integration"]
            }]
        });

        let result = validate_final_review(&output);
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("diversity")));
    }

    #[test]
    fn test_final_review_three_types_no_diversity_warning() {
        let output = json!({
            "requirements": [
                requirement("req-1", "functional", "The system shall allow users to authenticate"),
            ],
            "testCases": [{
                "id": "tc-1",
                "requirementId": "req-1",
                "description": "Verify login succeeds",
                "isPositive": true,
                "isNegative": false,
                "testTypes": ["unit", "integration", "security"]
            }]
        });

        let result = validate_final_review(&output);
        assert!(result.valid);
        assert!(result.warnings.is_empty());
    }
}
