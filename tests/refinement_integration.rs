//! Refinement loop tests across the public surface: engine, signal protocol,
//! interpreter, and the real stage validators working together

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use planforge::errors::Result;
use planforge::llm::{ChatClient, ChatMessage, ChatOptions, ChatResponse};
use planforge::refinement::{RefineOptions, RefinementLoop};
use planforge::telemetry::NullProgressHook;
use planforge::validation::validate_requirements;
use planforge::PipelineError;

const PHRASE: &str = "All requirements extracted and validated";

/// Replays responses in order, repeating the last one
struct Replay {
    responses: Vec<String>,
    calls: AtomicUsize,
}

impl Replay {
    fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatClient for Replay {
    async fn chat(&self, _: &[ChatMessage], _: &ChatOptions) -> Result<ChatResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let index = call.min(self.responses.len() - 1);
        Ok(ChatResponse {
            content: self.responses[index].clone(),
            usage: None,
        })
    }
}

fn engine(client: Arc<dyn ChatClient>) -> RefinementLoop {
    RefinementLoop::new(client, Arc::new(NullProgressHook)).with_pause(Duration::ZERO)
}

fn requirement_options(max_iterations: usize) -> RefineOptions {
    RefineOptions {
        max_iterations,
        ..RefineOptions::new(
            1,
            PHRASE,
            format!("Emit <promise>{}</promise> when done", PHRASE),
            Arc::new(|candidate: &Value| validate_requirements(candidate)),
        )
    }
}

fn valid_requirements_payload() -> Value {
    json!([
        {
            "id": "req-1",
            "type": "functional",
            "description": "The system shall allow users to authenticate using email",
            "testCases": []
        },
        {
            "id": "req-2",
            "type": "non-functional",
            "description": "The system shall respond to requests within two seconds",
            "testCases": []
        }
    ])
}

#[tokio::test]
async fn test_loop_converges_after_validator_feedback() {
    // First reply misses the functional requirement, second fixes it
    let invalid = json!([{
        "id": "req-1",
        "type": "non-functional",
        "description": "The system shall respond to requests within two seconds",
        "testCases": []
    }]);

    let client = Arc::new(Replay::new(vec![
        format!("{}\n<promise>{}</promise>", invalid, PHRASE),
        format!("{}\n<promise>{}</promise>", valid_requirements_payload(), PHRASE),
    ]));

    let output = engine(client.clone())
        .refine("extract requirements", &json!({"documentText": "doc"}), &requirement_options(20))
        .await
        .unwrap();

    assert_eq!(client.call_count(), 2);
    assert_eq!(output.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unrelated_promise_body_counts_as_signal() {
    // Fallback rule: any well-formed non-empty promise tag signals completion
    let client = Arc::new(Replay::new(vec![format!(
        "{}\n<promise>UNRELATED_TEXT</promise>",
        valid_requirements_payload()
    )]));

    let output = engine(client.clone())
        .refine("extract requirements", &json!({}), &requirement_options(20))
        .await
        .unwrap();

    assert_eq!(client.call_count(), 1);
    assert!(output.is_array());
}

#[tokio::test]
async fn test_no_promise_tag_never_completes() {
    // Valid payload, but the model never signals completion
    let client = Arc::new(Replay::new(vec![valid_requirements_payload().to_string()]));

    let err = engine(client.clone())
        .refine("extract requirements", &json!({}), &requirement_options(4))
        .await
        .unwrap_err();

    assert_eq!(client.call_count(), 4);
    match err {
        PipelineError::MaxIterationsExceeded {
            iterations,
            last_errors,
        } => {
            assert_eq!(iterations, 4);
            assert_eq!(last_errors, vec!["Completion signal missing from response"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_exhaustion_carries_latest_validation_errors() {
    let empty = format!("[]\n<promise>{}</promise>", PHRASE);
    let client = Arc::new(Replay::new(vec![empty]));

    let err = engine(client)
        .refine("extract requirements", &json!({}), &requirement_options(3))
        .await
        .unwrap_err();

    match err {
        PipelineError::MaxIterationsExceeded { last_errors, .. } => {
            assert!(last_errors.contains(&"No requirements extracted".to_string()));
            assert!(last_errors.contains(&"No functional requirements found".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_final_review_shape_survives_the_loop_unwrapped() {
    use planforge::validation::validate_final_review;

    let review = json!({
        "requirements": [{
            "id": "req-1",
            "type": "functional",
            "description": "The system shall allow users to authenticate using email",
            "testCases": []
        }],
        "testCases": [{
            "id": "tc-1",
            "requirementId": "req-1",
            "description": "Verify login with valid credentials succeeds",
            "isPositive": true,
            "isNegative": false,
            "testTypes": ["unit", "integration", "security"]
        }]
    });

    let client = Arc::new(Replay::new(vec![format!(
        "Summary first, then the payload. {}\n<promise>done reviewing everything</promise>",
        review
    )]));

    let options = RefineOptions {
        stage_id: 5,
        max_iterations: 5,
        completion_phrase: "done reviewing everything".to_string(),
        system_prompt: "review".to_string(),
        chat: ChatOptions::default(),
        validate: Arc::new(|candidate: &Value| validate_final_review(candidate)),
    };

    let output = engine(client)
        .refine("final review", &json!({}), &options)
        .await
        .unwrap();

    // The canonical review object is returned as an object, not a sequence
    assert!(output.is_object());
    assert_eq!(output["requirements"].as_array().unwrap().len(), 1);
}
