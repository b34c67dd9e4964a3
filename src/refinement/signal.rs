//! Completion signal protocol
//!
//! A response asserts it is final by embedding the configured phrase as
//! `<promise>PHRASE</promise>`. Detection is deliberately lenient: models
//! drift from the exact phrase, and forward progress beats strict protocol
//! conformance. A stray promise tag falsely signaling completion is an
//! accepted trade-off.

/// Opening marker of a completion signal
pub const PROMISE_OPEN: &str = "<promise>";

/// Closing marker of a completion signal
pub const PROMISE_CLOSE: &str = "</promise>";

/// Check whether a response carries a completion signal for `phrase`.
///
/// Matches in order, most to least strict:
/// 1. the exact wrapped phrase,
/// 2. the phrase text anywhere in the response,
/// 3. any well-formed, non-empty promise tag regardless of content.
pub fn contains_completion_signal(response: &str, phrase: &str) -> bool {
    let wrapped = format!("{}{}{}", PROMISE_OPEN, phrase, PROMISE_CLOSE);
    if response.contains(&wrapped) {
        return true;
    }

    if response.contains(phrase) {
        return true;
    }

    if let Some(inner) = first_promise_body(response) {
        return !inner.trim().is_empty();
    }

    false
}

/// Remove every `<promise>...</promise>` region from a response.
///
/// Run before JSON extraction so punctuation inside a promise cannot confuse
/// the bracket scan.
pub fn strip_promise_tags(response: &str) -> String {
    let mut result = String::with_capacity(response.len());
    let mut rest = response;

    loop {
        let Some(open) = rest.find(PROMISE_OPEN) else {
            result.push_str(rest);
            break;
        };
        let Some(close) = rest[open + PROMISE_OPEN.len()..].find(PROMISE_CLOSE) else {
            result.push_str(rest);
            break;
        };

        result.push_str(&rest[..open]);
        rest = &rest[open + PROMISE_OPEN.len() + close + PROMISE_CLOSE.len()..];
    }

    result.trim().to_string()
}

/// Body of the first well-formed promise tag, if any
fn first_promise_body(response: &str) -> Option<&str> {
    let start = response.find(PROMISE_OPEN)? + PROMISE_OPEN.len();
    let end = response[start..].find(PROMISE_CLOSE)? + start;
    Some(&response[start..end])
}
