//! Response interpreter
//!
//! Recovers a JSON array or object from free-form generated text. The model
//! wraps its payload in prose, markdown fences, or both; a single-pass depth
//! counter finds the first top-level balanced candidate of each bracket kind,
//! then a selection policy picks which one to trust. Interpretation never
//! fails: anything unusable degrades to an empty array.

use serde_json::Value;

use crate::refinement::signal::strip_promise_tags;

/// Character span of a balanced candidate, end exclusive
type Span = (usize, usize);

/// Recover structured output from raw response text.
///
/// Selection policy, in order:
/// 1. an object exposing both `requirements` and `testCases` is the final
///    review shape and is returned unwrapped;
/// 2. an object that is not a fragment of the array candidate is returned as
///    a single-element array;
/// 3. otherwise the array candidate is returned verbatim;
/// 4. if nothing parses, an empty array.
pub fn interpret(content: &str) -> Value {
    let stripped = strip_promise_tags(content);

    let array_span = find_balanced(&stripped, '[', ']');
    let object_span = find_balanced(&stripped, '{', '}');

    let object_is_fragment = match (array_span, object_span) {
        (Some(a), Some(o)) => o.0 >= a.0 && o.1 <= a.1,
        _ => false,
    };

    if let Some((start, end)) = object_span {
        match serde_json::from_str::<Value>(&stripped[start..end]) {
            Ok(object) if is_final_review_shape(&object) => return object,
            Ok(object) if !object_is_fragment => return Value::Array(vec![object]),
            Ok(_) => {} // element of the array candidate; fall through
            Err(err) => {
                eprintln!("[interpreter] object candidate did not parse: {}", err);
            }
        }
    }

    if let Some((start, end)) = array_span {
        match serde_json::from_str::<Value>(&stripped[start..end]) {
            Ok(array) => return array,
            Err(err) => {
                eprintln!("[interpreter] array candidate did not parse: {}", err);
            }
        }
    }

    eprintln!("[interpreter] no JSON payload recovered from response");
    Value::Array(Vec::new())
}

/// Find the first top-level balanced region delimited by `open`/`close`.
///
/// A running depth counter keeps nested regions from terminating the scan
/// early. Closers with no matching opener are ignored.
fn find_balanced(text: &str, open: char, close: char) -> Option<Span> {
    let mut depth = 0usize;
    let mut start = None;

    for (i, ch) in text.char_indices() {
        if ch == open {
            if depth == 0 {
                start = Some(i);
            }
            depth += 1;
        } else if ch == close && depth > 0 {
            depth -= 1;
            if depth == 0 {
                return start.map(|s| (s, i + close.len_utf8()));
            }
        }
    }

    None
}

fn is_final_review_shape(value: &Value) -> bool {
    value
        .as_object()
        .map(|map| map.contains_key("requirements") && map.contains_key("testCases"))
        .unwrap_or(false)
}
