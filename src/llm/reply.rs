//! Model reply parsing
//!
//! A reply is free text with one action object:
//!
//! ````text
//! The build failed on line 12, fixing the missing semicolon.
//! ```json
//! {"tool": "write_source_file", "arguments": {"file_path": "a.cpp", "content": "..."}}
//! ```
//! ````
//!
//! The object may also appear bare. Only a `final_answer` action finishes
//! the run; a reply without any action object is sent back to the model.

use serde_json::Value;

use crate::core::{Action, ToolCall, ValidationError};
use crate::tools::FINAL_ANSWER_TOOL;

const FENCE: &str = "```";

/// Turn a model reply into an action
pub fn parse_action(reply: &str) -> Result<Action, ValidationError> {
    match find_action_object(reply)? {
        Some(object) => action_from_object(reply, object),
        None => Err(ValidationError::NoAction {
            raw: reply.to_string(),
        }),
    }
}

fn action_from_object(reply: &str, object: Value) -> Result<Action, ValidationError> {
    let call: ToolCall =
        serde_json::from_value(object).map_err(|e| malformed(reply, e.to_string()))?;

    if call.tool == FINAL_ANSWER_TOOL {
        let answer = call
            .get_string("answer")
            .unwrap_or_else(|| reply.trim().to_string());
        return Ok(Action::FinalAnswer(answer));
    }

    Ok(Action::Invoke {
        reply: reply.to_string(),
        call,
    })
}

/// Locate the action object; fenced blocks win over bare objects.
///
/// Each fence opener is parsed as one JSON value from the start of its
/// body, so fences inside JSON strings do not cut the object short.
fn find_action_object(reply: &str) -> Result<Option<Value>, ValidationError> {
    let mut first_error: Option<String> = None;

    for (idx, _) in reply.match_indices(FENCE) {
        let body = block_body(&reply[idx + FENCE.len()..]).trim_start();
        if !body.starts_with('{') {
            continue;
        }
        match first_value(body) {
            Ok(value) if is_action(&value) => return Ok(Some(value)),
            Ok(_) => {}
            Err(e) if looks_like_action(body) => {
                first_error.get_or_insert(e);
            }
            Err(_) => {}
        }
    }

    for (idx, _) in reply.match_indices('{') {
        if let Ok(value) = first_value(&reply[idx..]) {
            if is_action(&value) {
                return Ok(Some(value));
            }
        }
    }

    // An attempt at a call that nothing parsed.
    if first_error.is_none() {
        let trimmed = reply.trim_start();
        if looks_like_action(trimmed) {
            first_error = first_value(trimmed).err();
        }
    }

    match first_error {
        Some(e) => Err(malformed(reply, e)),
        None => Ok(None),
    }
}

/// Parse the leading JSON value, ignoring whatever follows it
fn first_value(text: &str) -> Result<Value, String> {
    match serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .next()
    {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(e.to_string()),
        None => Err("empty action block".to_string()),
    }
}

fn is_action(value: &Value) -> bool {
    value
        .as_object()
        .map(|o| o.contains_key("tool") || (o.contains_key("name") && o.contains_key("arguments")))
        .unwrap_or(false)
}

/// An object that names a tool before the next fence
fn looks_like_action(text: &str) -> bool {
    let Some(rest) = text.strip_prefix('{') else {
        return false;
    };
    let block = rest.split(FENCE).next().unwrap_or(rest);
    block.contains("\"tool\"") || block.trim_start().starts_with("\"name\"")
}

/// Text after a fence, without its language tag line
fn block_body(after_fence: &str) -> &str {
    match after_fence.find('\n') {
        Some(nl) if !after_fence[..nl].contains('{') => &after_fence[nl + 1..],
        _ => after_fence,
    }
}

fn malformed(reply: &str, reason: String) -> ValidationError {
    ValidationError::MalformedCall {
        raw: reply.to_string(),
        reason: format!(
            "invalid action JSON: {}. Reply with {{\"tool\": ..., \"arguments\": {{...}}}}",
            reason
        ),
    }
}
