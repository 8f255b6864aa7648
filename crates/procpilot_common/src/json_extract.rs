//! JSON sanitisation for model output
//!
//! Model replies are untrusted free text. They may wrap JSON in Markdown
//! code fences or surround it with prose; these helpers isolate the
//! outermost object before parsing.

use serde_json::Value;

/// Remove a surrounding Markdown code fence (```json ... ```), if any
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Skip the info string ("json", "JSON", ...) on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Span of the outermost `{...}` object in the text
pub fn isolate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse the first JSON object found in a model reply.
///
/// Returns `None` for anything that is not a JSON object.
pub fn parse_object(text: &str) -> Option<Value> {
    let cleaned = strip_code_fences(text);
    let candidate = isolate_object(cleaned)?;
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fenced_json() {
        let text = "```json\n{\"action\": \"restart\"}\n```";
        assert_eq!(strip_code_fences(text), "{\"action\": \"restart\"}");
    }

    #[test]
    fn test_strip_without_fence() {
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let value = parse_object("Sure! Here it is: {\"action\": \"stop\", \"target\": {\"x\": 1}} hope it helps")
            .unwrap();
        assert_eq!(value["action"], "stop");
        assert_eq!(value["target"]["x"], 1);
    }

    #[test]
    fn test_non_objects_rejected() {
        assert!(parse_object("no json here").is_none());
        assert!(parse_object("[1, 2, 3]").is_none());
        assert!(parse_object("} backwards {").is_none());
        assert!(parse_object("{not valid json}").is_none());
    }
}
