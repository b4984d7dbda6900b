//! Types for the LLM conversation coach.

use serde_json::Value;

use crate::Error;

/// Tunable options for a coach request.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub model: String,
    /// Caps generated length.
    pub max_tokens: u32,
    /// Response randomness, 0.0 (deterministic) to 1.0 (max variation).
    pub temperature: f32,
    /// Replaces the default framing instruction when set.
    pub system_prompt: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            model: "claude-3-7-sonnet-20250219".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            system_prompt: None,
        }
    }
}

/// Pull the single JSON document out of a free-form model reply.
///
/// Tries a fenced code block first, then the outermost `{ ... }` span.
pub fn extract_json(reply: &str) -> Result<Value, Error> {
    if let Some(block) = fenced_block(reply) {
        if let Ok(value) = serde_json::from_str::<Value>(block) {
            return Ok(value);
        }
    }

    let start = reply.find('{');
    let end = reply.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&reply[start..=end])
            .map_err(|e| {
                Error::MalformedUpstreamJson(format!("reply does not contain valid JSON: {}", e))
            }),
        _ => Err(Error::MalformedUpstreamJson(
            "reply does not contain a JSON object".to_string(),
        )),
    }
}

fn fenced_block(reply: &str) -> Option<&str> {
    let open = reply.find("```")?;
    let after_fence = &reply[open + 3..];
    // Skip an info string such as `json` up to the end of the fence line.
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_fenced_block() {
        let reply = "Here is the analysis:\n```json\n{\"conversation_summary\": \"ok\"}\n```\nThanks";
        let value = extract_json(reply).unwrap();
        assert_eq!(value["conversation_summary"], "ok");
    }

    #[test]
    fn test_falls_back_to_outer_braces() {
        let reply = "Sure! {\"a\": {\"b\": 1}} hope that helps";
        let value = extract_json(reply).unwrap();
        assert_eq!(value["a"]["b"], 1);
    }

    #[test]
    fn test_invalid_fenced_block_falls_back_to_braces() {
        let reply = "```\nnot json\n```\n{\"a\": 2}";
        assert_eq!(extract_json(reply).unwrap()["a"], 2);
    }

    #[test]
    fn test_prose_without_json_is_malformed() {
        let err = extract_json("I could not analyze this conversation.").unwrap_err();
        assert!(matches!(err, Error::MalformedUpstreamJson(_)));
    }

    #[test]
    fn test_broken_json_is_malformed() {
        let err = extract_json("{\"a\": }").unwrap_err();
        assert!(matches!(err, Error::MalformedUpstreamJson(_)));
    }
}
