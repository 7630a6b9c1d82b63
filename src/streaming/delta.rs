use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ChatStreamResponse {
    #[serde(default)]
    choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    #[serde(default)]
    delta: Option<ChatDelta>,
}

#[derive(Debug, Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract `choices[0].delta.content` from one stream line.
///
/// Empty lines, `data: [DONE]` and deltas without content all yield
/// `Ok(None)`. SSE framing (`data: ` prefix) is stripped when present.
pub fn parse_delta_line(line: &str) -> Result<Option<String>, serde_json::Error> {
    let line = line.trim();
    let data = line.strip_prefix("data:").map(str::trim_start).unwrap_or(line);
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let response: ChatStreamResponse = serde_json::from_str(data)?;
    Ok(response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_delta() {
        let line = r#"{"choices":[{"delta":{"content":"Hello. "}}]}"#;
        assert_eq!(parse_delta_line(line).unwrap().as_deref(), Some("Hello. "));
    }

    #[test]
    fn test_missing_content_is_not_an_error() {
        assert_eq!(
            parse_delta_line(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap(),
            None
        );
        assert_eq!(
            parse_delta_line(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap(),
            None
        );
        assert_eq!(parse_delta_line(r#"{"choices":[]}"#).unwrap(), None);
        assert_eq!(
            parse_delta_line(r#"{"choices":[{"delta":{"content":null}}]}"#).unwrap(),
            None
        );
    }

    #[test]
    fn test_sse_framing() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#;
        assert_eq!(parse_delta_line(line).unwrap().as_deref(), Some("Hi"));
        assert_eq!(parse_delta_line("data: [DONE]").unwrap(), None);
    }

    #[test]
    fn test_malformed_line() {
        assert!(parse_delta_line("not-json").is_err());
        assert!(parse_delta_line(r#"{"choices":[{"delta":"#).is_err());
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse_delta_line("").unwrap(), None);
        assert_eq!(parse_delta_line("   ").unwrap(), None);
    }
}
