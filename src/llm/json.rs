//! Pulling a JSON object out of a model reply.

/// Extract the JSON payload from an LLM response.
///
/// Handles fenced code blocks (with or without a `json` tag) and replies
/// with prose around a single object. Falls back to the trimmed response.
pub fn extract_json(response: &str) -> String {
    let response = response.trim();

    if response.starts_with("```json") {
        if let Some(end) = response.rfind("```") {
            let start = "```json".len();
            if end > start {
                return response[start..end].trim().to_string();
            }
        }
    }

    if response.starts_with("```") {
        if let Some(end) = response.rfind("```") {
            let start = response.find('\n').map(|n| n + 1).unwrap_or(3);
            if end > start {
                return response[start..end].trim().to_string();
            }
        }
    }

    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end > start {
                return response[start..=end].to_string();
            }
        }
    }

    response.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        assert_eq!(extract_json(r#" {"a": 1} "#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_fenced_json() {
        let reply = "```json\n{\"correctness\": 1}\n```";
        assert_eq!(extract_json(reply), "{\"correctness\": 1}");
    }

    #[test]
    fn test_untagged_fence() {
        let reply = "```\n{\"question\": \"q\"}\n```";
        assert_eq!(extract_json(reply), "{\"question\": \"q\"}");
    }

    #[test]
    fn test_prose_around_object() {
        let reply = "Here is my verdict: {\"hallucination\": 0} Hope it helps.";
        assert_eq!(extract_json(reply), "{\"hallucination\": 0}");
    }

    #[test]
    fn test_no_json() {
        assert_eq!(extract_json("  YES "), "YES");
    }
}
