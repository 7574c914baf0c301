//! Small parsing helpers shared by the LLM-backed components.

/// Strip Markdown code fences from an LLM response.
///
/// Models frequently wrap JSON in ```` ```json ```` blocks despite being
/// asked not to; grading and parsing always go through this first.
pub(crate) fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Try to parse an LLM response as a JSON array of strings.
///
/// Returns `None` when the response is not a JSON array; callers fall back
/// to their own regex extraction.
pub(crate) fn parse_string_array(text: &str) -> Option<Vec<String>> {
    let cleaned = strip_code_fences(text);
    let values: Vec<serde_json::Value> = serde_json::from_str(&cleaned).ok()?;
    Some(
        values
            .into_iter()
            .filter_map(|value| match value {
                serde_json::Value::String(s) => {
                    let trimmed = s.trim().to_string();
                    (!trimmed.is_empty()).then_some(trimmed)
                }
                _ => None,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("plain"), "plain");
    }

    #[test]
    fn test_parse_string_array() {
        assert_eq!(
            parse_string_array(r#"["a", "b", "  "]"#),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(parse_string_array("not json"), None);
        // Non-string elements are dropped, not fatal.
        assert_eq!(parse_string_array(r#"["a", 3]"#), Some(vec!["a".to_string()]));
    }
}
