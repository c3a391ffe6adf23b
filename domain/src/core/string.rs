//! String helpers used when rendering values for humans.

use serde_json::Value;

/// Truncate a string to a maximum byte length with ellipsis (UTF-8 safe)
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// One-line preview of a JSON value: strings unquoted, everything else compact.
pub fn preview(value: &Value, max_len: usize) -> String {
    let text = match value {
        Value::String(s) => s.replace('\n', " "),
        other => other.to_string(),
    };
    truncate(&text, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate("protocol", 10), "protocol");
        assert_eq!(truncate("delegate_to_writer", 11), "delegate...");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // "é" is two bytes; cutting at byte 4 would split it.
        assert_eq!(truncate("cafébabe", 9), "cafébabe");
        assert_eq!(truncate("cafébabe", 8), "café...");
        assert_eq!(truncate("caféébabe", 7), "caf...");
    }

    #[test]
    fn test_preview_values() {
        assert_eq!(preview(&json!("line one\nline two"), 40), "line one line two");
        assert_eq!(preview(&json!({"id": 42}), 40), "{\"id\":42}");
        assert_eq!(preview(&json!([1, 2, 3, 4, 5, 6]), 8), "[1,2,...");
    }
}
