use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::ExtractError;
use crate::schema::ExtractedInfo;

/// Parse completion content into JSON.
///
/// Strict parse first. Then the body of a markdown code fence, then the
/// outermost `{...}` span. Content that still isn't JSON comes back as a
/// plain string value and is rejected later by the `results` check.
pub fn parse_completion(content: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(content) {
        return value;
    }

    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap());
    if let Some(body) = fence.captures(content).and_then(|c| c.get(1)) {
        if let Ok(value) = serde_json::from_str::<Value>(body.as_str()) {
            return value;
        }
    }

    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&content[start..=end]) {
                return value;
            }
        }
    }

    debug!("Completion content is not JSON, keeping it as raw text");
    Value::String(content.to_string())
}

/// Map `{"results": [{"field", "value"}]}` into extracted rows, keeping the
/// model's order.
pub fn extract_results(reply: Value) -> Result<Vec<ExtractedInfo>, ExtractError> {
    let has_results = reply.get("results").is_some_and(Value::is_array);
    if !has_results {
        return Err(ExtractError::InvalidFormat);
    }

    let mut info = Vec::new();
    for item in reply["results"].as_array().into_iter().flatten() {
        let Some(name) = item.get("field").and_then(Value::as_str) else {
            debug!(item = %item, "Skipping result without a field name");
            continue;
        };

        info.push(ExtractedInfo {
            name: name.trim().to_string(),
            value: normalize_value(item.get("value").unwrap_or(&Value::Null)),
        });
    }

    Ok(info)
}

/// Model placeholders for "don't know" become `None`.
pub fn normalize_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            let lower = trimmed.to_lowercase();
            if trimmed.is_empty() || lower == "unknown" || lower == "null" || lower == "n/a" {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_json() {
        let value = parse_completion(r#"{"results": []}"#);
        assert_eq!(value, json!({"results": []}));
    }

    #[test]
    fn test_fenced_json() {
        let content = "Here you go:\n```json\n{\"results\": [{\"field\": \"A\", \"value\": \"1\"}]}\n```";
        let value = parse_completion(content);
        assert_eq!(value["results"][0]["field"], "A");
    }

    #[test]
    fn test_embedded_object() {
        let content = "Sure! {\"results\": [{\"field\": \"A\", \"value\": null}]} Hope that helps.";
        let value = parse_completion(content);
        assert!(value["results"].is_array());
    }

    #[test]
    fn test_plain_text_is_invalid_format() {
        let value = parse_completion("I could not find that company.");
        assert!(value.is_string());
        assert!(matches!(extract_results(value), Err(ExtractError::InvalidFormat)));
    }

    #[test]
    fn test_missing_results_key() {
        let err = extract_results(json!({"data": []})).unwrap_err();
        assert_eq!(err.to_string(), "Invalid response format from API");
    }

    #[test]
    fn test_results_mapping() {
        let reply = json!({
            "results": [
                {"field": "Primary country of residence", "value": "USA"},
                {"field": "Estimated company size (employees)", "value": 250},
                {"field": "Primary language spoken", "value": "Unknown"},
                {"value": "orphan"},
                {"field": "Public", "value": true}
            ]
        });

        let info = extract_results(reply).unwrap();
        assert_eq!(info.len(), 4);
        assert_eq!(info[0].name, "Primary country of residence");
        assert_eq!(info[0].value.as_deref(), Some("USA"));
        assert_eq!(info[1].value.as_deref(), Some("250"));
        assert_eq!(info[2].value, None);
        assert_eq!(info[3].value.as_deref(), Some("true"));
    }

    #[test]
    fn test_normalize_placeholders() {
        assert_eq!(normalize_value(&json!("  N/A ")), None);
        assert_eq!(normalize_value(&json!("null")), None);
        assert_eq!(normalize_value(&json!("")), None);
        assert_eq!(normalize_value(&json!(" Berlin ")).as_deref(), Some("Berlin"));
    }
}
