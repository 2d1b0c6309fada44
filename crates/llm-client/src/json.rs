//! Best-effort JSON recovery for model output.
//!
//! Models occasionally wrap their JSON answer in prose or a code fence even
//! when instructed not to. Parsing runs in two stages: a strict parse of the
//! whole text, then a fallback that slices the outermost `{...}` block.
//! Callers get a typed error and can distinguish "no data" from "malformed".

use crate::error::{LlmError, LlmResult};
use serde_json::Value;

/// Parse `text` as a JSON object, tolerating surrounding prose.
pub fn extract_json_object(text: &str) -> LlmResult<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        if value.is_object() {
            return Ok(value);
        }
    }

    let start = text
        .find('{')
        .ok_or_else(|| LlmError::MalformedJson("no JSON object in output".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| LlmError::MalformedJson("unterminated JSON object".to_string()))?;

    serde_json::from_str(&text[start..=end]).map_err(|e| LlmError::MalformedJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_parse() {
        let value = extract_json_object(r#"{"peers": ["MSFT", "GOOGL"]}"#).unwrap();
        assert_eq!(value["peers"][0], "MSFT");
    }

    #[test]
    fn test_fenced_output_recovered() {
        let text = "Here is the answer:\n```json\n{\"kpis\": []}\n```\nDone.";
        let value = extract_json_object(text).unwrap();
        assert!(value["kpis"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_prose_only_is_an_error() {
        let err = extract_json_object("I could not find any KPIs.").unwrap_err();
        assert!(matches!(err, LlmError::MalformedJson(_)));
    }

    #[test]
    fn test_truncated_object_is_an_error() {
        let err = extract_json_object(r#"{"kpis": ["#).unwrap_err();
        assert!(matches!(err, LlmError::MalformedJson(_)));
    }

    #[test]
    fn test_top_level_array_falls_through_to_error() {
        // The contract is an object; a bare array is not accepted.
        let err = extract_json_object(r#"[1, 2, 3]"#).unwrap_err();
        assert!(matches!(err, LlmError::MalformedJson(_)));
    }
}
