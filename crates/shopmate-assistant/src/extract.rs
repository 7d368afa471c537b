//! Structured-output extraction from free generation text.
//!
//! Backends are asked for JSON but often wrap it in prose or code fences.
//! [`parse_structured`] accepts the reply as-is when it is valid JSON and
//! otherwise makes exactly one repair: parse the span from the first `{` to
//! the last `}`.

use serde::de::DeserializeOwned;

/// Why a generation reply could not be turned into the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON object found in reply")]
    NoJsonObject,
    #[error("malformed JSON: {0}")]
    Malformed(String),
}

/// Parse `raw` as `T`, strictly first, then via the brace-span repair.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, ExtractError> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return Ok(value);
    }

    let span = json_object_span(trimmed).ok_or(ExtractError::NoJsonObject)?;
    serde_json::from_str::<T>(span).map_err(|e| ExtractError::Malformed(e.to_string()))
}

/// Slice from the first `{` through the last `}`, if both exist in order.
pub fn json_object_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Verdict {
        ok: bool,
        #[serde(default)]
        items: Vec<String>,
    }

    #[test]
    fn test_strict_json_accepted() {
        let v: Verdict = parse_structured(r#"  {"ok": true, "items": ["a"]}  "#).unwrap();
        assert_eq!(v, Verdict { ok: true, items: vec!["a".into()] });
    }

    #[test]
    fn test_code_fenced_json_repaired() {
        let raw = "```json\n{\"ok\": false}\n```";
        let v: Verdict = parse_structured(raw).unwrap();
        assert!(!v.ok);
    }

    #[test]
    fn test_prose_wrapped_json_repaired() {
        let raw = "Sure! Here is my analysis: {\"ok\": true, \"items\": [\"x\", \"y\"]} Hope that helps.";
        let v: Verdict = parse_structured(raw).unwrap();
        assert_eq!(v.items.len(), 2);
    }

    #[test]
    fn test_nested_braces_use_outermost_span() {
        let raw = "Result: {\"ok\": true, \"meta\": {\"depth\": 2}} end";
        let v: Verdict = parse_structured(raw).unwrap();
        assert!(v.ok);
    }

    #[test]
    fn test_truncated_json_rejected() {
        let raw = "{\"ok\": true, \"items\": [\"a\"";
        let err = parse_structured::<Verdict>(raw).unwrap_err();
        assert!(matches!(err, ExtractError::NoJsonObject));
    }

    #[test]
    fn test_truncated_inner_object_is_malformed() {
        let raw = "{\"ok\": true, \"items\": [\"a\", {\"b\": 1}";
        let err = parse_structured::<Verdict>(raw).unwrap_err();
        assert!(matches!(err, ExtractError::Malformed(_)));
    }

    #[test]
    fn test_no_braces_at_all() {
        let err = parse_structured::<Verdict>("I cannot help with that.").unwrap_err();
        assert!(matches!(err, ExtractError::NoJsonObject));
    }

    #[test]
    fn test_reversed_braces() {
        assert_eq!(json_object_span("} oops {"), None);
        assert_eq!(json_object_span("a {x} b"), Some("{x}"));
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let err = parse_structured::<Verdict>("{\"items\": []}").unwrap_err();
        assert!(matches!(err, ExtractError::Malformed(_)));
    }
}
