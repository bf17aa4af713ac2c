//! Best-effort scalar extraction from raw response bodies
//!
//! The default strategy is a positional text scan that matches the wire
//! format of the API under test (compact JSON, no pretty-printing around
//! the fields of interest). It deliberately does not parse JSON: find the
//! key literal, take everything up to the next `,` or `}`, strip one layer
//! of quotes. A quoted value containing a comma defeats the scan; that
//! limitation is kept for compatibility with the responses this tool was
//! written against. An opt-in structured strategy parses the body with
//! serde_json instead.

use crate::common::Extractor;

/// Outcome of looking up a field in a response body
///
/// Absence is a value, not an error: the runner uses it to skip dependent
/// steps instead of aborting the scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Value(String),
    NotFound,
}

impl Extracted {
    pub fn is_found(&self) -> bool {
        matches!(self, Extracted::Value(_))
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            Extracted::Value(v) => Some(v),
            Extracted::NotFound => None,
        }
    }
}

/// Extract a field using the given strategy
pub fn extract(strategy: Extractor, body: &str, field: &str) -> Extracted {
    match strategy {
        Extractor::Scan => scan_field(body, field),
        Extractor::Structured => json_field(body, field),
    }
}

/// Positional text scan for `"<field>":`
///
/// Returns the substring between the key literal and the first `,` or `}`
/// after it, trimmed, with one layer of surrounding double quotes removed.
pub fn scan_field(body: &str, field: &str) -> Extracted {
    let needle = format!("\"{field}\":");
    let start = match body.find(&needle) {
        Some(pos) => pos + needle.len(),
        None => return Extracted::NotFound,
    };

    let rest = &body[start..];
    let end = match (rest.find(','), rest.find('}')) {
        (Some(comma), Some(brace)) => comma.min(brace),
        (Some(comma), None) => comma,
        (None, Some(brace)) => brace,
        (None, None) => return Extracted::NotFound,
    };

    let raw = rest[..end].trim();
    let value = raw
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(raw);

    Extracted::Value(value.to_string())
}

/// Structured lookup of a top-level scalar field
///
/// Non-scalar values (objects, arrays) and unparseable bodies report
/// not-found, matching the scan strategy's best-effort contract.
pub fn json_field(body: &str, field: &str) -> Extracted {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return Extracted::NotFound,
    };

    match value.get(field) {
        Some(serde_json::Value::String(s)) => Extracted::Value(s.clone()),
        Some(serde_json::Value::Number(n)) => Extracted::Value(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Extracted::Value(b.to_string()),
        _ => Extracted::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_integer_before_comma() {
        let body = r#"{"id":123,"name":"Yellow Onion"}"#;
        assert_eq!(scan_field(body, "id"), Extracted::Value("123".to_string()));
    }

    #[test]
    fn scan_integer_before_closing_brace() {
        let body = r#"{"name":"Yellow Onion","id":7}"#;
        assert_eq!(scan_field(body, "id"), Extracted::Value("7".to_string()));
    }

    #[test]
    fn scan_strips_one_layer_of_quotes() {
        let body = r#"{"slug":"test-product-2","id":4}"#;
        assert_eq!(
            scan_field(body, "slug"),
            Extracted::Value("test-product-2".to_string())
        );
    }

    #[test]
    fn scan_tolerates_space_after_colon_value() {
        let body = r#"{"id": 42, "name": "x"}"#;
        assert_eq!(scan_field(body, "id"), Extracted::Value("42".to_string()));
    }

    #[test]
    fn missing_field_is_not_found() {
        let body = r#"{"name":"Yellow Onion"}"#;
        assert_eq!(scan_field(body, "id"), Extracted::NotFound);
    }

    #[test]
    fn missing_delimiter_is_not_found() {
        assert_eq!(scan_field(r#"{"id":123"#, "id"), Extracted::NotFound);
    }

    #[test]
    fn empty_body_is_not_found() {
        assert_eq!(scan_field("", "id"), Extracted::NotFound);
    }

    // Pins the documented limitation: a quoted value containing a comma is
    // truncated at the comma. Behavior-compatible with the original scan.
    #[test]
    fn scan_truncates_quoted_value_at_comma() {
        let body = r#"{"description":"red, ripe","id":9}"#;
        assert_eq!(
            scan_field(body, "description"),
            Extracted::Value("\"red".to_string())
        );
    }

    #[test]
    fn structured_reads_numbers_and_strings() {
        let body = r#"{"id":123,"slug":"test-product","active":true}"#;
        assert_eq!(json_field(body, "id"), Extracted::Value("123".to_string()));
        assert_eq!(
            json_field(body, "slug"),
            Extracted::Value("test-product".to_string())
        );
        assert_eq!(
            json_field(body, "active"),
            Extracted::Value("true".to_string())
        );
    }

    #[test]
    fn structured_rejects_non_scalars_and_garbage() {
        assert_eq!(json_field(r#"{"items":[1,2]}"#, "items"), Extracted::NotFound);
        assert_eq!(json_field("not json at all", "id"), Extracted::NotFound);
    }

    #[test]
    fn structured_handles_comma_in_string() {
        let body = r#"{"description":"red, ripe","id":9}"#;
        assert_eq!(
            json_field(body, "description"),
            Extracted::Value("red, ripe".to_string())
        );
    }
}
