//! Pattern extraction from pod response bodies.
//!
//! Pods offer no structured endpoint for the CSRF token, the aspect
//! list, or the service list; all three ride along inside HTML served
//! for browsers and have to be scraped out by pattern search. The three
//! extractions are independent and tolerate absence: a missing or
//! malformed fragment yields `None`, never an error.

use regex::Regex;
use std::sync::LazyLock;

use podlink_core::Aspect;

// ============================================================================
// Regex Patterns
// ============================================================================

/// CSRF meta tag with the name attribute first.
static TOKEN_NAME_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta[^>]*name="csrf-token"[^>]*content="([^"]*)""#).expect("Invalid regex")
});

/// CSRF meta tag with the content attribute first.
static TOKEN_CONTENT_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta[^>]*content="([^"]*)"[^>]*name="csrf-token""#).expect("Invalid regex")
});

// ============================================================================
// Extractors
// ============================================================================

/// Extracts the CSRF token from a meta tag, tolerating either attribute
/// order. An empty content attribute counts as absent.
pub fn extract_token(body: &str) -> Option<String> {
    TOKEN_NAME_FIRST_RE
        .captures(body)
        .or_else(|| TOKEN_CONTENT_FIRST_RE.captures(body))
        .map(|captures| captures[1].to_string())
        .filter(|token| !token.is_empty())
}

/// Extracts the aspect entries embedded after the literal `"aspects":`
/// key anywhere in the body.
pub fn extract_aspects(body: &str) -> Option<Vec<Aspect>> {
    let fragment = json_array_after_key(body, r#""aspects":"#)?;
    serde_json::from_str(fragment).ok()
}

/// Extracts the service identifiers embedded after the literal
/// `"configured_services":` key anywhere in the body.
pub fn extract_services(body: &str) -> Option<Vec<String>> {
    let fragment = json_array_after_key(body, r#""configured_services":"#)?;
    serde_json::from_str(fragment).ok()
}

/// Returns the balanced JSON array literal that follows `key`, if any.
///
/// The scan is string- and escape-aware so brackets inside string values
/// do not unbalance the depth count.
fn json_array_after_key<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    let after_key = &body[body.find(key)? + key.len()..];
    let start = after_key.find(|c: char| !c.is_whitespace())?;
    let bytes = after_key.as_bytes();
    if bytes[start] != b'[' {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&after_key[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_name_attribute_first() {
        let body = r#"<head><meta name="csrf-token" content="tok1" /></head>"#;
        assert_eq!(extract_token(body), Some("tok1".to_string()));
    }

    #[test]
    fn test_token_content_attribute_first() {
        let body = r#"<head><meta content="tok2" name="csrf-token" /></head>"#;
        assert_eq!(extract_token(body), Some("tok2".to_string()));
    }

    #[test]
    fn test_empty_token_counts_as_absent() {
        let body = r#"<meta name="csrf-token" content="" />"#;
        assert_eq!(extract_token(body), None);
    }

    #[test]
    fn test_token_absent() {
        assert_eq!(extract_token("<html><body>nothing here</body></html>"), None);
    }

    #[test]
    fn test_aspects_from_embedded_json() {
        let body = r#"window.gon={"preloads":{"aspects":[{"id":1,"name":"Family"},{"id":2,"name":"Work"}],"x":1}};"#;
        let aspects = extract_aspects(body).unwrap();
        assert_eq!(aspects.len(), 2);
        assert_eq!(aspects[0].id, 1);
        assert_eq!(aspects[0].name, "Family");
    }

    #[test]
    fn test_aspects_empty_array() {
        let body = r#"{"aspects":[],"configured_services":[]}"#;
        assert_eq!(extract_aspects(body), Some(Vec::new()));
    }

    #[test]
    fn test_aspects_tolerate_brackets_inside_strings() {
        let body = r#""aspects":[{"id":3,"name":"[weird] name"}]"#;
        let aspects = extract_aspects(body).unwrap();
        assert_eq!(aspects[0].name, "[weird] name");
    }

    #[test]
    fn test_malformed_json_after_key_is_absent() {
        assert_eq!(extract_aspects(r#""aspects":[{"id":}]"#), None);
        assert_eq!(extract_aspects(r#""aspects":[{"id":1"#), None);
        assert_eq!(extract_aspects(r#""aspects": {"id":1}"#), None);
    }

    #[test]
    fn test_services_list() {
        let body = r#""configured_services":["twitter","tumblr"]"#;
        assert_eq!(
            extract_services(body),
            Some(vec!["twitter".to_string(), "tumblr".to_string()])
        );
    }

    #[test]
    fn test_extractions_are_independent() {
        let body = r#"<meta name="csrf-token" content="tok" />"#;
        assert!(extract_token(body).is_some());
        assert!(extract_aspects(body).is_none());
        assert!(extract_services(body).is_none());
    }
}
