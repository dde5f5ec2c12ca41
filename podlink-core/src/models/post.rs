//! Status message payload and response types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::aspect::AspectSelection;

// ============================================================================
// Publish Payload
// ============================================================================

/// Inner status message of a publish payload.
#[derive(Debug, Clone, Serialize)]
pub struct StatusMessage {
    /// Already-rendered post text.
    pub text: String,
    /// Name of the application shown by the pod as the post's origin.
    pub provider_display_name: String,
}

/// JSON body of `POST /status_messages`.
///
/// `extra` is shallow-merged into the top level of the payload and
/// carries caller-supplied keys such as the target services.
#[derive(Debug, Clone, Serialize)]
pub struct PostPayload {
    /// Recipient selection, either `"public"` or a list of aspect ids.
    pub aspect_ids: AspectSelection,
    /// The message itself.
    pub status_message: StatusMessage,
    /// Additional top-level keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PostPayload {
    /// Assembles a publish payload.
    pub fn new(
        text: impl Into<String>,
        provider_display_name: impl Into<String>,
        aspect_ids: AspectSelection,
        extra: Map<String, Value>,
    ) -> Self {
        Self {
            aspect_ids,
            status_message: StatusMessage {
                text: text.into(),
                provider_display_name: provider_display_name.into(),
            },
            extra,
        }
    }
}

// ============================================================================
// Published Post
// ============================================================================

/// A published status message, as returned by the pod on a 201.
#[derive(Debug, Clone)]
pub struct PostRef {
    /// Server-assigned numeric id, when present.
    pub id: Option<u64>,
    /// Server-assigned globally unique id.
    pub guid: String,
    /// Computed permalink, `{pod_url}/posts/{guid}`.
    pub permalink: String,
    /// Publication timestamp, when the pod supplied a parsable one.
    pub created_at: Option<DateTime<Utc>>,
    /// The full response body.
    pub raw: Value,
}

impl PostRef {
    /// Builds a reference from the pod's response body.
    ///
    /// Returns `None` when the body carries no guid, which means the pod
    /// did not actually create a post.
    pub fn from_response(pod_url: &str, raw: Value) -> Option<Self> {
        let guid = raw.get("guid")?.as_str()?.to_string();
        let id = raw.get("id").and_then(Value::as_u64);
        let created_at = raw
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let permalink = format!("{}/posts/{guid}", pod_url.trim_end_matches('/'));

        Some(Self {
            id,
            guid,
            permalink,
            created_at,
            raw,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_serialization() {
        let payload = PostPayload::new(
            "hello",
            "podlink",
            AspectSelection::from_ids(["1", "2"]),
            Map::new(),
        );
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "aspect_ids": ["1", "2"],
                "status_message": {
                    "text": "hello",
                    "provider_display_name": "podlink"
                }
            })
        );
    }

    #[test]
    fn test_extra_keys_merge_into_top_level() {
        let mut extra = Map::new();
        extra.insert("services".to_string(), json!(["twitter"]));
        let payload = PostPayload::new("hi", "podlink", AspectSelection::Public, extra);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["aspect_ids"], json!("public"));
        assert_eq!(value["services"], json!(["twitter"]));
    }

    #[test]
    fn test_post_ref_from_response() {
        let body = json!({
            "id": 42,
            "guid": "abcdef123456",
            "created_at": "2026-01-15T12:00:00Z"
        });
        let post = PostRef::from_response("https://pod.example.org", body).unwrap();
        assert_eq!(post.id, Some(42));
        assert_eq!(post.permalink, "https://pod.example.org/posts/abcdef123456");
        assert!(post.created_at.is_some());
    }

    #[test]
    fn test_post_ref_requires_guid() {
        assert!(PostRef::from_response("https://pod", json!({"id": 1})).is_none());
        assert!(PostRef::from_response("https://pod", Value::Null).is_none());
    }

    #[test]
    fn test_unparsable_timestamp_is_dropped() {
        let body = json!({"guid": "g", "created_at": "yesterday"});
        let post = PostRef::from_response("https://pod", body).unwrap();
        assert!(post.created_at.is_none());
    }
}
