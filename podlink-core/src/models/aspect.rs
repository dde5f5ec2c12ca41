//! Aspect (recipient group) types.
//!
//! An aspect is a named group of contacts a post can be shared with. The
//! pod reserves the `public` aspect for posts visible to everyone; it is
//! never listed by the server and is always seeded locally.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Reserved aspect id visible to everyone.
pub const PUBLIC_ASPECT_ID: &str = "public";

/// Display name of the reserved public aspect.
pub const PUBLIC_ASPECT_NAME: &str = "Public";

// ============================================================================
// Aspect
// ============================================================================

/// One aspect entry as embedded in the pod's bookmarklet page.
///
/// The pod serializes more fields than these; unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Aspect {
    /// Server-assigned aspect id.
    pub id: u64,
    /// User-chosen display name.
    pub name: String,
}

/// Builds the aspect cache from parsed entries.
///
/// The synthetic public entry is always present, even when the account
/// has no personal aspects.
pub fn seed_aspects(parsed: &[Aspect]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert(PUBLIC_ASPECT_ID.to_string(), PUBLIC_ASPECT_NAME.to_string());
    for aspect in parsed {
        map.insert(aspect.id.to_string(), aspect.name.clone());
    }
    map
}

// ============================================================================
// Aspect Selection
// ============================================================================

/// Recipient selection for a new post.
///
/// The wire protocol accepts either the literal string `"public"` or an
/// array of aspect id strings for `aspect_ids`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AspectSelection {
    /// Share with everyone.
    Public,
    /// Share with the given aspect ids only.
    Ids(Vec<String>),
}

impl AspectSelection {
    /// Normalizes a caller-supplied aspect list.
    ///
    /// Blank entries are dropped; an empty selection, or any entry equal
    /// to the reserved public id, collapses the whole selection to
    /// [`AspectSelection::Public`].
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cleaned: Vec<String> = ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        if cleaned.is_empty() || cleaned.iter().any(|id| id == PUBLIC_ASPECT_ID) {
            Self::Public
        } else {
            Self::Ids(cleaned)
        }
    }

    /// Returns true when the selection is the reserved public aspect.
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }
}

impl Serialize for AspectSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Public => serializer.serialize_str(PUBLIC_ASPECT_ID),
            Self::Ids(ids) => ids.serialize(serializer),
        }
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
    fn test_empty_selection_is_public() {
        let selection = AspectSelection::from_ids(Vec::<&str>::new());
        assert!(selection.is_public());
    }

    #[test]
    fn test_public_entry_collapses_selection() {
        let selection = AspectSelection::from_ids(["public", "1"]);
        assert!(selection.is_public());
    }

    #[test]
    fn test_id_selection_survives() {
        let selection = AspectSelection::from_ids(["1", "2"]);
        assert_eq!(selection, AspectSelection::Ids(vec!["1".into(), "2".into()]));
    }

    #[test]
    fn test_blank_entries_dropped() {
        let selection = AspectSelection::from_ids(["", "  ", "3"]);
        assert_eq!(selection, AspectSelection::Ids(vec!["3".into()]));
    }

    #[test]
    fn test_serialization_forms() {
        let public = serde_json::to_value(AspectSelection::from_ids(["public"])).unwrap();
        assert_eq!(public, json!("public"));

        let ids = serde_json::to_value(AspectSelection::from_ids(["1", "2"])).unwrap();
        assert_eq!(ids, json!(["1", "2"]));
    }

    #[test]
    fn test_seed_aspects_always_has_public() {
        let map = seed_aspects(&[]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("public").map(String::as_str), Some("Public"));

        let map = seed_aspects(&[Aspect {
            id: 1,
            name: "Family".to_string(),
        }]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("1").map(String::as_str), Some("Family"));
        assert_eq!(map.get("public").map(String::as_str), Some("Public"));
    }

    #[test]
    fn test_aspect_tolerates_extra_keys() {
        let json = r#"{"id": 7, "name": "Work", "selected": true, "chat_enabled": false}"#;
        let aspect: Aspect = serde_json::from_str(json).unwrap();
        assert_eq!(aspect.id, 7);
        assert_eq!(aspect.name, "Work");
    }
}
