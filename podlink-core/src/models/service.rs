//! Connected third-party service types.

use std::collections::BTreeMap;

/// Capitalizes a service identifier for display ("twitter" becomes
/// "Twitter").
pub fn service_display_name(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Builds the service cache wholesale from parsed identifiers.
///
/// An account with no connected services yields an empty map, which is a
/// valid state.
pub fn seed_services<I, S>(ids: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter()
        .map(|id| {
            let id = id.as_ref();
            (id.to_string(), service_display_name(id))
        })
        .collect()
}
