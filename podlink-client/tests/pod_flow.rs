//! End-to-end client flows against the in-process mock pod.
//!
//! Starts the fake pod on a random port and exercises the full
//! handshake, publishing, deletion, and list-fetching surface over real
//! HTTP. The mock's per-route hit counters make request counts
//! observable, so token caching and login short-circuiting can be
//! asserted rather than assumed.

use std::sync::Arc;

use mock_pod::PodState;
use podlink_client::PodClient;
use podlink_core::ErrorKind;
use serde_json::{json, Map};

async fn start_pod() -> (Arc<PodState>, PodClient) {
    let state = PodState::shared();
    let addr = mock_pod::spawn(state.clone()).await.unwrap();
    let client = PodClient::new(&addr.to_string(), false).unwrap();
    (state, client)
}

async fn logged_in() -> (Arc<PodState>, PodClient) {
    let (state, mut client) = start_pod().await;
    client.init().await.unwrap();
    client.login("alice", "secret", false).await.unwrap();
    (state, client)
}

// ============================================================================
// Init
// ============================================================================

#[tokio::test]
async fn init_fetches_and_caches_the_token() {
    let (state, mut client) = start_pod().await;

    client.init().await.unwrap();
    assert_eq!(client.token(), "tok-1");
    assert!(!client.has_last_error());

    // A second init reuses the cached token without a request.
    client.init().await.unwrap();
    assert_eq!(state.hits().await.sign_in_get, 1);
}

#[tokio::test]
async fn init_fails_when_no_token_is_served() {
    let (state, mut client) = start_pod().await;
    state.set_token("").await;

    let error = client.init().await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InitFailed);
    assert_eq!(error.aux_value("help_tag"), Some("init-failed"));
    assert!(client.has_last_error());
    assert!(client.token().is_empty());
}

#[tokio::test]
async fn deinit_forces_a_fresh_token_fetch() {
    let (state, mut client) = start_pod().await;
    client.init().await.unwrap();

    client.deinit();
    assert!(client.token().is_empty());

    client.init().await.unwrap();
    assert_eq!(state.hits().await.sign_in_get, 2);
}

#[tokio::test]
async fn retargeting_discards_the_token() {
    let (_state, mut client) = start_pod().await;
    client.init().await.unwrap();
    assert!(!client.token().is_empty());

    client.set_pod("other.example.org", true).unwrap();
    assert!(client.token().is_empty());
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn login_requires_init() {
    let (state, mut client) = start_pod().await;

    let error = client.login("alice", "secret", false).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotInitialized);
    assert!(!client.is_logged_in());
    assert_eq!(state.hits().await.sign_in_post, 0);
}

#[tokio::test]
async fn login_rejects_empty_credentials_without_a_request() {
    let (state, mut client) = start_pod().await;
    client.init().await.unwrap();

    for (username, password) in [("", "secret"), ("alice", "")] {
        let error = client.login(username, password, false).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidCredentials);
        assert!(!client.is_logged_in());
    }
    assert_eq!(state.hits().await.sign_in_post, 0);
}

#[tokio::test]
async fn login_handshake_confirms_the_session() {
    let (state, mut client) = start_pod().await;
    client.init().await.unwrap();

    client.login("alice", "secret", false).await.unwrap();
    assert!(client.is_logged_in());
    assert!(!client.has_last_error());

    let hits = state.hits().await;
    assert_eq!(hits.sign_in_post, 1);
    assert_eq!(hits.bookmarklet, 1);
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let (_state, mut client) = start_pod().await;
    client.init().await.unwrap();

    // The pod redirects on a failed login exactly as it does on a
    // successful one; only the confirmation probe tells them apart.
    let error = client.login("alice", "wrong", false).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::LoginFailed);
    assert!(!client.is_logged_in());
}

#[tokio::test]
async fn repeat_login_short_circuits_unless_forced() {
    let (state, mut client) = logged_in().await;
    let baseline = state.hits().await;

    client.login("alice", "secret", false).await.unwrap();
    let after_repeat = state.hits().await;
    assert_eq!(after_repeat.sign_in_post, baseline.sign_in_post);
    assert_eq!(after_repeat.bookmarklet, baseline.bookmarklet);

    client.login("alice", "secret", true).await.unwrap();
    let after_forced = state.hits().await;
    assert_eq!(after_forced.sign_in_post, baseline.sign_in_post + 1);
    assert_eq!(after_forced.bookmarklet, baseline.bookmarklet + 1);
}

// ============================================================================
// Publishing
// ============================================================================

#[tokio::test]
async fn post_requires_login() {
    let (_state, mut client) = start_pod().await;
    client.init().await.unwrap();

    let error = client.post("hi", &[], Map::new()).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotLoggedIn);
    assert!(client.has_last_error());
}

#[tokio::test]
async fn post_publishes_with_a_permalink() {
    let (state, mut client) = logged_in().await;

    let post = client.post("hello pod", &[], Map::new()).await.unwrap();
    assert!(!post.guid.is_empty());
    assert_eq!(
        post.permalink,
        format!("{}/{}", client.pod_url("posts"), post.guid)
    );
    assert!(post.created_at.is_some());
    assert!(!client.has_last_error());

    let published = state.published().await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0]["status_message"]["text"], json!("hello pod"));
    assert_eq!(
        published[0]["status_message"]["provider_display_name"],
        json!("podlink-client")
    );
}

#[tokio::test]
async fn post_collapses_public_selections() {
    let (state, mut client) = logged_in().await;

    client.post("one", &[], Map::new()).await.unwrap();
    client.post("two", &["public", "1"], Map::new()).await.unwrap();
    client.post("three", &["1", "2"], Map::new()).await.unwrap();

    let published = state.published().await;
    assert_eq!(published[0]["aspect_ids"], json!("public"));
    assert_eq!(published[1]["aspect_ids"], json!("public"));
    assert_eq!(published[2]["aspect_ids"], json!(["1", "2"]));
}

#[tokio::test]
async fn post_merges_extra_data_into_the_payload() {
    let (state, mut client) = logged_in().await;

    let mut extra = Map::new();
    extra.insert("services".to_string(), json!(["twitter"]));
    client.post("relayed", &[], extra).await.unwrap();

    let published = state.published().await;
    assert_eq!(published[0]["services"], json!(["twitter"]));
}

#[tokio::test]
async fn post_refetches_the_token_before_writing() {
    let (state, mut client) = logged_in().await;

    // The pod rotates its token after login; a stale cached token
    // would be rejected with a 422.
    state.set_token("tok-2").await;
    client.post("fresh", &[], Map::new()).await.unwrap();
    assert_eq!(client.token(), "tok-2");
}

// ============================================================================
// Deletion
// ============================================================================

#[tokio::test]
async fn delete_maps_statuses_to_messages() {
    let (state, mut client) = logged_in().await;
    state.add_post("1", true).await;
    state.add_post("2", false).await;

    client.delete("post", "1").await.unwrap();

    let error = client.delete("post", "1").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::DeleteFailed);
    assert_eq!(error.message(), "the post does not exist");

    let error = client.delete("post", "2").await.unwrap_err();
    assert_eq!(error.message(), "the post does not belong to you");
}

#[tokio::test]
async fn delete_handles_comments() {
    let (state, mut client) = logged_in().await;
    state.add_comment("9", true).await;

    client.delete("comment", "9").await.unwrap();

    let error = client.delete("comment", "9").await.unwrap_err();
    assert_eq!(error.message(), "the comment does not exist");
}

#[tokio::test]
async fn delete_rejects_unknown_kinds_without_a_request() {
    let (state, mut client) = start_pod().await;
    client.init().await.unwrap();

    let error = client.delete("internet", "x").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::DeleteFailed);
    assert_eq!(error.message(), "only posts and comments can be deleted");
    assert_eq!(state.hits().await.deletes, 0);
}

// ============================================================================
// Lists
// ============================================================================

#[tokio::test]
async fn aspects_require_login() {
    let (_state, mut client) = start_pod().await;
    client.init().await.unwrap();

    let error = client.aspects(false).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotLoggedIn);
}

#[tokio::test]
async fn aspects_always_include_public() {
    let (state, mut client) = logged_in().await;

    let aspects = client.aspects(true).await.unwrap();
    assert_eq!(aspects.len(), 1);
    assert_eq!(aspects.get("public").map(String::as_str), Some("Public"));

    state.set_aspects(vec![(1, "Family".to_string())]).await;
    let aspects = client.aspects(true).await.unwrap();
    assert_eq!(aspects.len(), 2);
    assert_eq!(aspects.get("1").map(String::as_str), Some("Family"));
    assert_eq!(aspects.get("public").map(String::as_str), Some("Public"));
}

#[tokio::test]
async fn aspects_are_cached_until_forced() {
    let (state, mut client) = logged_in().await;
    state.set_aspects(vec![(1, "Family".to_string())]).await;

    let first = client.aspects(false).await.unwrap();
    let baseline = state.hits().await.bookmarklet;

    // The server changes, but the cache answers.
    state.set_aspects(vec![(2, "Work".to_string())]).await;
    let cached = client.aspects(false).await.unwrap();
    assert_eq!(cached, first);
    assert_eq!(state.hits().await.bookmarklet, baseline);

    let refreshed = client.aspects(true).await.unwrap();
    assert!(refreshed.contains_key("2"));
    assert!(!refreshed.contains_key("1"));
}

#[tokio::test]
async fn services_are_titlecased() {
    let (state, mut client) = logged_in().await;

    let services = client.services(true).await.unwrap();
    assert!(services.is_empty());

    state
        .set_services(vec!["twitter".to_string(), "tumblr".to_string()])
        .await;
    let services = client.services(true).await.unwrap();
    assert_eq!(services.get("twitter").map(String::as_str), Some("Twitter"));
    assert_eq!(services.get("tumblr").map(String::as_str), Some("Tumblr"));
}

// ============================================================================
// Error stickiness
// ============================================================================

#[tokio::test]
async fn errors_are_sticky_until_taken_or_overwritten() {
    let (_state, mut client) = start_pod().await;
    client.init().await.unwrap();

    let _ = client.post("hi", &[], Map::new()).await.unwrap_err();
    assert!(client.has_last_error());
    assert_eq!(
        client.last_error().map(podlink_core::PodError::kind),
        Some(ErrorKind::NotLoggedIn)
    );

    let taken = client.take_last_error().unwrap();
    assert_eq!(taken.kind(), ErrorKind::NotLoggedIn);
    assert!(!client.has_last_error());

    // A successful operation never leaves a stale error behind.
    client.login("alice", "secret", false).await.unwrap();
    assert!(!client.has_last_error());
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn token_bootstrap_then_unauthenticated_post() {
    let (state, mut client) = start_pod().await;
    state.set_token("tok1").await;

    client.init().await.unwrap();
    assert_eq!(client.token(), "tok1");

    let error = client.post("hi", &[], Map::new()).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotLoggedIn);
}
