//! In-process fake pod used by integration tests.
//!
//! Emulates the handful of endpoints a pod client touches: the sign-in
//! page and form, the bookmarklet resource, publishing, and deletion.
//! Tests mutate the shared [`PodState`] to stage fixtures and read the
//! per-route hit counters to observe how many requests the client made.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Session cookie issued by the fake pod.
const SESSION_COOKIE: &str = "_pod_session";

/// Per-route request counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct Hits {
    /// GETs of the sign-in page (token fetches).
    pub sign_in_get: u32,
    /// POSTs of the sign-in form.
    pub sign_in_post: u32,
    /// GETs of the bookmarklet resource.
    pub bookmarklet: u32,
    /// POSTs of status messages.
    pub status_messages: u32,
    /// DELETEs of posts or comments.
    pub deletes: u32,
}

#[derive(Debug)]
struct Inner {
    csrf_token: String,
    username: String,
    password: String,
    aspects: Vec<(u64, String)>,
    services: Vec<String>,
    // id -> owned by the signed-in account
    posts: HashMap<String, bool>,
    comments: HashMap<String, bool>,
    published: Vec<Value>,
    hits: Hits,
}

/// Mutable fixture state shared between a test and the running app.
#[derive(Debug)]
pub struct PodState {
    inner: RwLock<Inner>,
}

impl PodState {
    /// Creates state with the default fixtures: token `tok-1`, account
    /// `alice`/`secret`, no aspects, no services.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(Inner {
                csrf_token: "tok-1".to_string(),
                username: "alice".to_string(),
                password: "secret".to_string(),
                aspects: Vec::new(),
                services: Vec::new(),
                posts: HashMap::new(),
                comments: HashMap::new(),
                published: Vec::new(),
                hits: Hits::default(),
            }),
        })
    }

    /// Changes the CSRF token the pod serves and verifies.
    pub async fn set_token(&self, token: &str) {
        self.inner.write().await.csrf_token = token.to_string();
    }

    /// The CSRF token currently served.
    pub async fn token(&self) -> String {
        self.inner.read().await.csrf_token.clone()
    }

    /// Changes the valid account credentials.
    pub async fn set_credentials(&self, username: &str, password: &str) {
        let mut inner = self.inner.write().await;
        inner.username = username.to_string();
        inner.password = password.to_string();
    }

    /// Stages the aspects embedded in the bookmarklet page.
    pub async fn set_aspects(&self, aspects: Vec<(u64, String)>) {
        self.inner.write().await.aspects = aspects;
    }

    /// Stages the services embedded in the bookmarklet page.
    pub async fn set_services(&self, services: Vec<String>) {
        self.inner.write().await.services = services;
    }

    /// Stages a deletable post; `owned` selects 204 vs 403 on delete.
    pub async fn add_post(&self, id: &str, owned: bool) {
        self.inner.write().await.posts.insert(id.to_string(), owned);
    }

    /// Stages a deletable comment; `owned` selects 204 vs 403.
    pub async fn add_comment(&self, id: &str, owned: bool) {
        self.inner
            .write()
            .await
            .comments
            .insert(id.to_string(), owned);
    }

    /// Snapshot of the per-route hit counters.
    pub async fn hits(&self) -> Hits {
        self.inner.read().await.hits
    }

    /// All bodies received on `POST /status_messages`, oldest first.
    pub async fn published(&self) -> Vec<Value> {
        self.inner.read().await.published.clone()
    }
}

/// Builds the router for the fake pod.
pub fn app(state: Arc<PodState>) -> Router {
    Router::new()
        .route("/users/sign_in", get(sign_in_page).post(sign_in_submit))
        .route("/bookmarklet", get(bookmarklet))
        .route("/status_messages", post(publish))
        .route("/posts/{id}", delete(delete_post))
        .route("/comments/{id}", delete(delete_comment))
        .with_state(state)
}

/// Serves the app on `listener` until the process exits.
pub async fn run(listener: TcpListener, state: Arc<PodState>) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

/// Binds an ephemeral local port and serves the app in the background.
pub async fn spawn(state: Arc<PodState>) -> Result<SocketAddr, std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app(state)).await;
    });
    Ok(addr)
}

// ============================================================================
// Handlers
// ============================================================================

fn authed(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|cookies| cookies.contains(&format!("{SESSION_COOKIE}=auth")))
}

fn csrf_header_matches(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get("x-csrf-token")
        .and_then(|value| value.to_str().ok())
        == Some(token)
}

async fn sign_in_page(
    State(state): State<Arc<PodState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let mut inner = state.inner.write().await;
    inner.hits.sign_in_get += 1;
    let body = format!(
        "<!DOCTYPE html><html><head>\
         <meta name=\"csrf-token\" content=\"{}\" />\
         </head><body><form action=\"/users/sign_in\" method=\"post\"></form></body></html>",
        inner.csrf_token
    );
    // An authenticated session survives revisiting the sign-in page.
    let session = if authed(&headers) { "auth" } else { "anon" };
    (
        [
            (
                header::SET_COOKIE,
                format!("{SESSION_COOKIE}={session}; path=/"),
            ),
            (header::CONTENT_TYPE, "text/html".to_string()),
        ],
        body,
    )
}

#[derive(Debug, Deserialize)]
struct SignInForm {
    #[serde(rename = "user[username]")]
    username: String,
    #[serde(rename = "user[password]")]
    password: String,
    authenticity_token: String,
}

async fn sign_in_submit(
    State(state): State<Arc<PodState>>,
    Form(form): Form<SignInForm>,
) -> Response {
    let mut inner = state.inner.write().await;
    inner.hits.sign_in_post += 1;

    if form.authenticity_token != inner.csrf_token {
        return (StatusCode::UNPROCESSABLE_ENTITY, "invalid authenticity token").into_response();
    }

    // Real pods redirect on failed logins too; only the cookie differs.
    let session = if form.username == inner.username && form.password == inner.password {
        "auth"
    } else {
        "anon"
    };
    (
        StatusCode::FOUND,
        [
            (
                header::SET_COOKIE,
                format!("{SESSION_COOKIE}={session}; path=/"),
            ),
            (header::LOCATION, "/stream".to_string()),
        ],
    )
        .into_response()
}

async fn bookmarklet(State(state): State<Arc<PodState>>, headers: HeaderMap) -> Response {
    let mut inner = state.inner.write().await;
    inner.hits.bookmarklet += 1;

    if !authed(&headers) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let aspects: Vec<Value> = inner
        .aspects
        .iter()
        .map(|(id, name)| json!({"id": id, "name": name, "selected": false}))
        .collect();
    // Attribute order deliberately differs from the sign-in page.
    let body = format!(
        "<!DOCTYPE html><html><head>\
         <meta content=\"{}\" name=\"csrf-token\" />\
         </head><body><script>window.gon={{\"preloads\":{{\"aspects\":{},\"configured_services\":{}}}}};</script></body></html>",
        inner.csrf_token,
        serde_json::to_string(&aspects).unwrap_or_else(|_| "[]".to_string()),
        serde_json::to_string(&inner.services).unwrap_or_else(|_| "[]".to_string()),
    );
    ([(header::CONTENT_TYPE, "text/html".to_string())], body).into_response()
}

async fn publish(
    State(state): State<Arc<PodState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = state.inner.write().await;
    inner.hits.status_messages += 1;

    if !authed(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "You need to sign in or sign up before continuing."})),
        )
            .into_response();
    }
    if !csrf_header_matches(&headers, &inner.csrf_token) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": "CSRF token verification failed"})),
        )
            .into_response();
    }

    let text = body
        .pointer("/status_message/text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    inner.published.push(body);

    let id = inner.published.len() as u64;
    let guid = Uuid::new_v4().simple().to_string();
    (
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "guid": guid,
            "public": true,
            "created_at": "2026-01-15T12:00:00Z",
            "text": text,
        })),
    )
        .into_response()
}

async fn delete_post(
    State(state): State<Arc<PodState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> StatusCode {
    let mut inner = state.inner.write().await;
    inner.hits.deletes += 1;
    if !authed(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    match inner.posts.get(&id).copied() {
        Some(true) => {
            inner.posts.remove(&id);
            StatusCode::NO_CONTENT
        }
        Some(false) => StatusCode::FORBIDDEN,
        None => StatusCode::NOT_FOUND,
    }
}

async fn delete_comment(
    State(state): State<Arc<PodState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> StatusCode {
    let mut inner = state.inner.write().await;
    inner.hits.deletes += 1;
    if !authed(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    match inner.comments.get(&id).copied() {
        Some(true) => {
            inner.comments.remove(&id);
            StatusCode::NO_CONTENT
        }
        Some(false) => StatusCode::FORBIDDEN,
        None => StatusCode::NOT_FOUND,
    }
}
