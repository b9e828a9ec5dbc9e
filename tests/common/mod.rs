//! Common test utilities for E2E tests
//!
//! `RemoteInstance` is a real HTTP server standing in for a remote fediverse
//! peer: it answers WebFinger queries, serves actor documents, and publishes
//! (optionally paginated) followers collections. Per-route hit counters let
//! tests assert which protocol paths were exercised.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tempfile::TempDir;

use muster::AppState;
use muster::config::{
    AppConfig, CacheConfig, DatabaseConfig, FederationConfig, LoggingConfig, ServerConfig,
};
use muster::data::{Actor, NewLocalActor};

pub const TEST_DOMAIN: &str = "test.example.com";
pub const TEST_PEM: &str = "-----BEGIN PUBLIC KEY-----\ntest\n-----END PUBLIC KEY-----";

// =============================================================================
// Application under test
// =============================================================================

/// The resolution core wired against a throwaway SQLite store.
pub struct TestApp {
    pub state: AppState,
    pub domain: String,
    _temp_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig {
            server: ServerConfig {
                domain: TEST_DOMAIN.to_string(),
                // Remote test instances listen on plain HTTP
                protocol: "http".to_string(),
            },
            database: DatabaseConfig {
                path: temp_dir.path().join("test.db"),
            },
            federation: FederationConfig {
                user_agent: "Muster-tests/0.1".to_string(),
                request_timeout_seconds: 5,
                max_concurrent_fetches: 4,
                max_collection_pages: 10,
            },
            cache: CacheConfig {
                actor_ttl_seconds: 3600,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let state = AppState::new(config).await.unwrap();

        Self {
            state,
            domain: TEST_DOMAIN.to_string(),
            _temp_dir: temp_dir,
        }
    }

    /// Seed a locally-hosted actor.
    pub async fn seed_local_actor(&self, username: &str, email: Option<&str>) -> Actor {
        self.state
            .db
            .create_local_actor(&NewLocalActor {
                username: username.to_string(),
                domain: self.domain.clone(),
                email: email.map(str::to_string),
                display_name: Some(format!("The {}", username)),
                note: None,
                public_key_pem: TEST_PEM.to_string(),
            })
            .await
            .unwrap()
    }

    /// Record a follower edge for a seeded local actor.
    pub async fn add_local_follower(&self, actor: &Actor, follower_url: &str) {
        self.state
            .db
            .add_follower(&actor.id, follower_url)
            .await
            .unwrap();
    }
}

// =============================================================================
// Remote instance stand-in
// =============================================================================

#[derive(Debug, Clone, Default)]
struct RemoteUser {
    display_name: Option<String>,
    /// Serve a JRD with no links instead of a self link
    hide_webfinger_links: bool,
    /// Respond 500 to actor fetches
    fail_actor_fetch: bool,
    /// Delay actor fetches by this many milliseconds
    actor_delay_ms: u64,
    /// Follower member URLs, in collection order
    followers: Vec<String>,
    /// None -> inline orderedItems; Some(n) -> paginated, n per page
    followers_page_size: Option<usize>,
}

struct InstanceState {
    domain: String,
    users: Mutex<HashMap<String, RemoteUser>>,
    webfinger_hits: AtomicUsize,
    actor_hits: Mutex<HashMap<String, usize>>,
    collection_hits: AtomicUsize,
}

/// A live HTTP server acting as a remote fediverse instance.
pub struct RemoteInstance {
    pub domain: String,
    state: Arc<InstanceState>,
}

impl RemoteInstance {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let domain = format!("127.0.0.1:{}", addr.port());

        let state = Arc::new(InstanceState {
            domain: domain.clone(),
            users: Mutex::new(HashMap::new()),
            webfinger_hits: AtomicUsize::new(0),
            actor_hits: Mutex::new(HashMap::new()),
            collection_hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/.well-known/webfinger", get(webfinger))
            .route("/users/:username", get(actor))
            .route("/users/:username/followers", get(followers))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { domain, state }
    }

    /// Register a user on this instance; returns its actor URL.
    pub fn add_user(&self, username: &str) -> String {
        self.state
            .users
            .lock()
            .unwrap()
            .insert(username.to_string(), RemoteUser::default());
        self.actor_url(username)
    }

    pub fn actor_url(&self, username: &str) -> String {
        format!("http://{}/users/{}", self.domain, username)
    }

    pub fn acct(&self, username: &str) -> String {
        format!("{}@{}", username, self.domain)
    }

    fn with_user<F: FnOnce(&mut RemoteUser)>(&self, username: &str, mutate: F) {
        let mut users = self.state.users.lock().unwrap();
        let user = users
            .get_mut(username)
            .unwrap_or_else(|| panic!("unknown test user {}", username));
        mutate(user);
    }

    pub fn set_display_name(&self, username: &str, display_name: &str) {
        self.with_user(username, |user| {
            user.display_name = Some(display_name.to_string())
        });
    }

    /// Make WebFinger answer with an empty links array for this user.
    pub fn hide_webfinger_links(&self, username: &str) {
        self.with_user(username, |user| user.hide_webfinger_links = true);
    }

    /// Make actor fetches for this user fail with HTTP 500.
    pub fn fail_actor_fetch(&self, username: &str) {
        self.with_user(username, |user| user.fail_actor_fetch = true);
    }

    /// Delay actor fetches for this user.
    pub fn delay_actor_fetch(&self, username: &str, delay_ms: u64) {
        self.with_user(username, |user| user.actor_delay_ms = delay_ms);
    }

    pub fn set_followers(&self, username: &str, followers: Vec<String>) {
        self.with_user(username, |user| user.followers = followers);
    }

    /// Publish the followers collection in pages of `page_size`.
    pub fn paginate_followers(&self, username: &str, page_size: usize) {
        self.with_user(username, |user| {
            user.followers_page_size = Some(page_size)
        });
    }

    pub fn webfinger_hits(&self) -> usize {
        self.state.webfinger_hits.load(Ordering::SeqCst)
    }

    pub fn actor_fetches(&self, username: &str) -> usize {
        *self
            .state
            .actor_hits
            .lock()
            .unwrap()
            .get(username)
            .unwrap_or(&0)
    }

    pub fn collection_fetches(&self) -> usize {
        self.state.collection_hits.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Route handlers
// =============================================================================

#[derive(Debug, Deserialize)]
struct WebFingerQuery {
    resource: String,
}

async fn webfinger(
    State(state): State<Arc<InstanceState>>,
    Query(query): Query<WebFingerQuery>,
) -> Response {
    state.webfinger_hits.fetch_add(1, Ordering::SeqCst);

    let Some(acct) = query.resource.strip_prefix("acct:") else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let username = acct.split_once('@').map(|(u, _)| u).unwrap_or(acct);

    let users = state.users.lock().unwrap();
    let Some(user) = users.get(username) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if user.hide_webfinger_links {
        return Json(json!({"subject": query.resource.clone(), "links": []})).into_response();
    }

    let actor_url = format!("http://{}/users/{}", state.domain, username);
    Json(json!({
        "subject": query.resource.clone(),
        "aliases": [actor_url.clone()],
        "links": [
            {
                "rel": "self",
                "type": "application/activity+json",
                "href": actor_url.clone()
            },
            {
                "rel": "http://webfinger.net/rel/profile-page",
                "type": "text/html",
                "href": actor_url
            }
        ]
    }))
    .into_response()
}

async fn actor(
    State(state): State<Arc<InstanceState>>,
    Path(username): Path<String>,
) -> Response {
    let (fail, delay_ms, document) = {
        let users = state.users.lock().unwrap();
        let Some(user) = users.get(&username) else {
            return StatusCode::NOT_FOUND.into_response();
        };

        let actor_url = format!("http://{}/users/{}", state.domain, username);
        let document = json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "type": "Person",
            "id": actor_url.clone(),
            "preferredUsername": username.clone(),
            "name": user.display_name.clone(),
            "inbox": format!("{}/inbox", actor_url),
            "outbox": format!("{}/outbox", actor_url),
            "followers": format!("{}/followers", actor_url),
            "publicKey": {
                "id": format!("{}#main-key", actor_url),
                "owner": actor_url.clone(),
                "publicKeyPem": TEST_PEM
            }
        });
        (user.fail_actor_fetch, user.actor_delay_ms, document)
    };

    {
        let mut hits = state.actor_hits.lock().unwrap();
        *hits.entry(username.clone()).or_insert(0) += 1;
    }

    if delay_ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
    }

    if fail {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    Json(document).into_response()
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<usize>,
}

async fn followers(
    State(state): State<Arc<InstanceState>>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    state.collection_hits.fetch_add(1, Ordering::SeqCst);

    let users = state.users.lock().unwrap();
    let Some(user) = users.get(&username) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let collection_url = format!("http://{}/users/{}/followers", state.domain, username);

    let Some(page_size) = user.followers_page_size else {
        return Json(json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "type": "OrderedCollection",
            "id": collection_url.clone(),
            "totalItems": user.followers.len(),
            "orderedItems": user.followers.clone()
        }))
        .into_response();
    };

    let page_count = user.followers.len().div_ceil(page_size);
    match query.page {
        None => Json(json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "type": "OrderedCollection",
            "id": collection_url.clone(),
            "totalItems": user.followers.len(),
            "first": format!("{}?page=1", collection_url)
        }))
        .into_response(),
        Some(page) if page >= 1 && page <= page_count => {
            let start = (page - 1) * page_size;
            let end = (start + page_size).min(user.followers.len());
            let mut body = json!({
                "@context": "https://www.w3.org/ns/activitystreams",
                "type": "OrderedCollectionPage",
                "id": format!("{}?page={}", collection_url, page),
                "partOf": collection_url.clone(),
                "orderedItems": user.followers[start..end].to_vec()
            });
            if page < page_count {
                body["next"] = json!(format!("{}?page={}", collection_url, page + 1));
            }
            Json(body).into_response()
        }
        Some(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
