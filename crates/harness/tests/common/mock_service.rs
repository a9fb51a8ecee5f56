//! In-process mock of a json-server style REST service.
//!
//! Serves the endpoints the posts suite exercises on an ephemeral port:
//!
//! | Method | Path | Behavior |
//! |--------|------|----------|
//! | POST | `/register` | 201 with `{accessToken, user}`, 400 without email/password |
//! | GET | `/posts` | listing, filtered by repeated `id` and truncated by `limit` |
//! | GET | `/posts/{id}` | 200 or 404 |
//! | PUT | `/posts/{id}` | replaces the post, 200 or 404 |
//! | POST | `/{guard}/posts` | 201 with a registered bearer token, 401 otherwise |
//! | DELETE | `/posts` | always 404 |

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use apiflow_harness::HttpClient;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::fixtures::seed_posts;

#[derive(Debug, Default)]
struct Inner {
    posts: Vec<Value>,
    tokens: HashSet<String>,
    requests: usize,
}

#[derive(Debug, Clone, Default)]
struct MockState {
    inner: Arc<Mutex<Inner>>,
}

/// A running mock service. The server task is aborted on drop.
pub struct MockService {
    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub base_url: String,
    state: MockState,
    handle: JoinHandle<()>,
}

impl MockService {
    /// Starts the service with the standard seed posts.
    pub async fn start() -> Self {
        Self::with_posts(seed_posts()).await
    }

    /// Starts the service with the given posts.
    pub async fn with_posts(posts: Vec<Value>) -> Self {
        let state = MockState::default();
        state.inner.lock().posts = posts;

        let app = Router::new()
            .route("/register", post(register))
            .route("/posts", get(list_posts).delete(delete_posts))
            .route("/posts/{id}", get(read_post).put(replace_post))
            .route("/{guard}/posts", post(create_post))
            .layer(middleware::from_fn_with_state(state.clone(), count_requests))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock service");
        let addr = listener.local_addr().expect("Failed to read local address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock service failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    /// Returns a client bound to this service.
    pub fn client(&self) -> HttpClient {
        HttpClient::new(&self.base_url, Duration::from_secs(5)).expect("Failed to build client")
    }

    /// Number of requests served so far.
    pub fn request_count(&self) -> usize {
        self.state.inner.lock().requests
    }

    /// Returns a post by id.
    pub fn post(&self, id: u64) -> Option<Value> {
        let inner = self.state.inner.lock();
        inner.posts.iter().find(|p| post_id(p) == Some(id)).cloned()
    }

    /// Returns every post.
    pub fn posts(&self) -> Vec<Value> {
        self.state.inner.lock().posts.clone()
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn count_requests(State(state): State<MockState>, request: Request, next: Next) -> Response {
    state.inner.lock().requests += 1;
    next.run(request).await
}

fn post_id(post: &Value) -> Option<u64> {
    match &post["id"] {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({}))).into_response()
}

async fn register(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    let (Some(email), Some(_)) = (body["email"].as_str(), body["password"].as_str()) else {
        return (StatusCode::BAD_REQUEST, Json(json!("Email and password are required")))
            .into_response();
    };

    let mut inner = state.inner.lock();
    let token = format!("token-{}-{}", inner.tokens.len() + 1, email.len());
    inner.tokens.insert(token.clone());

    (
        StatusCode::CREATED,
        Json(json!({
            "accessToken": token,
            "user": {"email": email, "id": inner.tokens.len()}
        })),
    )
        .into_response()
}

async fn list_posts(
    State(state): State<MockState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let ids: Vec<u64> = params
        .iter()
        .filter(|(key, _)| key == "id")
        .filter_map(|(_, value)| value.parse().ok())
        .collect();
    let limit = params
        .iter()
        .find(|(key, _)| key == "limit")
        .and_then(|(_, value)| value.parse::<usize>().ok());

    let inner = state.inner.lock();
    let posts: Vec<Value> = inner
        .posts
        .iter()
        .filter(|p| ids.is_empty() || post_id(p).is_some_and(|id| ids.contains(&id)))
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();

    Json(Value::Array(posts)).into_response()
}

async fn read_post(State(state): State<MockState>, Path(id): Path<u64>) -> Response {
    let inner = state.inner.lock();
    match inner.posts.iter().find(|p| post_id(p) == Some(id)) {
        Some(post) => Json(post.clone()).into_response(),
        None => not_found(),
    }
}

async fn replace_post(
    State(state): State<MockState>,
    Path(id): Path<u64>,
    Json(mut body): Json<Value>,
) -> Response {
    let mut inner = state.inner.lock();
    let Some(slot) = inner.posts.iter_mut().find(|p| post_id(p) == Some(id)) else {
        return not_found();
    };
    body["id"] = json!(id);
    *slot = body.clone();
    Json(body).into_response()
}

async fn create_post(
    State(state): State<MockState>,
    Path(_guard): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let mut inner = state.inner.lock();
    if !token.is_some_and(|t| inner.tokens.contains(t)) {
        return (StatusCode::UNAUTHORIZED, "Missing authorization header").into_response();
    }

    inner.posts.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn delete_posts() -> Response {
    not_found()
}
