//! In-process mock of the admin REST backend.
//!
//! Replies are registered per `"<METHOD> <path>"` (path without the
//! `/api/v1` prefix or query string). A route given several replies
//! serves them in order and then keeps repeating the last one. Every
//! request is recorded for assertions.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::{json, Value};

use eduadmin_client::api::ApiClient;
use eduadmin_client::session::Session;
use eduadmin_client::storage::{MemoryStorage, Storage};
use eduadmin_core::filter::FilterNode;
use eduadmin_core::scope::SelectedScope;

pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone)]
pub enum Reply {
    Json(StatusCode, Value),
    Bytes(StatusCode, Vec<u8>),
}

impl Reply {
    /// `200` with `{ "data": data }`.
    pub fn data(data: Value) -> Self {
        Reply::Json(StatusCode::OK, json!({ "success": true, "data": data }))
    }

    pub fn ok() -> Self {
        Reply::Json(StatusCode::OK, json!({ "success": true }))
    }

    pub fn error(status: StatusCode, message: &str) -> Self {
        Reply::Json(status, json!({ "success": false, "error": message }))
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct Inner {
    routes: HashMap<String, VecDeque<Reply>>,
    requests: Vec<Recorded>,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the replies for `route`, replacing earlier ones.
    pub fn on(&self, route: &str, replies: Vec<Reply>) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .routes
            .insert(route.to_string(), replies.into());
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Recorded requests for one route, in arrival order.
    pub fn requests_to(&self, route: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| format!("{} {}", r.method, r.path) == route)
            .collect()
    }

    fn reply(&self, route: &str) -> Reply {
        let mut inner = self.inner.lock().unwrap();
        match inner.routes.get_mut(route) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Reply::error(StatusCode::NOT_FOUND, "no reply")),
            None => Reply::error(StatusCode::NOT_FOUND, &format!("no route for {route}")),
        }
    }
}

async fn handle(
    State(mock): State<MockBackend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri
        .path()
        .strip_prefix(API_PREFIX)
        .unwrap_or(uri.path())
        .to_string();
    let route = format!("{method} {path}");

    mock.inner.lock().unwrap().requests.push(Recorded {
        method: method.to_string(),
        path,
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    match mock.reply(&route) {
        Reply::Json(status, value) => (status, axum::Json(value)).into_response(),
        Reply::Bytes(status, bytes) => (
            status,
            [(CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
    }
}

/// A running mock server.
pub struct TestServer {
    pub mock: MockBackend,
    pub addr: SocketAddr,
}

impl TestServer {
    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.addr, API_PREFIX)
    }
}

/// Bind `127.0.0.1:0` and serve the mock in the background.
pub async fn spawn_backend() -> TestServer {
    let mock = MockBackend::new();
    let app = Router::new().fallback(handle).with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer { mock, addr }
}

/// An `ApiClient` against `server` with in-memory storage.
pub fn client(server: &TestServer) -> (ApiClient, Arc<dyn Storage>) {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let session = Arc::new(Session::load(storage.clone()));
    let api = ApiClient::with_client(reqwest::Client::new(), server.base_url(), session);
    (api, storage)
}

pub fn scope(grade_id: i64) -> SelectedScope {
    SelectedScope {
        country: FilterNode::new(1, "Egypt"),
        curriculum: FilterNode::new(2, "National"),
        stage: FilterNode::new(3, "Primary"),
        grade: FilterNode::new(grade_id, format!("{grade_id}")),
        subject: None,
    }
}

pub fn page(items: Value, total: u64) -> Reply {
    Reply::Json(
        StatusCode::OK,
        json!({
            "success": true,
            "data": items,
            "pagination": {
                "currentPage": 1,
                "pageSize": 20,
                "totalRecords": total,
                "totalPages": 1,
            }
        }),
    )
}

pub fn bundle_json(id: &str, name: &str, price: f64, discount: i32, active: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "name_en": name,
        "price": price,
        "discount": discount,
        "type": "ExpiryDays",
        "expiryDays": 30,
        "is_active": active,
    })
}
