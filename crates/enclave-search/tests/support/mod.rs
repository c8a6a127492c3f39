//! In-process stand-in for the search backend and the embedding provider.
//!
//! Stores one in-memory index per name, ranks documents by cosine
//! similarity, and can be told to fail, stall, or return garbage.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use enclave_search::{IndexClientConfig, RetryPolicy, TenantIndexClient};
use serde_json::{json, Value};

pub const API_KEY: &str = "test-key";
pub const API_VERSION: &str = "2023-11-01";
pub const DIMENSIONS: usize = 3;

#[derive(Debug, Clone)]
struct StoredDoc {
    id: String,
    title: String,
    url: String,
    vector: Vec<f32>,
}

#[derive(Debug)]
struct FakeIndex {
    dimensions: usize,
    docs: Vec<StoredDoc>,
}

#[derive(Debug, Default)]
struct Inner {
    indexes: HashMap<String, FakeIndex>,
    injected: VecDeque<StatusCode>,
    requests: usize,
    garbage_search: bool,
    delay: Option<Duration>,
    embeddings: HashMap<String, Vec<f32>>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<Inner>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next `times` requests with `status` before doing anything.
    pub fn fail_next(&self, status: u16, times: usize) {
        let status = StatusCode::from_u16(status).unwrap();
        let mut state = self.state.lock().unwrap();
        for _ in 0..times {
            state.injected.push_back(status);
        }
    }

    pub fn return_garbage_from_search(&self) {
        self.state.lock().unwrap().garbage_search = true;
    }

    pub fn stall(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    pub fn set_embedding(&self, text: &str, vector: Vec<f32>) {
        self.state
            .lock()
            .unwrap()
            .embeddings
            .insert(text.to_string(), vector);
    }

    pub fn requests(&self) -> usize {
        self.state.lock().unwrap().requests
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.state.lock().unwrap().indexes.contains_key(name)
    }

    pub fn index_dimensions(&self, name: &str) -> Option<usize> {
        self.state
            .lock()
            .unwrap()
            .indexes
            .get(name)
            .map(|index| index.dimensions)
    }

    /// Serve on an ephemeral port and return the base URL.
    pub async fn spawn(&self) -> String {
        let router = Router::new()
            .route("/indexes/{name}/", put(create_index).delete(delete_index))
            .route("/indexes/{name}/docs/index/", post(index_documents))
            .route("/indexes/{name}/docs/search/", post(search_documents))
            .route("/indexes/{name}/docs/$count", get(count_documents))
            .route(
                "/openai/deployments/{deployment}/embeddings",
                post(embeddings),
            )
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Count the request, then apply any injected delay or failure.
    async fn gate(&self, headers: &HeaderMap, query: &HashMap<String, String>) -> Option<Response> {
        let (injected, delay) = {
            let mut state = self.state.lock().unwrap();
            state.requests += 1;
            (state.injected.pop_front(), state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = injected {
            return Some(error(status, "injected failure"));
        }
        if headers.get("api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
            return Some(error(StatusCode::FORBIDDEN, "invalid api key"));
        }
        if query.get("api-version").map(String::as_str) != Some(API_VERSION) {
            return Some(error(StatusCode::BAD_REQUEST, "missing or unsupported api-version"));
        }
        None
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": {"code": "", "message": message}}))).into_response()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn floats(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

async fn create_index(
    State(backend): State<FakeBackend>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(response) = backend.gate(&headers, &query).await {
        return response;
    }
    let Ok(definition) = serde_json::from_str::<Value>(&body) else {
        return error(StatusCode::BAD_REQUEST, "malformed index definition");
    };
    if definition["name"] != name.as_str() {
        return error(StatusCode::BAD_REQUEST, "index name does not match path");
    }
    let dimensions = definition["fields"]
        .as_array()
        .and_then(|fields| {
            fields
                .iter()
                .find(|f| f["name"] == "documentContentVector")
                .and_then(|f| f["dimensions"].as_u64())
        })
        .map(|d| d as usize);
    let Some(dimensions) = dimensions else {
        return error(StatusCode::BAD_REQUEST, "vector field missing");
    };

    let mut state = backend.state.lock().unwrap();
    // An existing index keeps its documents, like a schema update would.
    if state.indexes.contains_key(&name) {
        return StatusCode::NO_CONTENT.into_response();
    }
    state.indexes.insert(
        name,
        FakeIndex {
            dimensions,
            docs: Vec::new(),
        },
    );
    (StatusCode::CREATED, Json(definition)).into_response()
}

async fn delete_index(
    State(backend): State<FakeBackend>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Some(response) = backend.gate(&headers, &query).await {
        return response;
    }
    let mut state = backend.state.lock().unwrap();
    if state.indexes.remove(&name).is_some() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error(StatusCode::NOT_FOUND, "index not found")
    }
}

async fn index_documents(
    State(backend): State<FakeBackend>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(response) = backend.gate(&headers, &query).await {
        return response;
    }
    let Ok(batch) = serde_json::from_str::<Value>(&body) else {
        return error(StatusCode::BAD_REQUEST, "malformed JSON");
    };
    let mut state = backend.state.lock().unwrap();
    let Some(index) = state.indexes.get_mut(&name) else {
        return error(StatusCode::NOT_FOUND, "index not found");
    };

    let mut results = Vec::new();
    for action in batch["value"].as_array().cloned().unwrap_or_default() {
        let key = action["documentId"].as_str().unwrap_or_default().to_string();
        let vector = floats(&action["documentContentVector"]);
        match vector {
            Some(vector) if vector.len() == index.dimensions => {
                index.docs.retain(|d| d.id != key);
                index.docs.push(StoredDoc {
                    id: key.clone(),
                    title: action["documentTitle"].as_str().unwrap_or_default().to_string(),
                    url: action["documentUrl"].as_str().unwrap_or_default().to_string(),
                    vector,
                });
                results.push(json!({"key": key, "status": true, "errorMessage": null, "statusCode": 201}));
            }
            _ => results.push(json!({
                "key": key,
                "status": false,
                "errorMessage": "vector does not match index dimensions",
                "statusCode": 400
            })),
        }
    }
    (StatusCode::OK, Json(json!({ "value": results }))).into_response()
}

async fn search_documents(
    State(backend): State<FakeBackend>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(response) = backend.gate(&headers, &query).await {
        return response;
    }
    let Ok(request) = serde_json::from_str::<Value>(&body) else {
        return error(StatusCode::BAD_REQUEST, "malformed JSON");
    };
    let state = backend.state.lock().unwrap();
    if state.garbage_search {
        return (StatusCode::OK, "<html>definitely not json</html>").into_response();
    }
    let Some(index) = state.indexes.get(&name) else {
        return error(StatusCode::NOT_FOUND, "index not found");
    };

    let vector_query = &request["vectorQueries"][0];
    let Some(vector) = floats(&vector_query["vector"]) else {
        return error(StatusCode::BAD_REQUEST, "vector missing");
    };
    let k = vector_query["k"].as_u64().unwrap_or(50) as usize;
    let top = request["top"].as_u64().map_or(k, |t| t as usize);

    let mut ranked: Vec<(f32, &StoredDoc)> = index
        .docs
        .iter()
        .map(|doc| (cosine(&doc.vector, &vector), doc))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    let value: Vec<Value> = ranked
        .into_iter()
        .take(k.min(top))
        .map(|(score, doc)| {
            json!({
                "@search.score": score,
                "documentId": doc.id,
                "documentTitle": doc.title,
                "documentUrl": doc.url,
            })
        })
        .collect();
    (StatusCode::OK, Json(json!({ "value": value }))).into_response()
}

async fn count_documents(
    State(backend): State<FakeBackend>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Some(response) = backend.gate(&headers, &query).await {
        return response;
    }
    let state = backend.state.lock().unwrap();
    match state.indexes.get(&name) {
        Some(index) => (StatusCode::OK, format!("\u{feff}{}", index.docs.len())).into_response(),
        None => error(StatusCode::NOT_FOUND, "index not found"),
    }
}

async fn embeddings(
    State(backend): State<FakeBackend>,
    Path(_deployment): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    {
        let mut state = backend.state.lock().unwrap();
        state.requests += 1;
        if let Some(status) = state.injected.pop_front() {
            return error(status, "injected failure");
        }
    }
    if headers.get("api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return error(StatusCode::UNAUTHORIZED, "invalid api key");
    }
    if !query.contains_key("api-version") {
        return error(StatusCode::BAD_REQUEST, "missing api-version");
    }
    let Ok(request) = serde_json::from_str::<Value>(&body) else {
        return error(StatusCode::BAD_REQUEST, "malformed JSON");
    };
    let input = request["input"].as_str().unwrap_or_default();
    let state = backend.state.lock().unwrap();
    let data = match state.embeddings.get(input) {
        Some(vector) => vec![json!({"object": "embedding", "index": 0, "embedding": vector})],
        None => Vec::new(),
    };
    (StatusCode::OK, Json(json!({"object": "list", "data": data}))).into_response()
}

/// Retry policy with millisecond delays so retry tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::default()
        .with_delays(Duration::from_millis(1), Duration::from_millis(5))
        .with_jitter(false)
}

pub fn client_config(endpoint: &str) -> IndexClientConfig {
    IndexClientConfig::new(endpoint, API_KEY, API_VERSION)
        .with_dimensions(DIMENSIONS)
        .with_timeout(Duration::from_secs(5))
        .with_retry(fast_retry())
}

pub fn client(endpoint: &str) -> TenantIndexClient {
    TenantIndexClient::new(client_config(endpoint)).unwrap()
}
