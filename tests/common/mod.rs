//! Shared fixtures: fake vendor endpoints and an in-process router.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use quemepongo::{build_router, config::AppConfig, routes::AppState};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_integration";

/// What the fake chat endpoint answers with.
#[derive(Clone)]
pub enum Completion {
    Content(String),
    Status(StatusCode),
    NoChoices,
}

pub struct FakeVendors {
    pub completion: Mutex<Completion>,
    pub openrouter_hits: AtomicUsize,
    pub unsplash_hits: AtomicUsize,
    pub stripe_hits: AtomicUsize,
    pub last_prompt: Mutex<Option<String>>,
    pub last_form: Mutex<Vec<(String, String)>>,
}

impl FakeVendors {
    pub fn hits(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub fn outfits_json(queries: [&str; 3]) -> String {
    json!({
        "outfits": [
            { "id": 1, "title": "Elegante Casual", "description": "Blazer beige con jeans rectos.", "searchQuery": queries[0] },
            { "id": 2, "title": "Minimalista", "description": "Total look negro con botines.", "searchQuery": queries[1] },
            { "id": 3, "title": "Boho", "description": "Vestido fluido y sandalias.", "searchQuery": queries[2] }
        ]
    })
    .to_string()
}

async fn chat(State(fake): State<Arc<FakeVendors>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    fake.openrouter_hits.fetch_add(1, Ordering::SeqCst);
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer test-openrouter") {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }
    *fake.last_prompt.lock() = body.pointer("/messages/1/content").and_then(Value::as_str).map(String::from);

    let completion = fake.completion.lock().clone();
    match completion {
        Completion::Content(content) => Json(json!({
            "id": "gen-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        }))
        .into_response(),
        Completion::Status(status) => (status, r#"{"error":{"message":"rate limited: internal-detail"}}"#).into_response(),
        Completion::NoChoices => Json(json!({ "id": "gen-1", "choices": [] })).into_response(),
    }
}

async fn photos(
    State(fake): State<Arc<FakeVendors>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    fake.unsplash_hits.fetch_add(1, Ordering::SeqCst);
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Client-ID test-unsplash") {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }
    if params.get("per_page").map(String::as_str) != Some("1")
        || params.get("orientation").map(String::as_str) != Some("portrait")
    {
        return (StatusCode::BAD_REQUEST, "unexpected params").into_response();
    }
    let query = params.get("query").cloned().unwrap_or_default();
    if query.contains("fail") {
        return (StatusCode::SERVICE_UNAVAILABLE, "down").into_response();
    }
    if query.contains("nothing") {
        return Json(json!({ "total": 0, "total_pages": 0, "results": [] })).into_response();
    }
    let slug = query.replace(' ', "-");
    Json(json!({
        "total": 1,
        "results": [{
            "id": slug,
            "urls": { "regular": format!("https://images.test/{slug}/regular"), "thumb": format!("https://images.test/{slug}/thumb") },
            "user": { "name": "Ana Fotógrafa", "links": { "html": "https://unsplash.com/@ana" } }
        }]
    }))
    .into_response()
}

async fn checkout(State(fake): State<Arc<FakeVendors>>, Form(form): Form<Vec<(String, String)>>) -> Response {
    fake.stripe_hits.fetch_add(1, Ordering::SeqCst);
    let mode = form.iter().find(|(k, _)| k == "mode").map(|(_, v)| v.clone()).unwrap_or_default();
    *fake.last_form.lock() = form;
    Json(json!({ "id": "cs_test_1", "object": "checkout.session", "url": format!("https://checkout.stripe.test/{mode}") }))
        .into_response()
}

pub async fn spawn_vendors(completion: Completion) -> (Arc<FakeVendors>, String) {
    let fake = Arc::new(FakeVendors {
        completion: Mutex::new(completion),
        openrouter_hits: AtomicUsize::new(0),
        unsplash_hits: AtomicUsize::new(0),
        stripe_hits: AtomicUsize::new(0),
        last_prompt: Mutex::new(None),
        last_form: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/openrouter/chat/completions", post(chat))
        .route("/unsplash/search/photos", get(photos))
        .route("/stripe/checkout/sessions", post(checkout))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (fake, format!("http://{addr}"))
}

/// Fully configured app pointed at the fakes.
pub fn configured(base: &str) -> AppConfig {
    AppConfig {
        openrouter_api_key: Some("test-openrouter".into()),
        openrouter_base_url: format!("{base}/openrouter"),
        unsplash_access_key: Some("test-unsplash".into()),
        unsplash_base_url: format!("{base}/unsplash"),
        stripe_secret_key: Some("sk_test_123".into()),
        stripe_webhook_secret: Some(WEBHOOK_SECRET.into()),
        stripe_base_url: format!("{base}/stripe"),
        ..AppConfig::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new(config: AppConfig) -> Self {
        let state = AppState::new(config);
        Self { router: build_router(state.clone()), state }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }

    pub async fn post_json(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("POST").uri(uri).header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .post_json("/api/auth/register", json!({ "name": "Ana", "email": email, "password": "pw-123" }), None)
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }
}
