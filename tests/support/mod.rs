#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use f0_core::InMemoryLedgerStore;
use fortune0::{build_app, AppConfig, AppState};
use serde_json::Value;
use tower::ServiceExt;

pub const ADMIN_KEY: &str = "test-admin-key";

pub fn memory_state(admin_key: Option<&str>) -> AppState {
    AppState::with_store(AppConfig::in_memory(admin_key), Arc::new(InMemoryLedgerStore::new()))
}

pub fn memory_app() -> (AppState, Router) {
    let state = memory_state(Some(ADMIN_KEY));
    (state.clone(), build_app(state))
}

pub struct Reply {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Value,
}

pub async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response.headers()
                           .get(header::LOCATION)
                           .and_then(|v| v.to_str().ok())
                           .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    Reply { status,
            location,
            body }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder().method("POST")
                                        .uri(uri)
                                        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn admin_get(uri: &str, key: &str) -> Request<Body> {
    Request::builder().method("GET")
                      .uri(uri)
                      .header("x-admin-key", key)
                      .body(Body::empty())
                      .unwrap()
}

pub fn admin_post(uri: &str, key: &str, body: Value) -> Request<Body> {
    Request::builder().method("POST")
                      .uri(uri)
                      .header(header::CONTENT_TYPE, "application/json")
                      .header("x-admin-key", key)
                      .body(Body::from(body.to_string()))
                      .unwrap()
}

/// Alta vía HTTP; devuelve el cuerpo completo (token, código y clave).
pub async fn enroll(app: &Router, email: &str, referral: Option<&str>) -> Value {
    let reply = send(app, post("/api/signup", None, serde_json::json!({ "email": email, "ref": referral }))).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.body
}

/// Alta vía HTTP; devuelve (token, referral_code).
pub async fn signup(app: &Router, email: &str, referral: Option<&str>) -> (String, String) {
    let body = enroll(app, email, referral).await;
    (body["token"].as_str().unwrap().to_string(), body["referral_code"].as_str().unwrap().to_string())
}
