#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use quikko_api::{
    catalog::Catalog,
    config::AppConfig,
    db,
    events::{self},
    session::SESSION_HEADER,
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Application router and state over a fresh in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let pool = db::connect_in_memory()
            .await
            .expect("failed to create test database");

        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender, Catalog::default());
        let router = quikko_api::build_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(SESSION_HEADER, token);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Registers a customer and returns the `data` of the response.
    pub async fn register(&self, full_name: &str, email: &str, phone: &str, password: &str) -> Value {
        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/register",
                Some(json!({
                    "full_name": full_name,
                    "email": email,
                    "phone": phone,
                    "password": password,
                    "confirm_password": password,
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response_json(response).await["data"].clone()
    }

    /// Logs in and returns the session token.
    pub async fn login(&self, identifier: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                Some(json!({ "identifier": identifier, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        body["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Registers and logs in a fresh customer, returning the session token.
    pub async fn signed_in(&self, full_name: &str) -> String {
        let handle = full_name.to_lowercase().replace(' ', ".");
        let email = format!("{}@example.com", handle);
        let phone = format!("9{:09}", handle.len() * 7919);
        self.register(full_name, &email, &phone, "secret123").await;
        self.login(&email, "secret123").await
    }

    /// Places an order and returns the `data` of the response.
    pub async fn place_order(&self, token: &str, items: Value) -> Value {
        let response = self
            .request(
                Method::POST,
                "/api/v1/orders",
                Some(json!({ "address_id": "ADDR1001", "items": items })),
                Some(token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response_json(response).await["data"].clone()
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}
