//! Quikko Orders
//!
//! Order management backend for the Quikko food ordering app: a fixed catalog,
//! the order lifecycle (place, cancel, pay) and the archive of paid orders.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod catalog;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod session;
pub mod tracing;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::ToSchema;

use crate::catalog::Catalog;
use crate::session::SessionStore;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub sessions: Arc<SessionStore>,
    pub catalog: Arc<Catalog>,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
        catalog: Catalog,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let services = handlers::AppServices::new(
            db.clone(),
            Arc::new(event_sender),
            catalog.clone(),
            &config,
        );
        let sessions = Arc::new(SessionStore::new(config.session_ttl()));
        Self {
            db,
            config,
            services,
            sessions,
            catalog,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Routes mounted under `/api/v1`. Everything except auth entry points and the
/// catalog requires a session.
pub fn api_v1_routes() -> Router<AppState> {
    let auth = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/reset-password", post(handlers::auth::reset_password))
        .route("/auth/me", get(handlers::auth::me));

    let orders = Router::new()
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/orders/payable", get(handlers::orders::list_payable_orders))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route(
            "/orders/:id/cancel/request",
            post(handlers::orders::request_cancel),
        )
        .route(
            "/orders/:id/cancel/confirm",
            post(handlers::orders::confirm_cancel),
        )
        .route(
            "/orders/:id/cancel/dismiss",
            post(handlers::orders::dismiss_cancel),
        )
        .route("/orders/:id/pay", post(handlers::orders::pay_order));

    Router::new()
        .merge(auth)
        .merge(orders)
        .route("/catalog", get(handlers::catalog::list_products))
        .route("/history", get(handlers::history::list_history))
}

/// Full application router with health, metrics, docs and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = if state.config.is_production() {
        CorsLayer::new()
    } else {
        CorsLayer::permissive()
    };

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .nest("/api/v1", api_v1_routes())
        .layer(cors)
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
