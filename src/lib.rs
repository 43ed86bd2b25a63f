//! WOID portal library
//!
//! Work order administration for field-work projects: address activity aggregation,
//! project boards, utility ticket tracking and WOID assignment uploads, served over a
//! JSON API in front of the managed backend.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod aggregation;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod models;
pub mod services;
pub mod tracing;

use axum::{extract::DefaultBodyLimit, response::Json, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::services::access::{require_access, AccessState};
use crate::services::backend::{BackendClient, HttpBackendClient};

/// Shared state handed to every API handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub backend: Arc<dyn BackendClient>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(config: config::AppConfig, backend: Arc<dyn BackendClient>) -> Self {
        let services = handlers::AppServices::new(backend.clone(), &config);
        Self {
            config: Arc::new(config),
            backend,
            services,
        }
    }

    /// State talking to the configured backend over HTTP.
    pub fn from_config(config: config::AppConfig) -> Result<Self, errors::ServiceError> {
        let backend: Arc<dyn BackendClient> = Arc::new(HttpBackendClient::from_config(&config)?);
        Ok(Self::new(config, backend))
    }
}

/// Envelope wrapped around every successful API payload.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn now() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|id| id.to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: ResponseMeta::now(),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }
}

/// Return type of the JSON handlers.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::users::users_router())
        .merge(handlers::projects::projects_router())
        .merge(handlers::address_history::address_history_router())
        .merge(handlers::uploads::uploads_router())
}

/// Routes plus the middleware stack. Request ids are assigned before the
/// trace span opens, and access is decided inside that span.
pub fn build_router(state: AppState) -> Result<Router, errors::ServiceError> {
    let access_state = AccessState::new(
        state.services.access.clone(),
        &state.config.identity_header,
    )?;
    let body_limit = state.config.max_body_size;
    let backend = state.backend.clone();

    Ok(Router::new()
        .route("/", get(|| async { "woid-portal up" }))
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
        .nest("/health", health::health_routes(backend))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn_with_state(
            access_state,
            require_access,
        ))
        .layer(crate::tracing::http_trace_layer())
        .layer(axum::middleware::from_fn(crate::tracing::assign_request_id)))
}
