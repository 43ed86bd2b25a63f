//! Probe endpoints mounted under `/health`.
//!
//! `/health` always answers, `/health/live` reports process uptime and
//! `/health/ready` round-trips to the backend deployment.

use crate::services::backend::BackendClient;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
}

/// Result of probing one dependency.
#[derive(Serialize, Debug, Clone)]
pub struct DependencyProbe {
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl DependencyProbe {
    fn up() -> Self {
        Self {
            status: ProbeStatus::Up,
            message: None,
            checked_at: Utc::now(),
        }
    }

    fn down(message: String) -> Self {
        Self {
            status: ProbeStatus::Down,
            message: Some(message),
            checked_at: Utc::now(),
        }
    }
}

pub struct ProbeState {
    backend: Arc<dyn BackendClient>,
    started: Instant,
}

impl ProbeState {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self {
            backend,
            started: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Pings every dependency; ready only when all of them are up.
    pub async fn probe(&self) -> (bool, BTreeMap<&'static str, DependencyProbe>) {
        let mut probes = BTreeMap::new();
        let backend = match self.backend.ping().await {
            Ok(()) => DependencyProbe::up(),
            Err(e) => {
                warn!(error = %e, "backend probe failed");
                DependencyProbe::down(e.public_message())
            }
        };
        probes.insert("backend", backend);

        let ready = probes.values().all(|p| p.status == ProbeStatus::Up);
        (ready, probes)
    }
}

async fn health() -> impl IntoResponse {
    debug!("health probe");
    Json(json!({
        "status": ProbeStatus::Up,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn live(State(state): State<Arc<ProbeState>>) -> impl IntoResponse {
    Json(json!({
        "alive": true,
        "uptime_seconds": state.uptime_seconds(),
    }))
}

async fn ready(State(state): State<Arc<ProbeState>>) -> impl IntoResponse {
    let (ready, details) = state.probe().await;
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        code,
        Json(json!({
            "ready": ready,
            "details": details,
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

pub fn health_routes(backend: Arc<dyn BackendClient>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/live", get(live))
        .route("/ready", get(ready))
        .with_state(Arc::new(ProbeState::new(backend)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ServiceError;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    struct StubBackend {
        reachable: bool,
    }

    #[async_trait]
    impl BackendClient for StubBackend {
        async fn query(&self, _path: &str, _args: Value) -> Result<Value, ServiceError> {
            Ok(Value::Null)
        }

        async fn mutation(&self, _path: &str, _args: Value) -> Result<Value, ServiceError> {
            Ok(Value::Null)
        }

        async fn ping(&self) -> Result<(), ServiceError> {
            if self.reachable {
                Ok(())
            } else {
                Err(ServiceError::ExternalServiceError("connection refused".into()))
            }
        }
    }

    async fn get_status(reachable: bool, uri: &str) -> (StatusCode, Value) {
        let response = health_routes(Arc::new(StubBackend { reachable }))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let code = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (code, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn ready_when_backend_answers() {
        let (status, body) = get_status(true, "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);
        assert_eq!(body["details"]["backend"]["status"], "up");
    }

    #[tokio::test]
    async fn not_ready_when_backend_unreachable() {
        let (status, body) = get_status(false, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["ready"], false);
    }

    #[tokio::test]
    async fn liveness_ignores_backend() {
        let (status, body) = get_status(false, "/live").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alive"], true);
    }
}
