use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use woid_portal::{
    config::AppConfig,
    errors::ServiceError,
    services::backend::{functions, BackendClient},
    AppState,
};

pub const USER_ID: &str = "user_2member";
pub const OUTSIDER_ID: &str = "user_2outsider";

/// Backend double answering from canned values per function path.
#[derive(Default)]
pub struct FakeBackend {
    queries: Mutex<HashMap<String, Value>>,
    mutations: Mutex<HashMap<String, Value>>,
    failing: Mutex<Vec<String>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeBackend {
    pub fn on_query(&self, path: &str, value: Value) {
        self.queries.lock().unwrap().insert(path.to_string(), value);
    }

    pub fn on_mutation(&self, path: &str, value: Value) {
        self.mutations.lock().unwrap().insert(path.to_string(), value);
    }

    pub fn fail(&self, path: &str) {
        self.failing.lock().unwrap().push(path.to_string());
    }

    pub fn calls_to(&self, path: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, args)| args.clone())
            .collect()
    }

    fn answer(
        &self,
        table: &Mutex<HashMap<String, Value>>,
        path: &str,
        args: Value,
    ) -> Result<Value, ServiceError> {
        self.calls.lock().unwrap().push((path.to_string(), args.clone()));
        if self.failing.lock().unwrap().iter().any(|p| p == path) {
            return Err(ServiceError::ExternalServiceError(format!("{path} failed")));
        }
        if path == functions::GET_USER {
            return Ok(user_for(&args));
        }
        Ok(table.lock().unwrap().get(path).cloned().unwrap_or(Value::Null))
    }
}

fn user_for(args: &Value) -> Value {
    let token = args["tokenIdentifier"].as_str().unwrap_or_default();
    if token.ends_with(&format!("|{USER_ID}")) {
        json!({
            "_id": "users:1",
            "tokenIdentifier": token,
            "email": "crew.lead@example.com",
            "organizationIds": [{ "organizationId": "org-1", "role": "admin" }]
        })
    } else if token.ends_with(&format!("|{OUTSIDER_ID}")) {
        json!({ "_id": "users:2", "tokenIdentifier": token, "organizationIds": [] })
    } else {
        Value::Null
    }
}

#[async_trait]
impl BackendClient for FakeBackend {
    async fn query(&self, path: &str, args: Value) -> Result<Value, ServiceError> {
        self.answer(&self.queries, path, args)
    }

    async fn mutation(&self, path: &str, args: Value) -> Result<Value, ServiceError> {
        self.answer(&self.mutations, path, args)
    }
}

pub struct TestApp {
    router: Router,
    pub backend: Arc<FakeBackend>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub request_id: Option<String>,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::new(
            "https://quiet-heron-123.convex.cloud",
            "test",
        ))
    }

    pub fn with_config(config: AppConfig) -> Self {
        let backend = Arc::new(FakeBackend::default());
        let state = AppState::new(config, backend.clone());
        let router = woid_portal::build_router(state).expect("router should build");
        Self { router, backend }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let header_text = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let location = header_text(header::LOCATION.as_str());
        let request_id = header_text("x-request-id");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            location,
            request_id,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(USER_ID), None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(USER_ID), Some(body)).await
    }
}
