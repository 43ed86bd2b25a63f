//! Client for the managed backend's HTTP function API.
//!
//! Queries and mutations are addressed by `module:function` paths and posted as
//! `{"path", "args", "format": "json"}`. The backend answers with a status envelope.

use crate::config::AppConfig;
use crate::errors::ServiceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Function paths exposed by the backend deployment.
pub mod functions {
    pub const GET_USER: &str = "users:getUser";
    pub const PROJECTS_FOR_ORGANIZATION: &str = "projects:getProjectsForCurrentUser";
    pub const GET_PROJECT: &str = "projects:getProject";
    pub const TASK_FORCES: &str = "taskForces:getTaskForces";
    pub const WOIDS_WITH_DETAILS: &str = "woidAssignments:getAllWithDetails";
    pub const DAILY_REPORTS_BY_WOID: &str = "woidAssignments:getDailyReportsByWOID";
    pub const BULK_INSERT_ASSIGNMENTS: &str = "woidAssignments:bulkInsertFromExcel";
    pub const ADDRESS_HISTORY: &str = "addressHistory:getAddressHistory";
    pub const SEARCH_BY_ADDRESS: &str = "addressSearch:searchByAddress";
    pub const TICKET_UPDATES: &str = "ticketUpdates:getUpdatesByTicket";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Query,
    Mutation,
}

impl FunctionKind {
    fn endpoint(self) -> &'static str {
        match self {
            FunctionKind::Query => "api/query",
            FunctionKind::Mutation => "api/mutation",
        }
    }
}

#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn query(&self, path: &str, args: Value) -> Result<Value, ServiceError>;

    async fn mutation(&self, path: &str, args: Value) -> Result<Value, ServiceError>;

    /// Cheap reachability probe used by readiness checks.
    async fn ping(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Runs a query and decodes its value.
pub async fn query_as<T: DeserializeOwned>(
    backend: &dyn BackendClient,
    path: &str,
    args: Value,
) -> Result<T, ServiceError> {
    let value = backend.query(path, args).await?;
    decode(path, value)
}

/// Runs a mutation and decodes its value.
pub async fn mutation_as<T: DeserializeOwned>(
    backend: &dyn BackendClient,
    path: &str,
    args: Value,
) -> Result<T, ServiceError> {
    let value = backend.mutation(path, args).await?;
    decode(path, value)
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ServiceError> {
    serde_json::from_value(value).map_err(|e| {
        warn!(function = path, error = %e, "unexpected backend response shape");
        ServiceError::SerializationError(format!("{path}: {e}"))
    })
}

#[derive(Serialize)]
struct FunctionRequest<'a> {
    path: &'a str,
    args: Value,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum FunctionResponse {
    Success {
        #[serde(default)]
        value: Value,
    },
    Error {
        #[serde(rename = "errorMessage", default)]
        error_message: String,
    },
}

/// [`BackendClient`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpBackendClient {
    client: Client,
    base_url: Url,
}

impl HttpBackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ServiceError::InvalidInput(format!("invalid backend URL: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: Url, client: Client) -> Self {
        Self { client, base_url }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(&config.backend_url, config.request_timeout())
    }

    fn endpoint(&self, kind: FunctionKind) -> Result<Url, ServiceError> {
        self.base_url
            .join(kind.endpoint())
            .map_err(|e| ServiceError::InternalError(format!("invalid backend endpoint: {e}")))
    }

    #[instrument(skip(self, args))]
    async fn call(&self, kind: FunctionKind, path: &str, args: Value) -> Result<Value, ServiceError> {
        let request = FunctionRequest {
            path,
            args,
            format: "json",
        };

        let response = self
            .client
            .post(self.endpoint(kind)?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        debug!(%status, bytes = body.len(), "backend responded");

        match serde_json::from_slice::<FunctionResponse>(&body) {
            Ok(FunctionResponse::Success { value }) if status.is_success() => Ok(value),
            Ok(FunctionResponse::Error { error_message }) => {
                warn!(function = path, %status, error = %error_message, "backend function failed");
                Err(ServiceError::ExternalServiceError(format!(
                    "{path}: {error_message}"
                )))
            }
            _ => {
                let text = String::from_utf8_lossy(&body);
                warn!(function = path, %status, "unexpected backend response");
                Err(ServiceError::ExternalServiceError(format!(
                    "{path} returned {status}: {text}"
                )))
            }
        }
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn query(&self, path: &str, args: Value) -> Result<Value, ServiceError> {
        self.call(FunctionKind::Query, path, args).await
    }

    async fn mutation(&self, path: &str, args: Value) -> Result<Value, ServiceError> {
        self.call(FunctionKind::Mutation, path, args).await
    }

    /// Any HTTP answer counts as reachable; only transport failures do not.
    async fn ping(&self) -> Result<(), ServiceError> {
        self.client.get(self.base_url.clone()).send().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> HttpBackendClient {
        HttpBackendClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn query_posts_function_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/query"))
            .and(body_json(json!({
                "path": functions::GET_PROJECT,
                "args": { "projectId": "p-1" },
                "format": "json"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "value": { "_id": "p-1", "name": "Fiber North" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let project: crate::models::Project = query_as(
            &client,
            functions::GET_PROJECT,
            json!({ "projectId": "p-1" }),
        )
        .await
        .unwrap();
        assert_eq!(project.name, "Fiber North");
    }

    #[tokio::test]
    async fn mutation_uses_mutation_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/mutation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "value": { "created": 2, "updated": 0, "errors": [] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let value = client
            .mutation(functions::BULK_INSERT_ASSIGNMENTS, json!({}))
            .await
            .unwrap();
        assert_eq!(value["created"], 2);
    }

    #[tokio::test]
    async fn error_envelope_maps_to_external_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/query"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": "error",
                "errorMessage": "Project not found"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .query(functions::GET_PROJECT, json!({ "projectId": "nope" }))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ExternalServiceError(msg) if msg.contains("Project not found"));
    }

    #[tokio::test]
    async fn non_json_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.query(functions::GET_USER, json!({})).await.unwrap_err();
        assert_matches!(err, ServiceError::ExternalServiceError(msg) if msg.contains("502"));
    }

    #[tokio::test]
    async fn unexpected_value_shape_is_a_serialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "value": [1, 2, 3]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result: Result<crate::models::Project, _> =
            query_as(&client, functions::GET_PROJECT, json!({})).await;
        assert_matches!(result, Err(ServiceError::SerializationError(_)));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert_matches!(
            HttpBackendClient::new("not a url", Duration::from_secs(1)),
            Err(ServiceError::InvalidInput(_))
        );
    }
}
