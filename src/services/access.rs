//! Organization access checks and route gating.

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::models::BackendUser;
use crate::services::backend::{functions, query_as, BackendClient};
use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

pub const SIGN_IN_PATH: &str = "/sign-in";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
pub const REDIRECT_URL_PARAM: &str = "redirect_url";

const PUBLIC_PREFIXES: &[&str] = &["/sign-in", "/sign-up", "/health"];
const PUBLIC_EXACT: &[&str] = &[UNAUTHORIZED_PATH];

// Matched as prefixes of the text after any `.` in the path; `js` is handled
// separately so `.json` is not treated as a script.
const STATIC_EXTENSIONS: &[&str] = &[
    "htm", "css", "jpg", "jpeg", "webp", "png", "gif", "svg", "ttf", "woff", "ico", "csv",
    "doc", "xls", "zip", "webmanifest",
];

/// Builds the identity subject the backend stores users under.
pub fn token_identifier(issuer: &str, user_id: &str) -> String {
    format!("{issuer}|{user_id}")
}

pub fn is_public_route(path: &str) -> bool {
    PUBLIC_EXACT.contains(&path) || PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Framework internals and static files bypass the gate. API paths never do.
///
/// A path is static when any `.` in it is followed by a known extension, so
/// `/assets/logo.png/x` is static too. Extensions are case-sensitive.
pub fn is_static_asset(path: &str) -> bool {
    if is_api_path(path) {
        return false;
    }
    if path.starts_with("/_next") {
        return true;
    }
    path.match_indices('.').any(|(at, _)| {
        let rest = &path[at + 1..];
        match rest.strip_prefix("js") {
            Some(after) => !after.starts_with("on"),
            None => STATIC_EXTENSIONS.iter().any(|ext| rest.starts_with(ext)),
        }
    })
}

pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    /// No signed-in user. The sign-in location never carries `redirect_url`.
    RedirectToSignIn,
    /// Signed in, but the URL carries `redirect_url`; redirect to the same URL without it.
    RedirectClean(String),
}

impl RouteDecision {
    pub fn location(&self) -> Option<&str> {
        match self {
            RouteDecision::Allow => None,
            RouteDecision::RedirectToSignIn => Some(SIGN_IN_PATH),
            RouteDecision::RedirectClean(location) => Some(location),
        }
    }
}

/// Decides what happens to a request before any handler runs.
pub fn route_decision(path: &str, query: Option<&str>, user_id: Option<&str>) -> RouteDecision {
    if is_public_route(path) || is_static_asset(path) {
        return RouteDecision::Allow;
    }

    if user_id.map_or(true, str::is_empty) {
        return RouteDecision::RedirectToSignIn;
    }

    match query.filter(|q| !q.is_empty()) {
        Some(query) => strip_redirect_param(path, query)
            .map(RouteDecision::RedirectClean)
            .unwrap_or(RouteDecision::Allow),
        None => RouteDecision::Allow,
    }
}

/// Returns the relative URL without `redirect_url`, or `None` when the parameter is absent.
fn strip_redirect_param(path: &str, query: &str) -> Option<String> {
    let mut url = Url::parse("http://portal.invalid").ok()?.join(path).ok()?;
    url.set_query(Some(query));

    if !url.query_pairs().any(|(key, _)| key == REDIRECT_URL_PARAM) {
        return None;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != REDIRECT_URL_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let mut location = url.path().to_string();
    if let Some(query) = url.query() {
        location.push('?');
        location.push_str(query);
    }
    Some(location)
}

/// Looks users up in the backend by identity subject.
#[derive(Clone)]
pub struct AccessService {
    backend: Arc<dyn BackendClient>,
    issuer: String,
}

impl AccessService {
    pub fn new(backend: Arc<dyn BackendClient>, issuer: impl Into<String>) -> Self {
        Self {
            backend,
            issuer: issuer.into(),
        }
    }

    pub fn from_config(backend: Arc<dyn BackendClient>, config: &AppConfig) -> Self {
        Self::new(backend, config.identity_issuer())
    }

    pub fn token_identifier(&self, user_id: &str) -> String {
        token_identifier(&self.issuer, user_id)
    }

    #[instrument(skip(self))]
    pub async fn current_user(&self, user_id: &str) -> Result<Option<BackendUser>, ServiceError> {
        query_as(
            self.backend.as_ref(),
            functions::GET_USER,
            json!({ "tokenIdentifier": self.token_identifier(user_id) }),
        )
        .await
    }

    /// True only when the user exists and belongs to at least one organization.
    /// Lookup failures deny access.
    pub async fn check_organization_access(&self, user_id: &str) -> bool {
        match self.current_user(user_id).await {
            Ok(Some(user)) => user.has_organization(),
            Ok(None) => {
                debug!(user_id, "no backend user for identity");
                false
            }
            Err(e) => {
                warn!(user_id, error = %e, "organization access check failed");
                false
            }
        }
    }
}

/// Signed-in user id, inserted into request extensions by [`require_access`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

#[derive(Clone)]
pub struct AccessState {
    pub service: Arc<AccessService>,
    pub identity_header: HeaderName,
}

impl AccessState {
    pub fn new(service: Arc<AccessService>, identity_header: &str) -> Result<Self, ServiceError> {
        let identity_header = HeaderName::from_bytes(identity_header.as_bytes())
            .map_err(|e| ServiceError::InvalidInput(format!("invalid identity header: {e}")))?;
        Ok(Self {
            service,
            identity_header,
        })
    }
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::SEE_OTHER, [(header::LOCATION, value)]).into_response(),
        Err(_) => (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, HeaderValue::from_static(SIGN_IN_PATH))],
        )
            .into_response(),
    }
}

/// Gate applied to every route. API requests get JSON errors, page requests get redirects.
pub async fn require_access(
    State(state): State<AccessState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let api = is_api_path(&path);
    let user_id = request
        .headers()
        .get(&state.identity_header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    match route_decision(&path, request.uri().query(), user_id.as_deref()) {
        RouteDecision::Allow => {}
        RouteDecision::RedirectToSignIn if api => {
            return ServiceError::Unauthorized("sign-in required".into()).into_response();
        }
        decision @ (RouteDecision::RedirectToSignIn | RouteDecision::RedirectClean(_)) => {
            let location = decision.location().unwrap_or(SIGN_IN_PATH);
            debug!(%path, location, "redirecting");
            return redirect(location);
        }
    }

    if let Some(user_id) = user_id {
        if !is_public_route(&path) && !is_static_asset(&path) {
            if !state.service.check_organization_access(&user_id).await {
                if api {
                    return ServiceError::Forbidden("no organization access".into())
                        .into_response();
                }
                return redirect(UNAUTHORIZED_PATH);
            }
        }
        request.extensions_mut().insert(AuthenticatedUser(user_id));
    }

    next.run(request).await
}
