use crate::config::ThemePalette;
use crate::errors::ServiceError;
use crate::models::BackendUser;
use crate::services::AuthenticatedUser;
use crate::{ApiResponse, ApiResult, AppState};
use axum::{extract::State, response::Json, routing::get, Extension, Router};
use serde::Serialize;
use tracing::instrument;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub user_id: String,
    pub token_identifier: String,
    pub has_organization_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<BackendUser>,
    /// Accent colours for the deployment the portal is connected to.
    pub theme: ThemePalette,
}

pub fn users_router() -> Router<AppState> {
    Router::new().route("/me", get(current_user))
}

/// Backend user record for the signed-in identity.
#[instrument(skip(state, user))]
pub async fn current_user(
    State(state): State<AppState>,
    user: Option<Extension<AuthenticatedUser>>,
) -> ApiResult<CurrentUserResponse> {
    let Some(Extension(AuthenticatedUser(user_id))) = user else {
        return Err(ServiceError::Unauthorized("sign-in required".into()));
    };

    let access = &state.services.access;
    let user = access.current_user(&user_id).await?;

    Ok(Json(ApiResponse::success(CurrentUserResponse {
        token_identifier: access.token_identifier(&user_id),
        has_organization_access: user.as_ref().is_some_and(BackendUser::has_organization),
        organization_id: user
            .as_ref()
            .and_then(BackendUser::primary_organization)
            .map(str::to_string),
        user,
        user_id,
        theme: state.config.theme(),
    })))
}
