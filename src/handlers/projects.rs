use super::param;
use crate::models::{Project, TaskForce};
use crate::services::address_history::{ProjectBoard, SearchResponse, WoidReports};
use crate::{ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct WoidQuery {
    pub woid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub address: Option<String>,
    pub woid: Option<String>,
}

pub fn projects_router() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/:organization_id/projects",
            get(list_projects),
        )
        .route("/organizations/:organization_id/teams", get(list_teams))
        .route("/projects/:project_id/board", get(project_board))
        .route("/projects/:project_id/daily-reports", get(daily_reports))
        .route("/projects/:project_id/search", get(search_address))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Path(organization_id): Path<String>,
) -> ApiResult<Vec<Project>> {
    let projects = state
        .services
        .address_history
        .projects(&organization_id)
        .await?;
    Ok(Json(ApiResponse::success(projects)))
}

pub async fn list_teams(
    State(state): State<AppState>,
    Path(organization_id): Path<String>,
) -> ApiResult<Vec<TaskForce>> {
    let teams = state.services.address_history.teams(&organization_id).await?;
    Ok(Json(ApiResponse::success(teams)))
}

/// Every address of the project with void and completion highlighting.
pub async fn project_board(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<ProjectBoard> {
    let board = state.services.address_history.board(&project_id).await?;
    Ok(Json(ApiResponse::success(board)))
}

pub async fn daily_reports(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<WoidQuery>,
) -> ApiResult<WoidReports> {
    let reports = state
        .services
        .address_history
        .daily_reports(&project_id, param(&query.woid))
        .await?;
    Ok(Json(ApiResponse::success(reports)))
}

pub async fn search_address(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let found = state
        .services
        .address_history
        .search(&project_id, param(&query.address), query.woid.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(found)))
}
