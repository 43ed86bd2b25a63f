use crate::services::upload::{AssignmentRow, BulkInsertResult, PreviewRequest, UploadRequest};
use crate::{ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::post,
    Router,
};
use tracing::info;

pub fn uploads_router() -> Router<AppState> {
    Router::new()
        .route("/projects/:project_id/uploads", post(submit_upload))
        .route("/projects/:project_id/uploads/preview", post(preview_upload))
}

/// First rows of the sheet as they would be imported.
pub async fn preview_upload(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(request): Json<PreviewRequest>,
) -> ApiResult<Vec<AssignmentRow>> {
    let rows = state.services.upload.preview(&project_id, &request)?;
    Ok(Json(ApiResponse::success(rows)))
}

pub async fn submit_upload(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(request): Json<UploadRequest>,
) -> ApiResult<BulkInsertResult> {
    let result = state.services.upload.submit(&project_id, &request).await?;
    let (_, hidden) = result.error_summary();
    info!(%project_id, hidden_errors = hidden, "upload finished");

    let message = format!(
        "Created: {}, Updated: {}, Errors: {}",
        result.created,
        result.updated,
        result.errors.len()
    );
    Ok(Json(ApiResponse::success_with_message(result, message)))
}
