use super::{param, parse_filter};
use crate::aggregation::{build_address_history_view, AddressHistoryView, ViewOptions};
use crate::models::AddressHistorySnapshot;
use crate::{ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub address: Option<String>,
    pub filter: Option<String>,
    pub woid: Option<String>,
}

pub fn address_history_router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/:project_id/address-history",
            get(get_address_history),
        )
        .route("/address-history/aggregate", post(aggregate_snapshot))
}

fn view_options(state: &AppState, query: &HistoryQuery) -> Result<ViewOptions, crate::errors::ServiceError> {
    Ok(ViewOptions {
        filter: parse_filter(query.filter.as_deref())?,
        selected_woid: query
            .woid
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string),
        utc_offset: state.config.timeline_offset(),
    })
}

/// Aggregated activity of one address: work orders, stats, timeline, utilities and files.
pub async fn get_address_history(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<AddressHistoryView> {
    let options = view_options(&state, &query)?;
    let view = state
        .services
        .address_history
        .history(&project_id, param(&query.address), &options)
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

/// Aggregates a snapshot supplied by the caller without touching the backend.
pub async fn aggregate_snapshot(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
    Json(snapshot): Json<AddressHistorySnapshot>,
) -> ApiResult<AddressHistoryView> {
    let options = view_options(&state, &query)?;
    Ok(Json(ApiResponse::success(build_address_history_view(
        &snapshot, &options,
    ))))
}
