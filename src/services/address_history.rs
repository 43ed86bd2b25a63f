//! Read side of the portal: fetches records from the backend and shapes them for views.

use crate::aggregation::{
    build_address_history_view, build_board, report_detail, AddressHistoryView, BoardRowView,
    ReportDetail, ViewOptions,
};
use crate::errors::ServiceError;
use crate::models::{
    AddressBoardRow, AddressHistorySnapshot, AddressSearchResult, DailyReport, Project, TaskForce,
    TicketUpdate,
};
use crate::services::backend::{functions, query_as, BackendClient};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

fn require<'a>(name: &str, value: &'a str) -> Result<&'a str, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ServiceError::ValidationError(format!("{name} is required")))
    } else {
        Ok(trimmed)
    }
}

/// A project's board together with the project it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBoard {
    pub project: Project,
    pub address_count: usize,
    pub void_count: usize,
    pub complete_count: usize,
    pub rows: Vec<BoardRowView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub woid: Option<String>,
    pub is_empty: bool,
    pub result: AddressSearchResult,
    /// Updates of the address's first ticket, newest first.
    pub ticket_updates: Vec<TicketUpdate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WoidReports {
    pub work_order_id: String,
    pub reports: Vec<ReportDetail>,
}

#[derive(Clone)]
pub struct AddressHistoryService {
    backend: Arc<dyn BackendClient>,
}

impl AddressHistoryService {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    #[instrument(skip(self))]
    pub async fn snapshot(
        &self,
        project_id: &str,
        address: &str,
    ) -> Result<AddressHistorySnapshot, ServiceError> {
        let project_id = require("projectId", project_id)?;
        let address = require("address", address)?;

        let snapshot: Option<AddressHistorySnapshot> = query_as(
            self.backend.as_ref(),
            functions::ADDRESS_HISTORY,
            json!({ "address": address, "projectId": project_id }),
        )
        .await?;

        snapshot.ok_or_else(|| ServiceError::NotFound(format!("no history for address {address}")))
    }

    pub async fn history(
        &self,
        project_id: &str,
        address: &str,
        options: &ViewOptions,
    ) -> Result<AddressHistoryView, ServiceError> {
        let snapshot = self.snapshot(project_id, address).await?;
        let view = build_address_history_view(&snapshot, options);
        debug!(
            work_orders = view.work_orders.len(),
            events = view.event_count,
            "address history aggregated"
        );
        Ok(view)
    }

    #[instrument(skip(self))]
    pub async fn project(&self, project_id: &str) -> Result<Project, ServiceError> {
        let project_id = require("projectId", project_id)?;
        let project: Option<Project> = query_as(
            self.backend.as_ref(),
            functions::GET_PROJECT,
            json!({ "projectId": project_id }),
        )
        .await?;
        project.ok_or_else(|| ServiceError::NotFound(format!("project {project_id}")))
    }

    #[instrument(skip(self))]
    pub async fn board(&self, project_id: &str) -> Result<ProjectBoard, ServiceError> {
        let project = self.project(project_id).await?;
        let rows: Vec<AddressBoardRow> = query_as(
            self.backend.as_ref(),
            functions::WOIDS_WITH_DETAILS,
            json!({ "projectId": project.id }),
        )
        .await?;

        let rows = build_board(&rows, project.completing_team_id.as_deref());
        Ok(ProjectBoard {
            address_count: rows.len(),
            void_count: rows.iter().filter(|row| row.has_void_team).count(),
            complete_count: rows.iter().filter(|row| row.is_complete).count(),
            project,
            rows,
        })
    }

    /// Searches a project by address. With a WOID the work orders narrow to that one.
    /// Updates of the first ticket are loaded whenever the address has tickets.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        project_id: &str,
        address: &str,
        woid: Option<&str>,
    ) -> Result<SearchResponse, ServiceError> {
        let project_id = require("projectId", project_id)?;
        let address = require("address", address)?;
        let woid = woid.map(str::trim).filter(|w| !w.is_empty());

        let mut result: AddressSearchResult = query_as::<Option<AddressSearchResult>>(
            self.backend.as_ref(),
            functions::SEARCH_BY_ADDRESS,
            json!({ "address": address, "projectId": project_id }),
        )
        .await?
        .unwrap_or_default();

        if let Some(woid) = woid {
            result.retain_woid(woid);
        }

        let mut ticket_updates = Vec::new();
        if let Some(ticket) = result.tickets.first() {
            ticket_updates = query_as::<Option<Vec<TicketUpdate>>>(
                self.backend.as_ref(),
                functions::TICKET_UPDATES,
                json!({ "ticketId": ticket.ticket_id, "address": address }),
            )
            .await?
            .unwrap_or_default();
            ticket_updates.sort_by(|a, b| b.creation_time.total_cmp(&a.creation_time));
        }

        Ok(SearchResponse {
            address: address.to_string(),
            woid: woid.map(str::to_string),
            is_empty: result.is_empty(),
            result,
            ticket_updates,
        })
    }

    #[instrument(skip(self))]
    pub async fn daily_reports(
        &self,
        project_id: &str,
        woid: &str,
    ) -> Result<WoidReports, ServiceError> {
        let project_id = require("projectId", project_id)?;
        let woid = require("woid", woid)?;

        let reports: Vec<DailyReport> = query_as::<Option<Vec<DailyReport>>>(
            self.backend.as_ref(),
            functions::DAILY_REPORTS_BY_WOID,
            json!({ "workOrderId": woid, "projectId": project_id }),
        )
        .await?
        .unwrap_or_default();

        Ok(WoidReports {
            work_order_id: woid.to_string(),
            reports: reports.iter().map(report_detail).collect(),
        })
    }

    #[instrument(skip(self))]
    pub async fn projects(&self, organization_id: &str) -> Result<Vec<Project>, ServiceError> {
        let organization_id = require("organizationId", organization_id)?;
        let projects: Option<Vec<Project>> = query_as(
            self.backend.as_ref(),
            functions::PROJECTS_FOR_ORGANIZATION,
            json!({ "organizationId": organization_id }),
        )
        .await?;
        Ok(projects.unwrap_or_default())
    }

    #[instrument(skip(self))]
    pub async fn teams(&self, organization_id: &str) -> Result<Vec<TaskForce>, ServiceError> {
        let organization_id = require("organizationId", organization_id)?;
        let teams: Option<Vec<TaskForce>> = query_as(
            self.backend.as_ref(),
            functions::TASK_FORCES,
            json!({ "organizationId": organization_id }),
        )
        .await?;
        Ok(teams.unwrap_or_default())
    }
}
