//! Address activity aggregation.
//!
//! Everything here is a pure function of one [`AddressHistorySnapshot`]; views are
//! rebuilt from scratch whenever a new snapshot arrives.

pub mod board;
pub mod files;
pub mod grouping;
pub mod stats;
pub mod status;
pub mod timeline;
pub mod utilities;

pub use board::{build_board, BoardRowView, RowHighlight};
pub use files::{file_views, is_image, FileKind, FileView};
pub use grouping::{group_snapshot, GroupedHistory, WoidMap};
pub use stats::{completion_percentage, completion_stats, CompletionStats};
pub use status::{classify, classify_teams, StatusTone, TeamStatus, WorkOrderStatus};
pub use timeline::{bucket_by_day, build_timeline, TimelineDay, TimelineEvent, TimelineFilter};
pub use utilities::{utilities_for_tickets, TicketUtilities, UtilityStatus};

use crate::models::{AddressHistorySnapshot, DailyReport, HistorySummary, Millis, TeamRecord};
use chrono::{FixedOffset, Offset, Utc};
use serde::Serialize;
use serde_json::Value;

const NOT_STARTED_LABEL: &str = "Not Started";
const DEFAULT_INITIALS: &str = "TM";

/// Caller-selected knobs for [`build_address_history_view`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOptions {
    pub filter: TimelineFilter,
    /// Restricts the team panels to one WOID. Stats and timeline still cover the address.
    pub selected_woid: Option<String>,
    /// Offset used to decide which calendar day an event belongs to.
    pub utc_offset: FixedOffset,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            filter: TimelineFilter::All,
            selected_woid: None,
            utc_offset: Utc.fix(),
        }
    }
}

/// Sidebar entry for one WOID.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderSummary {
    pub work_order_id: String,
    pub status: WorkOrderStatus,
    pub team_count: usize,
    pub report_count: usize,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub initials: String,
    /// Raw status text, or "Not Started" when none is recorded.
    pub label: String,
    pub tone: StatusTone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<Millis>,
}

impl From<&TeamRecord> for TeamView {
    fn from(team: &TeamRecord) -> Self {
        let initials: String = team
            .task_force_name
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(2)
            .collect::<String>()
            .to_uppercase();
        let label = team
            .status
            .as_deref()
            .filter(|status| !status.is_empty())
            .unwrap_or(NOT_STARTED_LABEL);

        TeamView {
            name: team.task_force_name.clone(),
            initials: if initials.is_empty() {
                DEFAULT_INITIALS.to_string()
            } else {
                initials
            },
            label: label.to_string(),
            tone: TeamStatus::of(team).tone(),
            completion_date: team.completion_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPanel {
    pub work_order_id: String,
    pub status: WorkOrderStatus,
    pub teams: Vec<TeamView>,
}

/// Flattened daily report as shown in the report detail dialog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_order_id: Option<String>,
    pub created_at: Millis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_tone: Option<StatusTone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Structured details as `(key, text)` pairs, in key order.
    pub details: Vec<(String, String)>,
    pub files: Vec<FileView>,
}

fn detail_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub fn report_detail(report: &DailyReport) -> ReportDetail {
    let completion_status = report
        .completion_status
        .as_deref()
        .filter(|status| !status.is_empty());

    let mut details: Vec<(String, String)> = report
        .details
        .iter()
        .flatten()
        .map(|(key, value)| (key.clone(), detail_text(value)))
        .collect();
    details.sort_by(|a, b| a.0.cmp(&b.0));

    ReportDetail {
        id: report.id.clone(),
        work_order_id: report.work_order_id.clone(),
        created_at: report.creation_time,
        completion_status: completion_status.map(str::to_string),
        status_tone: completion_status.map(StatusTone::for_report_status),
        note: report.note_text().map(str::to_string),
        details,
        files: file_views(&report.files),
    }
}

/// Everything the address history page renders for one address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressHistoryView {
    pub work_orders: Vec<WorkOrderSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_woid: Option<String>,
    pub team_panels: Vec<TeamPanel>,
    pub stats: CompletionStats,
    pub timeline_filter: TimelineFilter,
    pub event_count: usize,
    pub timeline: Vec<TimelineDay>,
    pub utilities: Vec<TicketUtilities>,
    pub files: Vec<FileView>,
    /// Count of every file on the address, including files not tied to a WOID.
    pub total_files: usize,
    pub summary: HistorySummary,
}

pub fn build_address_history_view(
    snapshot: &AddressHistorySnapshot,
    options: &ViewOptions,
) -> AddressHistoryView {
    let grouped = group_snapshot(snapshot);

    let work_orders = grouped
        .woids()
        .map(|woid| {
            let teams = grouped.teams_for(woid);
            WorkOrderSummary {
                work_order_id: woid.to_string(),
                status: classify_teams(teams),
                team_count: teams.len(),
                report_count: grouped.reports_for(woid).len(),
                file_count: grouped.files_for(woid).len(),
            }
        })
        .collect();

    let selected = options.selected_woid.as_deref();
    let team_panels = grouped
        .teams
        .iter()
        .filter(|(woid, _)| selected.map_or(true, |wanted| wanted == *woid))
        .map(|(woid, teams)| TeamPanel {
            work_order_id: woid.to_string(),
            status: classify_teams(teams),
            teams: teams.iter().map(TeamView::from).collect(),
        })
        .collect();

    let events = build_timeline(&snapshot.daily_reports, &snapshot.tickets, options.filter);
    let event_count = events.len();

    AddressHistoryView {
        work_orders,
        selected_woid: options.selected_woid.clone(),
        team_panels,
        stats: completion_stats(grouped.teams.values().copied()),
        timeline_filter: options.filter,
        event_count,
        timeline: bucket_by_day(events, options.utc_offset),
        utilities: utilities_for_tickets(&snapshot.tickets),
        files: file_views(&snapshot.files),
        total_files: snapshot.files.len(),
        summary: snapshot.summary.clone(),
    }
}
