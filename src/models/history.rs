use super::{null_as_default, Millis};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A WOID assigned to an address within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WoidAssignment {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub work_order_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completing_team_id: Option<String>,
}

/// One team (task force) assigned to a WOID.
///
/// `status` is free-form text; see [`crate::aggregation::status::TeamStatus`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_force_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_force_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<Millis>,
}

/// Team records pre-grouped by WOID on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAssignmentGroup {
    pub work_order_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub teams: Vec<TeamRecord>,
}

/// A daily report filed by a field team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_creationTime")]
    pub creation_time: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_force_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Millis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Vec<FileRecord>,
}

impl DailyReport {
    /// Notes take precedence over the legacy `comment` field. Blank text counts as absent.
    pub fn note_text(&self) -> Option<&str> {
        [self.notes.as_deref(), self.comment.as_deref()]
            .into_iter()
            .flatten()
            .find(|text| !text.is_empty())
    }

    pub fn has_details(&self) -> bool {
        self.details.as_ref().is_some_and(|details| !details.is_empty())
    }
}

/// Daily reports pre-grouped by WOID on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGroup {
    pub work_order_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reports: Vec<DailyReport>,
}

/// A status change reported by a utility company for a locate ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdate {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_creationTime")]
    pub creation_time: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub utility_company: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    /// Anything else the backend attached, e.g. the notification email's subject and sender.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// A utility-locate ticket with its nested updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub ticket_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<Millis>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updates: Vec<TicketUpdate>,
}

/// A stored file; only its metadata and download link are consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_creationTime", default)]
    pub creation_time: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_order_id: Option<String>,
}

impl FileRecord {
    /// Storage link, preferring the drive URL over the generic one.
    pub fn link(&self) -> Option<&str> {
        self.google_url
            .as_deref()
            .or(self.url.as_deref())
            .filter(|link| !link.is_empty())
    }

    /// WOID the file is attached to, if any. Blank ids count as unattached.
    pub fn woid(&self) -> Option<&str> {
        self.work_order_id.as_deref().filter(|woid| !woid.is_empty())
    }
}

/// Backend-computed totals for an address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistorySummary {
    pub total_teams: u64,
    pub total_files: u64,
    pub total_reports: u64,
    pub total_tickets: u64,
}

/// Everything the backend returns for one address in one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressHistorySnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub woid_assignments: Vec<WoidAssignment>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub task_force_assignments: Vec<TeamAssignmentGroup>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub daily_reports: Vec<ReportGroup>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tickets: Vec<Ticket>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Vec<FileRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: HistorySummary,
}
