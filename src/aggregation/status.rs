use crate::models::TeamRecord;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// A team assignment status after normalization.
///
/// The backend stores free-form text. Matching trims and lower-cases the value;
/// anything outside the known set is kept as `Other` and treated as "not done".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamStatus {
    Complete,
    Incomplete,
    Void,
    Unset,
    Other(String),
}

impl TeamStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return TeamStatus::Unset;
        };
        match raw.trim().to_lowercase().as_str() {
            "" => TeamStatus::Unset,
            "complete" => TeamStatus::Complete,
            "incomplete" => TeamStatus::Incomplete,
            "void" => TeamStatus::Void,
            _ => TeamStatus::Other(raw.to_string()),
        }
    }

    pub fn of(team: &TeamRecord) -> Self {
        Self::parse(team.status.as_deref())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TeamStatus::Void)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, TeamStatus::Complete)
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            TeamStatus::Complete => StatusTone::Success,
            TeamStatus::Void => StatusTone::Warning,
            TeamStatus::Incomplete => StatusTone::Muted,
            TeamStatus::Unset | TeamStatus::Other(_) => StatusTone::Neutral,
        }
    }
}

/// Derived status of one work order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkOrderStatus {
    Complete,
    Void,
    InProgress,
    NotStarted,
}

/// Colour family a view should use for a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusTone {
    Success,
    Warning,
    Pending,
    Muted,
    Neutral,
}

impl StatusTone {
    /// Tone of a utility locate status such as "Clear", "Marked" or "Pending response".
    pub fn for_utility_status(status: &str) -> Self {
        let status = status.to_lowercase();
        if status.contains("clear") || status.contains("marked") {
            StatusTone::Success
        } else if status.contains("pending") || status.contains("wait") {
            StatusTone::Pending
        } else {
            StatusTone::Neutral
        }
    }

    /// Tone of a daily report's completion status.
    pub fn for_report_status(status: &str) -> Self {
        match TeamStatus::parse(Some(status)) {
            TeamStatus::Complete => StatusTone::Success,
            TeamStatus::Void => StatusTone::Warning,
            _ => StatusTone::Neutral,
        }
    }
}

/// Classifies a work order from its team statuses.
///
/// Void dominates. Complete requires at least one team and every team complete.
/// Any other non-empty set is in progress; an empty set has not started.
pub fn classify<'a, I>(statuses: I) -> WorkOrderStatus
where
    I: IntoIterator<Item = &'a TeamStatus>,
{
    let mut seen_any = false;
    let mut all_complete = true;
    for status in statuses {
        if status.is_void() {
            return WorkOrderStatus::Void;
        }
        seen_any = true;
        all_complete &= status.is_complete();
    }

    match (seen_any, all_complete) {
        (true, true) => WorkOrderStatus::Complete,
        (true, false) => WorkOrderStatus::InProgress,
        (false, _) => WorkOrderStatus::NotStarted,
    }
}

pub fn classify_teams(teams: &[TeamRecord]) -> WorkOrderStatus {
    let statuses: Vec<TeamStatus> = teams.iter().map(TeamStatus::of).collect();
    classify(&statuses)
}
