//! Project board: every address of a project with its WOIDs and the teams on them.

use super::status::{classify_teams, StatusTone, TeamStatus, WorkOrderStatus};
use crate::models::{AddressBoardRow, BoardTicket, Millis, TeamRecord};
use serde::Serialize;

/// Row emphasis. A void team anywhere on the address outranks completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowHighlight {
    Void,
    Complete,
    Default,
}

/// What the completion column shows for one team.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletionMark {
    Void,
    Completed { date: Millis },
    Pending,
}

impl CompletionMark {
    fn of(status: &TeamStatus, completion_date: Option<Millis>) -> Self {
        match (status, completion_date) {
            (TeamStatus::Void, _) => CompletionMark::Void,
            (_, Some(date)) => CompletionMark::Completed { date },
            (_, None) => CompletionMark::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardTeamView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_force_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_force_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub tone: StatusTone,
    pub is_completing_team: bool,
    pub completion: CompletionMark,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardWoidView {
    pub work_order_id: String,
    pub status: WorkOrderStatus,
    pub teams: Vec<BoardTeamView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardRowView {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub woid_count: usize,
    pub has_void_team: bool,
    pub is_complete: bool,
    pub highlight: RowHighlight,
    pub woids: Vec<BoardWoidView>,
    pub tickets: Vec<BoardTicket>,
}

fn is_completing(team: &TeamRecord, completing_team_id: Option<&str>) -> bool {
    match (completing_team_id, team.task_force_id.as_deref()) {
        (Some(completing), Some(id)) => completing == id,
        _ => false,
    }
}

fn team_view(team: &TeamRecord, completing_team_id: Option<&str>) -> BoardTeamView {
    let status = TeamStatus::of(team);
    BoardTeamView {
        task_force_id: team.task_force_id.clone(),
        task_force_name: team.task_force_name.clone(),
        status: team.status.clone(),
        tone: status.tone(),
        is_completing_team: is_completing(team, completing_team_id),
        completion: CompletionMark::of(&status, team.completion_date),
    }
}

pub fn board_row(row: &AddressBoardRow, completing_team_id: Option<&str>) -> BoardRowView {
    let teams = || row.woids.iter().flat_map(|woid| woid.teams.iter());

    let has_void_team = teams().any(|team| TeamStatus::of(team).is_void());
    let is_complete = teams().any(|team| {
        is_completing(team, completing_team_id) && TeamStatus::of(team).is_complete()
    });
    let highlight = if has_void_team {
        RowHighlight::Void
    } else if is_complete {
        RowHighlight::Complete
    } else {
        RowHighlight::Default
    };

    BoardRowView {
        address: row.address.clone(),
        project_name: row.project_name.clone(),
        woid_count: row.woids.len(),
        has_void_team,
        is_complete,
        highlight,
        woids: row
            .woids
            .iter()
            .map(|woid| BoardWoidView {
                work_order_id: woid.work_order_id.clone(),
                status: classify_teams(&woid.teams),
                teams: woid
                    .teams
                    .iter()
                    .map(|team| team_view(team, completing_team_id))
                    .collect(),
            })
            .collect(),
        tickets: row.tickets.clone(),
    }
}

/// Builds the board for a project. Without a completing team no row is complete.
pub fn build_board(rows: &[AddressBoardRow], completing_team_id: Option<&str>) -> Vec<BoardRowView> {
    rows.iter()
        .map(|row| board_row(row, completing_team_id))
        .collect()
}
