use super::status::{classify_teams, WorkOrderStatus};
use crate::models::TeamRecord;
use serde::Serialize;

/// Completion counters across all work orders of an address.
///
/// `complete`, `void` and `in_progress` partition `total`. Work orders without
/// any team are counted as in progress and additionally reported in `not_started`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStats {
    pub total: usize,
    pub complete: usize,
    pub void: usize,
    pub in_progress: usize,
    pub not_started: usize,
    pub completion_percentage: u32,
}

/// `round(100 * complete / total)`, or 0 when there are no work orders.
pub fn completion_percentage(complete: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((complete as f64 / total as f64) * 100.0).round() as u32
}

pub fn completion_stats<'a, I>(teams_by_woid: I) -> CompletionStats
where
    I: IntoIterator<Item = &'a [TeamRecord]>,
{
    let mut stats = CompletionStats::default();
    for teams in teams_by_woid {
        stats.total += 1;
        match classify_teams(teams) {
            WorkOrderStatus::Void => stats.void += 1,
            WorkOrderStatus::Complete => stats.complete += 1,
            WorkOrderStatus::InProgress => stats.in_progress += 1,
            WorkOrderStatus::NotStarted => {
                stats.in_progress += 1;
                stats.not_started += 1;
            }
        }
    }
    stats.completion_percentage = completion_percentage(stats.complete, stats.total);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(status: Option<&str>) -> TeamRecord {
        TeamRecord {
            status: status.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn empty_address_is_zero_percent() {
        let stats = completion_stats(std::iter::empty());
        assert_eq!(stats, CompletionStats::default());
        assert_eq!(completion_percentage(0, 0), 0);
    }

    #[test]
    fn three_of_four_complete_is_seventy_five() {
        let complete = vec![team(Some("complete"))];
        let pending = vec![team(Some("complete")), team(Some("incomplete"))];
        let woids: Vec<&[TeamRecord]> = vec![
            complete.as_slice(),
            complete.as_slice(),
            complete.as_slice(),
            pending.as_slice(),
        ];

        let stats = completion_stats(woids);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.complete, 3);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.completion_percentage, 75);
    }

    #[test]
    fn void_and_empty_work_orders_are_counted_separately() {
        let voided = vec![team(Some("complete")), team(Some("void"))];
        let empty: Vec<TeamRecord> = Vec::new();
        let done = vec![team(Some("complete"))];
        let woids: Vec<&[TeamRecord]> = vec![voided.as_slice(), empty.as_slice(), done.as_slice()];

        let stats = completion_stats(woids);
        assert_eq!(stats.void, 1);
        assert_eq!(stats.complete, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.not_started, 1);
        assert_eq!(stats.completion_percentage, 33);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(completion_percentage(1, 8), 13);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(5, 5), 100);
    }
}
