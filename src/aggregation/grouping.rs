use crate::models::{
    AddressHistorySnapshot, DailyReport, FileRecord, ReportGroup, TeamAssignmentGroup, TeamRecord,
    WoidAssignment,
};
use std::collections::HashMap;

/// A WOID-keyed mapping that remembers the order keys were first seen.
///
/// Re-inserting a key replaces its value but keeps its original position.
#[derive(Debug, Clone)]
pub struct WoidMap<'a, V> {
    keys: Vec<&'a str>,
    values: HashMap<&'a str, V>,
}

impl<'a, V> Default for WoidMap<'a, V> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            values: HashMap::new(),
        }
    }
}

impl<'a, V> WoidMap<'a, V> {
    pub fn insert(&mut self, woid: &'a str, value: V) {
        if self.values.insert(woid, value).is_none() {
            self.keys.push(woid);
        }
    }

    fn get_or_insert_with(&mut self, woid: &'a str, make: impl FnOnce() -> V) -> &mut V {
        if !self.values.contains_key(woid) {
            self.keys.push(woid);
        }
        self.values.entry(woid).or_insert_with(make)
    }

    pub fn get(&self, woid: &str) -> Option<&V> {
        self.values.get(woid)
    }

    pub fn contains(&self, woid: &str) -> bool {
        self.values.contains_key(woid)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.keys.iter().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &V)> + '_ {
        self.keys
            .iter()
            .filter_map(|woid| self.values.get(woid).map(|value| (*woid, value)))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Maps every WOID to its team records.
///
/// Each assigned WOID starts with no teams; team groups then replace the entry
/// for their WOID, so when a WOID appears twice the last group wins.
pub fn index_teams<'a>(
    assignments: &'a [WoidAssignment],
    groups: &'a [TeamAssignmentGroup],
) -> WoidMap<'a, &'a [TeamRecord]> {
    let mut teams: WoidMap<'a, &'a [TeamRecord]> = WoidMap::default();
    for assignment in assignments {
        if !teams.contains(&assignment.work_order_id) {
            teams.insert(assignment.work_order_id.as_str(), &[]);
        }
    }
    for group in groups {
        teams.insert(group.work_order_id.as_str(), group.teams.as_slice());
    }
    teams
}

/// Maps each WOID to its reports; the last group for a WOID wins.
pub fn index_reports(groups: &[ReportGroup]) -> WoidMap<'_, &[DailyReport]> {
    let mut reports = WoidMap::default();
    for group in groups {
        reports.insert(group.work_order_id.as_str(), group.reports.as_slice());
    }
    reports
}

/// Maps each WOID to the files attached to it. Files without a WOID are skipped.
pub fn index_files(files: &[FileRecord]) -> WoidMap<'_, Vec<&FileRecord>> {
    let mut by_woid: WoidMap<'_, Vec<&FileRecord>> = WoidMap::default();
    for file in files {
        if let Some(woid) = file.woid() {
            by_woid.get_or_insert_with(woid, Vec::new).push(file);
        }
    }
    by_woid
}

/// The three per-WOID indexes of one address snapshot.
#[derive(Debug, Clone)]
pub struct GroupedHistory<'a> {
    pub teams: WoidMap<'a, &'a [TeamRecord]>,
    pub reports: WoidMap<'a, &'a [DailyReport]>,
    pub files: WoidMap<'a, Vec<&'a FileRecord>>,
}

impl<'a> GroupedHistory<'a> {
    /// WOIDs known for the address, in first-seen order.
    pub fn woids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.teams.keys()
    }

    pub fn teams_for(&self, woid: &str) -> &'a [TeamRecord] {
        self.teams.get(woid).copied().unwrap_or(&[])
    }

    pub fn reports_for(&self, woid: &str) -> &'a [DailyReport] {
        self.reports.get(woid).copied().unwrap_or(&[])
    }

    pub fn files_for(&self, woid: &str) -> &[&'a FileRecord] {
        self.files.get(woid).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub fn group_snapshot(snapshot: &AddressHistorySnapshot) -> GroupedHistory<'_> {
    GroupedHistory {
        teams: index_teams(&snapshot.woid_assignments, &snapshot.task_force_assignments),
        reports: index_reports(&snapshot.daily_reports),
        files: index_files(&snapshot.files),
    }
}
