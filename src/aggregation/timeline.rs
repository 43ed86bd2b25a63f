use crate::models::{millis_to_utc, DailyReport, Millis, ReportGroup, Ticket, TicketUpdate};
use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};

/// Day key used for timestamps that cannot be placed on a calendar.
pub const INVALID_DAY: &str = "Invalid Date";

/// Which event kinds the activity timeline shows.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TimelineFilter {
    #[default]
    All,
    Reports,
    Tickets,
}

impl TimelineFilter {
    pub fn includes_reports(self) -> bool {
        matches!(self, TimelineFilter::All | TimelineFilter::Reports)
    }

    pub fn includes_tickets(self) -> bool {
        matches!(self, TimelineFilter::All | TimelineFilter::Tickets)
    }
}

/// One entry of the merged activity timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineEvent {
    Report {
        date: Millis,
        #[serde(rename = "workOrderId")]
        work_order_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        report: DailyReport,
    },
    TicketUpdate {
        date: Millis,
        #[serde(rename = "ticketId")]
        ticket_id: String,
        update: TicketUpdate,
    },
}

impl TimelineEvent {
    pub fn date(&self) -> Millis {
        match self {
            TimelineEvent::Report { date, .. } | TimelineEvent::TicketUpdate { date, .. } => *date,
        }
    }

    pub fn is_report(&self) -> bool {
        matches!(self, TimelineEvent::Report { .. })
    }
}

/// Events that happened on the same calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDay {
    /// Day label in the form `Tue Mar 05 2024`.
    pub day: String,
    pub date: Option<NaiveDate>,
    pub events: Vec<TimelineEvent>,
}

/// Flattens report groups and ticket updates into one timeline, newest first.
///
/// Ties keep no particular order.
pub fn build_timeline(
    report_groups: &[ReportGroup],
    tickets: &[Ticket],
    filter: TimelineFilter,
) -> Vec<TimelineEvent> {
    let mut events = Vec::new();

    if filter.includes_reports() {
        events.extend(report_groups.iter().flat_map(|group| {
            group.reports.iter().map(|report| TimelineEvent::Report {
                date: report.creation_time,
                work_order_id: group.work_order_id.clone(),
                note: report.note_text().map(str::to_string),
                report: report.clone(),
            })
        }));
    }

    if filter.includes_tickets() {
        events.extend(tickets.iter().flat_map(|ticket| {
            ticket.updates.iter().map(|update| TimelineEvent::TicketUpdate {
                date: update.creation_time,
                ticket_id: ticket.ticket_id.clone(),
                update: update.clone(),
            })
        }));
    }

    events.sort_unstable_by(|a, b| b.date().total_cmp(&a.date()));
    events
}

/// Calendar day label of a timestamp at the given UTC offset.
pub fn day_key(date: Millis, offset: FixedOffset) -> (String, Option<NaiveDate>) {
    match millis_to_utc(date) {
        Some(utc) => {
            let local = utc.with_timezone(&offset);
            (local.format("%a %b %d %Y").to_string(), Some(local.date_naive()))
        }
        None => (INVALID_DAY.to_string(), None),
    }
}

/// Buckets a sorted timeline by calendar day.
///
/// Buckets appear in the order their first event appears, and each bucket keeps
/// the relative order of its events.
pub fn bucket_by_day(events: Vec<TimelineEvent>, offset: FixedOffset) -> Vec<TimelineDay> {
    let mut days: Vec<TimelineDay> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for event in events {
        let (day, date) = day_key(event.date(), offset);
        match positions.get(&day) {
            Some(&index) => days[index].events.push(event),
            None => {
                positions.insert(day.clone(), days.len());
                days.push(TimelineDay {
                    day,
                    date,
                    events: vec![event],
                });
            }
        }
    }

    days
}
