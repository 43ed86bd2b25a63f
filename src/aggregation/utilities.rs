use super::status::StatusTone;
use crate::models::{Millis, Ticket};
use serde::Serialize;
use std::collections::HashMap;

/// Latest known locate status from one utility company.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityStatus {
    pub company: String,
    pub status: String,
    pub updated_at: Millis,
    pub tone: StatusTone,
}

/// Clearance overview of a single ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketUtilities {
    pub ticket_id: String,
    pub update_count: usize,
    pub utilities: Vec<UtilityStatus>,
}

/// Reduces a ticket's updates to the latest status per utility company.
///
/// An update replaces the stored one only when it is strictly newer. Companies
/// are listed in the order they first appear.
pub fn latest_utility_statuses(ticket: &Ticket) -> TicketUtilities {
    let mut utilities: Vec<UtilityStatus> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for update in &ticket.updates {
        match positions.get(update.utility_company.as_str()) {
            Some(&index) => {
                let current = &mut utilities[index];
                if update.creation_time > current.updated_at {
                    current.status = update.status.clone();
                    current.updated_at = update.creation_time;
                    current.tone = StatusTone::for_utility_status(&update.status);
                }
            }
            None => {
                positions.insert(update.utility_company.as_str(), utilities.len());
                utilities.push(UtilityStatus {
                    company: update.utility_company.clone(),
                    status: update.status.clone(),
                    updated_at: update.creation_time,
                    tone: StatusTone::for_utility_status(&update.status),
                });
            }
        }
    }

    TicketUtilities {
        ticket_id: ticket.ticket_id.clone(),
        update_count: ticket.updates.len(),
        utilities,
    }
}

pub fn utilities_for_tickets(tickets: &[Ticket]) -> Vec<TicketUtilities> {
    tickets.iter().map(latest_utility_statuses).collect()
}
