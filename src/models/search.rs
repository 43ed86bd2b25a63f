use super::{null_as_default, Millis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTeam {
    #[serde(default, deserialize_with = "null_as_default")]
    pub task_force_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Millis>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchWoid {
    pub woid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub teams: Vec<SearchTeam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTicket {
    pub ticket_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_date: Option<Millis>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub woids: Vec<String>,
}

/// Result of an address search within a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSearchResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub woids: Vec<SearchWoid>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tickets: Vec<SearchTicket>,
}

impl AddressSearchResult {
    pub fn is_empty(&self) -> bool {
        self.woids.is_empty() && self.tickets.is_empty()
    }

    /// Narrows the work orders to a single WOID, as the detail view does. Tickets are kept.
    pub fn retain_woid(&mut self, woid: &str) {
        self.woids.retain(|entry| entry.woid == woid);
    }
}
