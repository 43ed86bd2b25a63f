//! Record shapes returned by the backend query functions.
//!
//! These are read-only projections. Decoding is tolerant: optional fields may be
//! absent or `null`, list fields default to empty, and unknown fields are ignored.

pub mod history;
pub mod project;
pub mod search;

pub use history::{
    AddressHistorySnapshot, DailyReport, FileRecord, HistorySummary, ReportGroup, TeamAssignmentGroup,
    TeamRecord, Ticket, TicketUpdate, WoidAssignment,
};
pub use project::{AddressBoardRow, BackendUser, BoardTicket, BoardWoid, OrganizationMembership, Project, TaskForce};
pub use search::{AddressSearchResult, SearchTeam, SearchTicket, SearchWoid};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Backend timestamps are floating point milliseconds since the Unix epoch.
pub type Millis = f64;

/// Converts a backend timestamp into a UTC datetime.
///
/// Returns `None` for non-finite values or values outside chrono's range.
pub fn millis_to_utc(millis: Millis) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.floor() as i64)
}

/// Treats an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
