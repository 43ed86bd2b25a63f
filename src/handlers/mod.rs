pub mod address_history;
pub mod projects;
pub mod uploads;
pub mod users;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::services::{AccessService, AddressHistoryService, BackendClient, UploadService};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub access: Arc<AccessService>,
    pub address_history: Arc<AddressHistoryService>,
    pub upload: Arc<UploadService>,
}

impl AppServices {
    pub fn new(backend: Arc<dyn BackendClient>, config: &AppConfig) -> Self {
        Self {
            access: Arc::new(AccessService::from_config(backend.clone(), config)),
            address_history: Arc::new(AddressHistoryService::new(backend.clone())),
            upload: Arc::new(UploadService::new(backend)),
        }
    }
}

/// Treats a missing query parameter like a blank one so services report it uniformly.
pub(crate) fn param(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

pub(crate) fn parse_filter(
    raw: Option<&str>,
) -> Result<crate::aggregation::TimelineFilter, ServiceError> {
    match raw.map(str::trim).filter(|f| !f.is_empty()) {
        None => Ok(Default::default()),
        Some(raw) => raw.parse().map_err(|_| {
            ServiceError::ValidationError(format!(
                "unknown timeline filter '{raw}', expected all, reports or tickets"
            ))
        }),
    }
}
