// Backend access
pub mod backend;

// Identity and organization gating
pub mod access;

// Read models for projects and addresses
pub mod address_history;

// WOID assignment imports
pub mod upload;

pub use access::{AccessService, AuthenticatedUser};
pub use address_history::AddressHistoryService;
pub use backend::{BackendClient, HttpBackendClient};
pub use upload::UploadService;
