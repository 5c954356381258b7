//! HTTP API: measurement ingestion, clinician alert management and
//! on-demand analysis.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_api_server, ApiServer};
