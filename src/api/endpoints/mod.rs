//! API endpoint handlers.
//!
//! Handlers open one connection per request through `CoreState` and keep
//! the analysis logic in `intelligence`.

pub mod alerts;
pub mod analysis;
pub mod health;
pub mod measurements;

use rusqlite::Connection;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::db::repository::get_user;
use crate::models::{User, UserRole};

/// Load a user and require the given role. Unknown ids and role mismatches
/// both read as not found.
pub(crate) fn require_role(conn: &Connection, id: &Uuid, role: UserRole) -> Result<User, ApiError> {
    match get_user(conn, id)? {
        Some(user) if user.role == role => Ok(user),
        _ => {
            let entity = match role {
                UserRole::Patient => "Patient",
                UserRole::Clinician => "Clinician",
            };
            Err(ApiError::NotFound(format!("{entity} {id} not found")))
        }
    }
}
