pub mod repository;
pub mod sqlite;

pub use repository::*;
pub use sqlite::*;

use thiserror::Error;

/// Storage timestamp format. All `TEXT` datetime columns use it so that
/// lexical comparison in SQL matches chronological order.
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}

impl DatabaseError {
    pub fn not_found(entity_type: &str, id: impl ToString) -> Self {
        DatabaseError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }
}
