//! Repository layer: entity-scoped database operations.
//!
//! Free functions over `&Connection`, one sub-module per table group.
//! All public functions are re-exported here.

mod alert;
mod binding;
mod measurement;
mod medication;
mod threshold;
mod user;

use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use uuid::Uuid;

use super::{DatabaseError, DATETIME_FMT};

pub use alert::*;
pub use binding::*;
pub use measurement::*;
pub use medication::*;
pub use threshold::*;
pub use user::*;

pub(crate) fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

pub(crate) fn col_uuid(row: &rusqlite::Row, idx: usize) -> Result<Uuid, rusqlite::Error> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn col_opt_uuid(row: &rusqlite::Row, idx: usize) -> Result<Option<Uuid>, rusqlite::Error> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn col_dt(row: &rusqlite::Row, idx: usize) -> Result<NaiveDateTime, rusqlite::Error> {
    let s: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&s, DATETIME_FMT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn col_opt_dt(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<Option<NaiveDateTime>, rusqlite::Error> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| NaiveDateTime::parse_from_str(&s, DATETIME_FMT).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn col_enum<T>(row: &rusqlite::Row, idx: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr<Err = DatabaseError>,
{
    let s: String = row.get(idx)?;
    T::from_str(&s).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn col_opt_enum<T>(row: &rusqlite::Row, idx: usize) -> Result<Option<T>, rusqlite::Error>
where
    T: FromStr<Err = DatabaseError>,
{
    let s: Option<String> = row.get(idx)?;
    s.map(|s| T::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}
