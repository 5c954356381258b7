use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{col_dt, col_enum, col_opt_enum, col_uuid, fmt_dt};
use crate::db::DatabaseError;
use crate::models::User;

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, role, display_name, gender, birth_date, diagnosis, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id.to_string(),
            user.role.as_str(),
            user.display_name,
            user.gender.map(|g| g.as_str()),
            user.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
            user.diagnosis,
            fmt_dt(&user.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    conn.query_row(
        "SELECT id, role, display_name, gender, birth_date, diagnosis, created_at
         FROM users WHERE id = ?1",
        params![id.to_string()],
        row_to_user,
    )
    .optional()
    .map_err(DatabaseError::from)
}

fn row_to_user(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    let birth: Option<String> = row.get(4)?;
    Ok(User {
        id: col_uuid(row, 0)?,
        role: col_enum(row, 1)?,
        display_name: row.get(2)?,
        gender: col_opt_enum(row, 3)?,
        birth_date: birth.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        diagnosis: row.get(5)?,
        created_at: col_dt(row, 6)?,
    })
}
