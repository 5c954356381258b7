use chrono::{Duration, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

use super::{col_dt, col_enum, col_opt_dt, col_opt_enum, col_opt_uuid, col_uuid, fmt_dt};
use crate::db::DatabaseError;
use crate::models::{Alert, AlertFilter, AlertHandling, AlertStats, AlertStatus};

const ALERT_COLUMNS: &str = "id, patient_id, clinician_id, alert_type, rule, metric_type, priority, status, title,
     message, measurement_id, created_at, handled_by, handled_at, handling_notes, action_taken";

/// Insert `alert` unless a pending alert with the same patient, type, rule
/// and metric was created at or after `dedup_since`.
///
/// The existence check and the insert are one statement, so two concurrent
/// emitters cannot both pass the check. Returns `false` when suppressed.
pub fn insert_alert_unless_duplicate(
    conn: &Connection,
    alert: &Alert,
    dedup_since: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        &format!(
            "INSERT INTO alerts ({ALERT_COLUMNS})
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16
             WHERE NOT EXISTS (
                 SELECT 1 FROM alerts
                 WHERE patient_id = ?2 AND alert_type = ?4 AND rule = ?5 AND metric_type IS ?6
                   AND status = 'pending' AND created_at >= ?17
             )"
        ),
        params![
            alert.id.to_string(),
            alert.patient_id.to_string(),
            alert.clinician_id.map(|id| id.to_string()),
            alert.alert_type.as_str(),
            alert.rule.as_str(),
            alert.metric_type.map(|m| m.as_str()),
            alert.priority.as_str(),
            alert.status.as_str(),
            alert.title,
            alert.message,
            alert.measurement_id.map(|id| id.to_string()),
            fmt_dt(&alert.created_at),
            alert.handled_by.map(|id| id.to_string()),
            alert.handled_at.as_ref().map(fmt_dt),
            alert.handling_notes,
            alert.action_taken,
            fmt_dt(dedup_since),
        ],
    )?;
    Ok(affected > 0)
}

pub fn get_alert(conn: &Connection, id: &Uuid) -> Result<Option<Alert>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"),
        params![id.to_string()],
        row_to_alert,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Alerts assigned to a clinician, newest first.
pub fn list_alerts_for_clinician(
    conn: &Connection,
    clinician_id: &Uuid,
    filter: &AlertFilter,
    now: &NaiveDateTime,
) -> Result<Vec<Alert>, DatabaseError> {
    let mut sql = format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE clinician_id = ?1");
    let mut values: Vec<Value> = vec![Value::Text(clinician_id.to_string())];

    let mut push = |clause: &str, value: Value, sql: &mut String| {
        values.push(value);
        sql.push_str(&format!(" AND {clause} ?{}", values.len()));
    };
    if let Some(patient_id) = filter.patient_id {
        push("patient_id =", Value::Text(patient_id.to_string()), &mut sql);
    }
    if let Some(priority) = filter.priority {
        push("priority =", Value::Text(priority.as_str().into()), &mut sql);
    }
    if let Some(alert_type) = filter.alert_type {
        push("alert_type =", Value::Text(alert_type.as_str().into()), &mut sql);
    }
    if let Some(status) = filter.status {
        push("status =", Value::Text(status.as_str().into()), &mut sql);
    }
    // A day window reaching past the calendar range does not narrow the list.
    if let Some(since) = filter
        .days
        .and_then(|days| Duration::try_days(i64::from(days)))
        .and_then(|span| now.checked_sub_signed(span))
    {
        push("created_at >=", Value::Text(fmt_dt(&since)), &mut sql);
    }
    sql.push_str(" ORDER BY created_at DESC, id ASC");
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), row_to_alert)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Counts by status, priority and type for a clinician's alerts.
pub fn get_alert_stats(conn: &Connection, clinician_id: &Uuid) -> Result<AlertStats, DatabaseError> {
    let mut stats = AlertStats::default();
    for (column, bucket) in [
        ("status", &mut stats.by_status),
        ("priority", &mut stats.by_priority),
        ("alert_type", &mut stats.by_type),
    ] {
        let mut stmt = conn.prepare(&format!(
            "SELECT {column}, COUNT(*) FROM alerts WHERE clinician_id = ?1 GROUP BY {column}"
        ))?;
        let rows = stmt.query_map(params![clinician_id.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (key, count) = row?;
            bucket.insert(key, count.max(0) as u64);
        }
    }
    stats.total = stats.by_status.values().sum();
    Ok(stats)
}

/// Move a pending alert to a terminal status. The update only applies
/// while the alert is still pending and assigned to `clinician_id`;
/// returns `false` otherwise.
pub fn update_alert_handling(
    conn: &Connection,
    alert_id: &Uuid,
    clinician_id: &Uuid,
    handling: &AlertHandling,
    handled_at: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    if !handling.status.is_terminal() {
        return Err(DatabaseError::ConstraintViolation(format!(
            "alert cannot be moved to {}",
            handling.status
        )));
    }
    let affected = conn.execute(
        "UPDATE alerts SET status = ?1, handled_by = ?2, handled_at = ?3,
             handling_notes = ?4, action_taken = ?5
         WHERE id = ?6 AND clinician_id = ?2 AND status = ?7",
        params![
            handling.status.as_str(),
            clinician_id.to_string(),
            fmt_dt(handled_at),
            handling.notes,
            handling.action_taken,
            alert_id.to_string(),
            AlertStatus::Pending.as_str(),
        ],
    )?;
    Ok(affected > 0)
}

fn row_to_alert(row: &rusqlite::Row) -> Result<Alert, rusqlite::Error> {
    Ok(Alert {
        id: col_uuid(row, 0)?,
        patient_id: col_uuid(row, 1)?,
        clinician_id: col_opt_uuid(row, 2)?,
        alert_type: col_enum(row, 3)?,
        rule: col_enum(row, 4)?,
        metric_type: col_opt_enum(row, 5)?,
        priority: col_enum(row, 6)?,
        status: col_enum(row, 7)?,
        title: row.get(8)?,
        message: row.get(9)?,
        measurement_id: col_opt_uuid(row, 10)?,
        created_at: col_dt(row, 11)?,
        handled_by: col_opt_uuid(row, 12)?,
        handled_at: col_opt_dt(row, 13)?,
        handling_notes: row.get(14)?,
        action_taken: row.get(15)?,
    })
}
