use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{col_dt, col_enum, col_uuid, fmt_dt};
use crate::db::DatabaseError;
use crate::models::{AdherenceRecord, MedicationPlan};

pub fn insert_medication_plan(conn: &Connection, plan: &MedicationPlan) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medication_plans (id, patient_id, medication_name, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            plan.id.to_string(),
            plan.patient_id.to_string(),
            plan.medication_name,
            plan.active as i32,
            fmt_dt(&plan.created_at),
        ],
    )?;
    Ok(())
}

pub fn insert_adherence_record(conn: &Connection, record: &AdherenceRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO adherence_records (id, plan_id, scheduled_at, status)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            record.id.to_string(),
            record.plan_id.to_string(),
            fmt_dt(&record.scheduled_at),
            record.status.as_str(),
        ],
    )?;
    Ok(())
}

pub fn get_active_medication_plans(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<MedicationPlan>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, medication_name, active, created_at
         FROM medication_plans
         WHERE patient_id = ?1 AND active = 1
         ORDER BY created_at ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok(MedicationPlan {
            id: col_uuid(row, 0)?,
            patient_id: col_uuid(row, 1)?,
            medication_name: row.get(2)?,
            active: row.get::<_, i32>(3)? != 0,
            created_at: col_dt(row, 4)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Records of one plan scheduled in `[from, to]`, most recent first.
pub fn get_adherence_records(
    conn: &Connection,
    plan_id: &Uuid,
    from: &NaiveDateTime,
    to: &NaiveDateTime,
) -> Result<Vec<AdherenceRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, plan_id, scheduled_at, status
         FROM adherence_records
         WHERE plan_id = ?1 AND scheduled_at >= ?2 AND scheduled_at <= ?3
         ORDER BY scheduled_at DESC, id ASC",
    )?;
    let rows = stmt.query_map(params![plan_id.to_string(), fmt_dt(from), fmt_dt(to)], |row| {
        Ok(AdherenceRecord {
            id: col_uuid(row, 0)?,
            plan_id: col_uuid(row, 1)?,
            scheduled_at: col_dt(row, 2)?,
            status: col_enum(row, 3)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Doses marked taken across all of a patient's plans in `[from, to]`.
pub fn count_taken_doses(
    conn: &Connection,
    patient_id: &Uuid,
    from: &NaiveDateTime,
    to: &NaiveDateTime,
) -> Result<u32, DatabaseError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM adherence_records r
         JOIN medication_plans p ON p.id = r.plan_id
         WHERE p.patient_id = ?1 AND r.status = 'taken'
           AND r.scheduled_at >= ?2 AND r.scheduled_at <= ?3",
        params![patient_id.to_string(), fmt_dt(from), fmt_dt(to)],
        |row| row.get(0),
    )?;
    Ok(count)
}
