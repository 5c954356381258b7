use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{col_dt, col_enum, col_opt_uuid, col_uuid, fmt_dt};
use crate::db::DatabaseError;
use crate::models::{Measurement, MetricType};

const MEASUREMENT_COLUMNS: &str = "id, patient_id, metric_type, systolic, diastolic, glucose, heart_rate, weight,
     uric_acid, total_cholesterol, triglycerides, hdl, ldl, measured_at, recorded_by, modified_by,
     note, created_at";

/// Insert a measurement. Validation is the caller's job.
pub fn insert_measurement(conn: &Connection, m: &Measurement) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO measurements ({MEASUREMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
        ),
        params![
            m.id.to_string(),
            m.patient_id.to_string(),
            m.metric_type.as_str(),
            m.systolic,
            m.diastolic,
            m.glucose,
            m.heart_rate,
            m.weight,
            m.uric_acid,
            m.total_cholesterol,
            m.triglycerides,
            m.hdl,
            m.ldl,
            fmt_dt(&m.measured_at),
            m.recorded_by.to_string(),
            m.modified_by.map(|id| id.to_string()),
            m.note,
            fmt_dt(&m.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_measurement(conn: &Connection, id: &Uuid) -> Result<Option<Measurement>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {MEASUREMENT_COLUMNS} FROM measurements WHERE id = ?1"),
        params![id.to_string()],
        row_to_measurement,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Measurements of one type in `[from, to]`, ordered by measured_at ascending.
pub fn get_measurements_in_window(
    conn: &Connection,
    patient_id: &Uuid,
    metric_type: MetricType,
    from: &NaiveDateTime,
    to: &NaiveDateTime,
) -> Result<Vec<Measurement>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEASUREMENT_COLUMNS} FROM measurements
         WHERE patient_id = ?1 AND metric_type = ?2 AND measured_at >= ?3 AND measured_at <= ?4
         ORDER BY measured_at ASC, created_at ASC"
    ))?;
    let rows = stmt.query_map(
        params![
            patient_id.to_string(),
            metric_type.as_str(),
            fmt_dt(from),
            fmt_dt(to)
        ],
        row_to_measurement,
    )?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Most recent measurement of one type in `[from, to]`.
pub fn get_latest_measurement(
    conn: &Connection,
    patient_id: &Uuid,
    metric_type: MetricType,
    from: &NaiveDateTime,
    to: &NaiveDateTime,
) -> Result<Option<Measurement>, DatabaseError> {
    conn.query_row(
        &format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM measurements
             WHERE patient_id = ?1 AND metric_type = ?2 AND measured_at >= ?3 AND measured_at <= ?4
             ORDER BY measured_at DESC, created_at DESC
             LIMIT 1"
        ),
        params![
            patient_id.to_string(),
            metric_type.as_str(),
            fmt_dt(from),
            fmt_dt(to)
        ],
        row_to_measurement,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Count of measurements of any type in `[from, to]`.
pub fn count_measurements_in_window(
    conn: &Connection,
    patient_id: &Uuid,
    from: &NaiveDateTime,
    to: &NaiveDateTime,
) -> Result<u32, DatabaseError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM measurements
         WHERE patient_id = ?1 AND measured_at >= ?2 AND measured_at <= ?3",
        params![patient_id.to_string(), fmt_dt(from), fmt_dt(to)],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn row_to_measurement(row: &rusqlite::Row) -> Result<Measurement, rusqlite::Error> {
    Ok(Measurement {
        id: col_uuid(row, 0)?,
        patient_id: col_uuid(row, 1)?,
        metric_type: col_enum(row, 2)?,
        systolic: row.get(3)?,
        diastolic: row.get(4)?,
        glucose: row.get(5)?,
        heart_rate: row.get(6)?,
        weight: row.get(7)?,
        uric_acid: row.get(8)?,
        total_cholesterol: row.get(9)?,
        triglycerides: row.get(10)?,
        hdl: row.get(11)?,
        ldl: row.get(12)?,
        measured_at: col_dt(row, 13)?,
        recorded_by: col_uuid(row, 14)?,
        modified_by: col_opt_uuid(row, 15)?,
        note: row.get(16)?,
        created_at: col_dt(row, 17)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::fixtures::*;

    #[test]
    fn window_is_ordered_and_typed() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = care_pair(&conn);
        bp(&conn, patient, ts("2026-03-03 08:00:00"), 150.0, 95.0);
        bp(&conn, patient, ts("2026-03-01 08:00:00"), 145.0, 92.0);
        single(&conn, patient, MetricType::Glucose, ts("2026-03-02 08:00:00"), 6.0);

        let window = get_measurements_in_window(
            &conn,
            &patient,
            MetricType::BloodPressure,
            &ts("2026-03-01 00:00:00"),
            &ts("2026-03-04 00:00:00"),
        )
        .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].systolic, Some(145.0));
        assert_eq!(window[1].systolic, Some(150.0));
        assert!(window.iter().all(|m| m.glucose.is_none()));
    }

    #[test]
    fn window_bounds_exclude_older_readings() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = care_pair(&conn);
        bp(&conn, patient, ts("2026-02-20 08:00:00"), 150.0, 95.0);
        let window = get_measurements_in_window(
            &conn,
            &patient,
            MetricType::BloodPressure,
            &ts("2026-03-01 00:00:00"),
            &ts("2026-03-04 00:00:00"),
        )
        .unwrap();
        assert!(window.is_empty());
    }

    #[test]
    fn latest_measurement_and_count() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = care_pair(&conn);
        single(&conn, patient, MetricType::HeartRate, ts("2026-03-01 08:00:00"), 70.0);
        let newest = single(&conn, patient, MetricType::HeartRate, ts("2026-03-01 20:00:00"), 75.0);
        single(&conn, patient, MetricType::Weight, ts("2026-03-01 21:00:00"), 70.0);

        let latest = get_latest_measurement(
            &conn,
            &patient,
            MetricType::HeartRate,
            &ts("2026-03-01 00:00:00"),
            &ts("2026-03-02 00:00:00"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(latest.id, newest.id);

        let count = count_measurements_in_window(
            &conn,
            &patient,
            &ts("2026-03-01 00:00:00"),
            &ts("2026-03-02 00:00:00"),
        )
        .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn get_measurement_round_trip() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = care_pair(&conn);
        let mut m = Measurement::new(patient, MetricType::HeartRate, ts("2026-03-01 08:00:00"));
        m.heart_rate = Some(104.0);
        m.note = Some("after a walk".into());
        insert_measurement(&conn, &m).unwrap();

        let loaded = get_measurement(&conn, &m.id).unwrap().unwrap();
        assert_eq!(loaded.heart_rate, Some(104.0));
        assert_eq!(loaded.note.as_deref(), Some("after a walk"));
        assert_eq!(loaded.recorded_by, patient);
    }
}
