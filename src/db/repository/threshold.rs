use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{col_dt, col_enum, col_opt_enum, col_uuid, fmt_dt};
use crate::db::DatabaseError;
use crate::models::{MetricType, ThresholdSetting};

pub fn insert_threshold_setting(
    conn: &Connection,
    setting: &ThresholdSetting,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO threshold_settings (id, clinician_id, metric_type, gender, age_min, age_max,
             diagnosis, warning_min, warning_max, danger_min, danger_max, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            setting.id.to_string(),
            setting.clinician_id.to_string(),
            setting.metric_type.as_str(),
            setting.gender.map(|g| g.as_str()),
            setting.age_min,
            setting.age_max,
            setting.diagnosis,
            setting.warning_min,
            setting.warning_max,
            setting.danger_min,
            setting.danger_max,
            setting.active as i32,
            fmt_dt(&setting.created_at),
        ],
    )?;
    Ok(())
}

/// Active settings for one metric type created by any clinician with an
/// active binding to the patient. Restriction matching happens in the
/// resolver.
pub fn get_candidate_thresholds(
    conn: &Connection,
    patient_id: &Uuid,
    metric_type: MetricType,
) -> Result<Vec<ThresholdSetting>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.clinician_id, t.metric_type, t.gender, t.age_min, t.age_max, t.diagnosis,
                t.warning_min, t.warning_max, t.danger_min, t.danger_max, t.active, t.created_at
         FROM threshold_settings t
         WHERE t.metric_type = ?2 AND t.active = 1
           AND t.clinician_id IN (
               SELECT clinician_id FROM clinician_patient_bindings
               WHERE patient_id = ?1 AND status = 'active'
           )
         ORDER BY t.created_at DESC, t.id ASC",
    )?;
    let rows = stmt.query_map(
        params![patient_id.to_string(), metric_type.as_str()],
        row_to_threshold,
    )?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

fn row_to_threshold(row: &rusqlite::Row) -> Result<ThresholdSetting, rusqlite::Error> {
    Ok(ThresholdSetting {
        id: col_uuid(row, 0)?,
        clinician_id: col_uuid(row, 1)?,
        metric_type: col_enum(row, 2)?,
        gender: col_opt_enum(row, 3)?,
        age_min: row.get(4)?,
        age_max: row.get(5)?,
        diagnosis: row.get(6)?,
        warning_min: row.get(7)?,
        warning_max: row.get(8)?,
        danger_min: row.get(9)?,
        danger_max: row.get(10)?,
        active: row.get::<_, i32>(11)? != 0,
        created_at: col_dt(row, 12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::fixtures::*;
    use crate::models::UserRole;

    fn setting(clinician: Uuid, metric: MetricType, active: bool, created: &str) -> ThresholdSetting {
        ThresholdSetting {
            id: Uuid::new_v4(),
            clinician_id: clinician,
            metric_type: metric,
            gender: None,
            age_min: None,
            age_max: None,
            diagnosis: None,
            warning_min: None,
            warning_max: Some(135.0),
            danger_min: None,
            danger_max: Some(170.0),
            active,
            created_at: ts(created),
        }
    }

    #[test]
    fn candidates_limited_to_bound_clinicians() {
        let conn = open_memory_database().unwrap();
        let (clinician, patient) = care_pair(&conn);
        let stranger = add_user(&conn, UserRole::Clinician);

        insert_threshold_setting(&conn, &setting(clinician, MetricType::BloodPressure, true, "2026-01-02 00:00:00")).unwrap();
        insert_threshold_setting(&conn, &setting(stranger, MetricType::BloodPressure, true, "2026-01-03 00:00:00")).unwrap();
        insert_threshold_setting(&conn, &setting(clinician, MetricType::BloodPressure, false, "2026-01-04 00:00:00")).unwrap();
        insert_threshold_setting(&conn, &setting(clinician, MetricType::Glucose, true, "2026-01-05 00:00:00")).unwrap();

        let found = get_candidate_thresholds(&conn, &patient, MetricType::BloodPressure).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].clinician_id, clinician);
        assert_eq!(found[0].warning_max, Some(135.0));
    }

    #[test]
    fn candidates_newest_first() {
        let conn = open_memory_database().unwrap();
        let (clinician, patient) = care_pair(&conn);
        insert_threshold_setting(&conn, &setting(clinician, MetricType::HeartRate, true, "2026-01-02 00:00:00")).unwrap();
        insert_threshold_setting(&conn, &setting(clinician, MetricType::HeartRate, true, "2026-02-02 00:00:00")).unwrap();

        let found = get_candidate_thresholds(&conn, &patient, MetricType::HeartRate).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].created_at > found[1].created_at);
    }
}
