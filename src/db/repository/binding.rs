use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{col_dt, col_enum, col_uuid, fmt_dt};
use crate::db::DatabaseError;
use crate::models::ClinicianBinding;

const BINDING_COLUMNS: &str = "id, clinician_id, patient_id, status, is_primary, created_at";

pub fn insert_binding(conn: &Connection, binding: &ClinicianBinding) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO clinician_patient_bindings (id, clinician_id, patient_id, status, is_primary, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            binding.id.to_string(),
            binding.clinician_id.to_string(),
            binding.patient_id.to_string(),
            binding.status.as_str(),
            binding.is_primary as i32,
            fmt_dt(&binding.created_at),
        ],
    )?;
    Ok(())
}

/// Active bindings of one clinician, oldest first.
pub fn get_active_bindings_for_clinician(
    conn: &Connection,
    clinician_id: &Uuid,
) -> Result<Vec<ClinicianBinding>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BINDING_COLUMNS} FROM clinician_patient_bindings
         WHERE clinician_id = ?1 AND status = 'active'
         ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![clinician_id.to_string()], row_to_binding)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// The single active binding flagged primary for a patient.
pub fn get_primary_binding(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<ClinicianBinding>, DatabaseError> {
    conn.query_row(
        &format!(
            "SELECT {BINDING_COLUMNS} FROM clinician_patient_bindings
             WHERE patient_id = ?1 AND status = 'active' AND is_primary = 1
             LIMIT 1"
        ),
        params![patient_id.to_string()],
        row_to_binding,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn has_active_binding(
    conn: &Connection,
    clinician_id: &Uuid,
    patient_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM clinician_patient_bindings
         WHERE clinician_id = ?1 AND patient_id = ?2 AND status = 'active'",
        params![clinician_id.to_string(), patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Clinicians with at least one active binding.
pub fn list_active_clinician_ids(conn: &Connection) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT clinician_id FROM clinician_patient_bindings
         WHERE status = 'active'
         ORDER BY clinician_id",
    )?;
    let rows = stmt.query_map([], |row| col_uuid(row, 0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

fn row_to_binding(row: &rusqlite::Row) -> Result<ClinicianBinding, rusqlite::Error> {
    Ok(ClinicianBinding {
        id: col_uuid(row, 0)?,
        clinician_id: col_uuid(row, 1)?,
        patient_id: col_uuid(row, 2)?,
        status: col_enum(row, 3)?,
        is_primary: row.get::<_, i32>(4)? != 0,
        created_at: col_dt(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::fixtures::*;
    use crate::models::{BindingStatus, UserRole};

    #[test]
    fn active_bindings_scoped_to_clinician() {
        let conn = open_memory_database().unwrap();
        let (clinician, patient) = care_pair(&conn);
        let other = add_user(&conn, UserRole::Clinician);
        let other_patient = add_user(&conn, UserRole::Patient);
        bind(&conn, other, other_patient, true);

        let bindings = get_active_bindings_for_clinician(&conn, &clinician).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].patient_id, patient);
        assert!(bindings[0].is_primary);
    }

    #[test]
    fn inactive_binding_excluded() {
        let conn = open_memory_database().unwrap();
        let clinician = add_user(&conn, UserRole::Clinician);
        let patient = add_user(&conn, UserRole::Patient);
        insert_binding(
            &conn,
            &ClinicianBinding {
                id: Uuid::new_v4(),
                clinician_id: clinician,
                patient_id: patient,
                status: BindingStatus::Transferred,
                is_primary: true,
                created_at: ts("2026-01-01 00:00:00"),
            },
        )
        .unwrap();

        assert!(get_active_bindings_for_clinician(&conn, &clinician).unwrap().is_empty());
        assert!(get_primary_binding(&conn, &patient).unwrap().is_none());
        assert!(!has_active_binding(&conn, &clinician, &patient).unwrap());
        assert!(list_active_clinician_ids(&conn).unwrap().is_empty());
    }

    #[test]
    fn only_one_primary_per_patient() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = care_pair(&conn);
        let second = add_user(&conn, UserRole::Clinician);
        let result = insert_binding(
            &conn,
            &ClinicianBinding {
                id: Uuid::new_v4(),
                clinician_id: second,
                patient_id: patient,
                status: BindingStatus::Active,
                is_primary: true,
                created_at: ts("2026-01-02 00:00:00"),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn primary_binding_found() {
        let conn = open_memory_database().unwrap();
        let (clinician, patient) = care_pair(&conn);
        let primary = get_primary_binding(&conn, &patient).unwrap().unwrap();
        assert_eq!(primary.clinician_id, clinician);
        assert_eq!(list_active_clinician_ids(&conn).unwrap(), vec![clinician]);
    }
}
