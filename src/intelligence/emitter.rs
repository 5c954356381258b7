//! Alert emitter: the only code path that creates alerts.

use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::config::Locale;
use crate::db::repository::{get_user, has_active_binding, insert_alert_unless_duplicate};
use crate::models::{Alert, AlertStatus};

use super::messages;
use super::types::{AlertCandidate, AnalysisError, EmitOutcome};

/// Renders candidates and stores them with storage-level dedup.
#[derive(Debug, Clone, Copy)]
pub struct AlertEmitter {
    locale: Locale,
}

impl AlertEmitter {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Create a pending alert for `candidate` unless a pending alert with
    /// the same (patient, type, rule, metric) was created within `dedup`
    /// of `now`.
    ///
    /// The patient must exist and hold the patient role. A clinician, when
    /// given, must have an active binding to the patient.
    pub fn emit(
        &self,
        conn: &Connection,
        patient_id: &Uuid,
        clinician_id: Option<&Uuid>,
        candidate: &AlertCandidate,
        dedup: Duration,
        now: &NaiveDateTime,
    ) -> Result<EmitOutcome, AnalysisError> {
        let patient = get_user(conn, patient_id)?.ok_or(AnalysisError::NotFound {
            entity: "Patient",
            id: *patient_id,
        })?;
        if !patient.is_patient() {
            return Err(AnalysisError::NotAPatient(*patient_id));
        }
        if let Some(clinician_id) = clinician_id {
            if !has_active_binding(conn, clinician_id, patient_id)? {
                return Err(AnalysisError::UnboundClinician {
                    clinician_id: *clinician_id,
                    patient_id: *patient_id,
                });
            }
        }

        let (title, message) = messages::render(self.locale, candidate.rule.as_str(), &candidate.vars);
        let alert = Alert {
            id: Uuid::new_v4(),
            patient_id: *patient_id,
            clinician_id: clinician_id.copied(),
            alert_type: candidate.rule.alert_type(),
            rule: candidate.rule,
            metric_type: candidate.metric_type,
            priority: candidate.priority,
            status: AlertStatus::Pending,
            title,
            message,
            measurement_id: candidate.measurement_id,
            created_at: *now,
            handled_by: None,
            handled_at: None,
            handling_notes: None,
            action_taken: None,
        };

        // A window reaching past the calendar range dedups against all history.
        let since = now.checked_sub_signed(dedup).unwrap_or(NaiveDateTime::MIN);
        if insert_alert_unless_duplicate(conn, &alert, &since)? {
            Ok(EmitOutcome::Created(alert))
        } else {
            tracing::debug!(
                patient_id = %patient_id,
                rule = %candidate.rule,
                "Pending alert inside dedup window, skipped"
            );
            Ok(EmitOutcome::Skipped)
        }
    }
}
