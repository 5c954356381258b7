use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::config::AnalysisConfig;
use crate::core_state::CoreState;
use crate::db::repository::{
    count_measurements_in_window, get_active_bindings_for_clinician, get_latest_measurement,
    get_measurements_in_window, get_user,
};
use crate::models::{MetricType, User, UserRole};

use super::activity::{activity_alert, engagement};
use super::adherence::{adherence_alert, compute_plan_adherence, AdherenceProvider};
use super::classify::{
    classify_against_bounds, classify_blood_pressure_window, classify_glucose_window,
    classify_heart_rate_readings, classify_weight_trend,
};
use super::emitter::AlertEmitter;
use super::helpers::days_before;
use super::thresholds;
use super::types::{AlertCandidate, AnalysisError, BatchReport, CheckFailure, PatientReport};

/// Stateless analysis service. Holds configuration and collaborators only,
/// so a fresh instance is built for every run.
pub struct HealthAnalysisEngine {
    config: AnalysisConfig,
    adherence: Arc<dyn AdherenceProvider>,
    emitter: AlertEmitter,
}

impl HealthAnalysisEngine {
    pub fn new(config: AnalysisConfig, adherence: Arc<dyn AdherenceProvider>) -> Self {
        let emitter = AlertEmitter::new(config.locale);
        Self {
            config,
            adherence,
            emitter,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub(crate) fn emitter(&self) -> &AlertEmitter {
        &self.emitter
    }

    pub(crate) fn batch_dedup(&self) -> Duration {
        Duration::try_hours(self.config.batch_dedup_hours).unwrap_or(Duration::MAX)
    }

    pub(crate) fn threshold_dedup(&self) -> Duration {
        Duration::try_hours(self.config.threshold_dedup_hours).unwrap_or(Duration::MAX)
    }

    /// Run every batch check for one patient on behalf of `clinician_id`.
    ///
    /// Returns `None` when the patient does not exist or is not a patient.
    /// Each check is isolated: a failure is recorded in the report and the
    /// remaining checks still run.
    pub fn analyze_patient(
        &self,
        conn: &Connection,
        clinician_id: &Uuid,
        patient_id: &Uuid,
        now: &NaiveDateTime,
    ) -> Result<Option<PatientReport>, AnalysisError> {
        let Some(patient) = get_user(conn, patient_id)? else {
            return Ok(None);
        };
        if !patient.is_patient() {
            return Ok(None);
        }

        let mut report = PatientReport::default();
        let trend_from = days_before(now, self.config.trend_window_days)?;
        let window = |metric| get_measurements_in_window(conn, patient_id, metric, &trend_from, now);

        let batch = self.batch_dedup();
        self.run_check(conn, &mut report, &patient, clinician_id, "blood_pressure", batch, now, || {
            Ok(classify_blood_pressure_window(&window(MetricType::BloodPressure)?)?.into_iter().collect())
        });
        self.run_check(conn, &mut report, &patient, clinician_id, "glucose", batch, now, || {
            Ok(classify_glucose_window(&window(MetricType::Glucose)?)?.into_iter().collect())
        });
        self.run_check(conn, &mut report, &patient, clinician_id, "heart_rate", batch, now, || {
            Ok(classify_heart_rate_readings(&window(MetricType::HeartRate)?)?.into_iter().collect())
        });
        self.run_check(conn, &mut report, &patient, clinician_id, "weight", batch, now, || {
            Ok(classify_weight_trend(&window(MetricType::Weight)?)?.into_iter().collect())
        });

        for metric in MetricType::all() {
            let check = format!("threshold_{metric}");
            let dedup = self.threshold_dedup();
            self.run_check(conn, &mut report, &patient, clinician_id, &check, dedup, now, || {
                self.threshold_check(conn, &patient, *metric, &trend_from, now)
            });
        }

        self.run_check(conn, &mut report, &patient, clinician_id, "adherence", batch, now, || {
            self.adherence_check(conn, patient_id, now)
        });
        self.run_check(conn, &mut report, &patient, clinician_id, "activity", batch, now, || {
            self.activity_check(conn, patient_id, now)
        });

        Ok(Some(report))
    }

    /// Run one detection and emit what it finds. Any error, from detection
    /// or emission, becomes a `CheckFailure` in `report`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn run_check<F>(
        &self,
        conn: &Connection,
        report: &mut PatientReport,
        patient: &User,
        clinician_id: &Uuid,
        check: &str,
        dedup: Duration,
        now: &NaiveDateTime,
        detect: F,
    ) where
        F: FnOnce() -> Result<Vec<AlertCandidate>, AnalysisError>,
    {
        let result = detect().and_then(|candidates| {
            for candidate in &candidates {
                let outcome =
                    self.emitter
                        .emit(conn, &patient.id, Some(clinician_id), candidate, dedup, now)?;
                report.record(outcome);
            }
            Ok(())
        });
        if let Err(e) = result {
            report
                .failures
                .push(CheckFailure::from_error(patient.id, check, &e));
        }
    }

    /// Latest reading in the trend window against the resolved bounds.
    /// Metric types with no bound configured produce nothing.
    fn threshold_check(
        &self,
        conn: &Connection,
        patient: &User,
        metric: MetricType,
        from: &NaiveDateTime,
        now: &NaiveDateTime,
    ) -> Result<Vec<AlertCandidate>, AnalysisError> {
        let Some(resolved) = thresholds::resolve(conn, patient, metric, now.date())? else {
            return Ok(Vec::new());
        };
        let Some(latest) = get_latest_measurement(conn, &patient.id, metric, from, now)? else {
            return Ok(Vec::new());
        };
        Ok(classify_against_bounds(&latest, &resolved.bounds)?
            .into_iter()
            .collect())
    }

    fn adherence_check(
        &self,
        conn: &Connection,
        patient_id: &Uuid,
        now: &NaiveDateTime,
    ) -> Result<Vec<AlertCandidate>, AnalysisError> {
        let from = days_before(now, self.config.adherence_window_days)?;
        let mut stats = Vec::new();
        for plan in self.adherence.active_plans(conn, patient_id)? {
            let records = self.adherence.records(conn, &plan.id, &from, now)?;
            if let Some(s) = compute_plan_adherence(&plan, &records, now, self.config.adherence_lookback) {
                stats.push(s);
            }
        }
        Ok(adherence_alert(&stats).into_iter().collect())
    }

    fn activity_check(
        &self,
        conn: &Connection,
        patient_id: &Uuid,
        now: &NaiveDateTime,
    ) -> Result<Vec<AlertCandidate>, AnalysisError> {
        let days = u32::try_from(self.config.activity_window_days).unwrap_or(0);
        let from = days_before(now, i64::from(days))?;
        let measurements = count_measurements_in_window(conn, patient_id, &from, now)?;
        let taken = self.adherence.taken_doses(conn, patient_id, &from, now)?;
        let has_plan = !self.adherence.active_plans(conn, patient_id)?.is_empty();
        let e = engagement(measurements, taken, days, has_plan);
        Ok(activity_alert(&e, days).into_iter().collect())
    }
}

// ═══════════════════════════════════════════
// Batch orchestration
// ═══════════════════════════════════════════

/// Run the batch analysis for every patient actively bound to a clinician.
pub async fn run_batch(state: Arc<CoreState>, clinician_id: Uuid) -> Result<BatchReport, AnalysisError> {
    run_batch_at(state, clinician_id, chrono::Local::now().naive_local()).await
}

/// Batch run at a fixed instant.
///
/// An unknown clinician is an error. Per patient, analysis runs on the
/// blocking pool under the configured timeout; a timeout, panic or error
/// is recorded for that patient and iteration moves on.
pub async fn run_batch_at(
    state: Arc<CoreState>,
    clinician_id: Uuid,
    now: NaiveDateTime,
) -> Result<BatchReport, AnalysisError> {
    let started = Instant::now();

    let roster_state = state.clone();
    let bindings = tokio::task::spawn_blocking(move || -> Result<_, AnalysisError> {
        let conn = roster_state.open_db()?;
        match get_user(&conn, &clinician_id)? {
            Some(user) if user.role == UserRole::Clinician => {}
            _ => {
                return Err(AnalysisError::NotFound {
                    entity: "Clinician",
                    id: clinician_id,
                })
            }
        }
        Ok(get_active_bindings_for_clinician(&conn, &clinician_id)?)
    })
    .await??;

    let engine = Arc::new(state.engine());
    let timeout = engine.config().per_patient_timeout();
    let mut report = BatchReport {
        clinician_id,
        patients_analyzed: 0,
        patients_skipped: 0,
        generated: Vec::new(),
        deduplicated: 0,
        failures: Vec::new(),
        duration_ms: 0,
    };

    for binding in bindings {
        let patient_id = binding.patient_id;
        let task_state = state.clone();
        let task_engine = engine.clone();
        let task = tokio::task::spawn_blocking(move || -> Result<Option<PatientReport>, AnalysisError> {
            let conn = task_state.open_db()?;
            task_engine.analyze_patient(&conn, &clinician_id, &patient_id, &now)
        });

        let result = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(AnalysisError::from(join)),
            Err(_) => Err(AnalysisError::Timeout {
                patient_id,
                after_secs: timeout.as_secs(),
            }),
        };

        match result {
            Ok(Some(patient)) => {
                report.patients_analyzed += 1;
                report.generated.extend(patient.generated);
                report.deduplicated += patient.deduplicated;
                report.failures.extend(patient.failures);
            }
            Ok(None) => {
                tracing::debug!(patient_id = %patient_id, "Bound user is not a patient, skipped");
                report.patients_skipped += 1;
            }
            Err(e) => {
                report
                    .failures
                    .push(CheckFailure::from_error(patient_id, "patient", &e));
            }
        }
    }

    report.duration_ms = started.elapsed().as_millis() as u64;
    tracing::info!(
        clinician_id = %clinician_id,
        patients = report.patients_analyzed,
        generated = report.generated_count(),
        deduplicated = report.deduplicated,
        failures = report.failures.len(),
        duration_ms = report.duration_ms,
        "Batch analysis complete"
    );
    Ok(report)
}
