use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Alert, AlertPriority, AlertRule, FieldError, MetricType};

// ---------------------------------------------------------------------------
// AnalysisError
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("User {0} is not a patient")]
    NotAPatient(Uuid),

    #[error("Clinician {clinician_id} has no active binding to patient {patient_id}")]
    UnboundClinician { clinician_id: Uuid, patient_id: Uuid },

    #[error("Computation failed: {0}")]
    Computation(String),

    #[error("Analysis of patient {patient_id} exceeded {after_secs}s")]
    Timeout { patient_id: Uuid, after_secs: u64 },

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<FieldError> for AnalysisError {
    fn from(e: FieldError) -> Self {
        AnalysisError::Computation(e.to_string())
    }
}

impl From<tokio::task::JoinError> for AnalysisError {
    fn from(e: tokio::task::JoinError) -> Self {
        AnalysisError::Task(e.to_string())
    }
}

impl AnalysisError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AnalysisError::Database(DatabaseError::NotFound { .. }) => FailureKind::NotFound,
            AnalysisError::Database(_) => FailureKind::Database,
            AnalysisError::NotFound { .. } => FailureKind::NotFound,
            AnalysisError::NotAPatient(_) | AnalysisError::UnboundClinician { .. } => {
                FailureKind::Invariant
            }
            AnalysisError::Computation(_) => FailureKind::Computation,
            AnalysisError::Timeout { .. } => FailureKind::Timeout,
            AnalysisError::Task(_) => FailureKind::Task,
        }
    }
}

// ---------------------------------------------------------------------------
// CheckFailure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Invariant,
    Computation,
    Database,
    Timeout,
    Task,
}

/// A caught failure of one check for one patient. Recorded in the run
/// report instead of aborting the run.
#[derive(Debug, Clone, Serialize)]
pub struct CheckFailure {
    pub patient_id: Uuid,
    pub check: String,
    pub kind: FailureKind,
    pub detail: String,
}

impl CheckFailure {
    pub fn from_error(patient_id: Uuid, check: &str, err: &AnalysisError) -> Self {
        let failure = Self {
            patient_id,
            check: check.to_string(),
            kind: err.kind(),
            detail: err.to_string(),
        };
        tracing::warn!(
            patient_id = %patient_id,
            check,
            kind = ?failure.kind,
            detail = %failure.detail,
            "Analysis check failed"
        );
        failure
    }
}

// ---------------------------------------------------------------------------
// AlertCandidate
// ---------------------------------------------------------------------------

/// An alert a rule wants to raise, before dedup and rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCandidate {
    pub rule: AlertRule,
    pub priority: AlertPriority,
    pub metric_type: Option<MetricType>,
    pub measurement_id: Option<Uuid>,
    /// Template variables for the localized title and message.
    pub vars: Vec<(&'static str, String)>,
}

impl AlertCandidate {
    pub fn new(rule: AlertRule, priority: AlertPriority) -> Self {
        Self {
            rule,
            priority,
            metric_type: None,
            measurement_id: None,
            vars: Vec::new(),
        }
    }

    pub fn for_metric(mut self, metric_type: MetricType) -> Self {
        self.metric_type = Some(metric_type);
        self
    }

    pub fn with_measurement(mut self, id: Uuid) -> Self {
        self.measurement_id = Some(id);
        self
    }

    pub fn var(mut self, name: &'static str, value: impl ToString) -> Self {
        self.vars.push((name, value.to_string()));
        self
    }
}

/// Result of one emission attempt.
#[derive(Debug, Clone)]
pub enum EmitOutcome {
    Created(Alert),
    /// A pending alert with the same key exists inside the dedup window.
    Skipped,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct PatientReport {
    pub generated: Vec<Alert>,
    pub deduplicated: usize,
    pub failures: Vec<CheckFailure>,
}

impl PatientReport {
    pub(crate) fn record(&mut self, outcome: EmitOutcome) {
        match outcome {
            EmitOutcome::Created(alert) => self.generated.push(alert),
            EmitOutcome::Skipped => self.deduplicated += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub clinician_id: Uuid,
    pub patients_analyzed: usize,
    pub patients_skipped: usize,
    pub generated: Vec<Alert>,
    pub deduplicated: usize,
    pub failures: Vec<CheckFailure>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn generated_count(&self) -> usize {
        self.generated.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImmediateReport {
    pub measurement_id: Uuid,
    /// Set when analysis did not run, e.g. no primary clinician.
    pub skipped_reason: Option<&'static str>,
    #[serde(flatten)]
    pub outcome: PatientReport,
}
