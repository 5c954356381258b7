//! Health alert analysis engine.
//!
//! Pure rule functions (`classify`, `adherence`, `activity`, `correlation`)
//! work on pre-fetched windows. `engine` and `immediate` load the windows,
//! run the rules fail-isolated per check, and hand candidates to the
//! `emitter`, which deduplicates at the storage layer.

pub mod activity;
pub mod adherence;
pub mod classify;
pub mod correlation;
pub mod emitter;
pub mod engine;
pub mod helpers;
pub mod immediate;
pub mod messages;
pub mod thresholds;
pub mod trend;
pub mod types;

pub use adherence::{AdherenceProvider, NoopAdherenceProvider, SqliteAdherenceProvider};
pub use emitter::AlertEmitter;
pub use engine::{run_batch, run_batch_at, HealthAnalysisEngine};
pub use immediate::{analyze_measurement, spawn_immediate_analysis};
pub use types::*;
