//! Pure scheduling core: TimeKit, WeightEngine, RecurrenceEngine, Planner,
//! WorkloadAnalyzer, CalendarExporter and the CoachAdapter contract.
//!
//! Nothing in this crate performs I/O. Callers (the storage crate's
//! `PersistenceProtocol`, the API handlers) load state, call into these
//! pure functions, and persist the results.

pub mod calendar_exporter;
pub mod coach_adapter;
pub mod errors;
pub mod planner;
pub mod recurrence_engine;
pub mod task_completion;
pub mod timekit;
pub mod weight_engine;
pub mod workload_analyzer;

pub use errors::SchedulerError;
