//! gridsim-metrics — outcome metrics for simulation runs.
//!
//! Derives comparison metrics from the completed-task set and renders
//! before/after reports.
//!
//! # Architecture
//!
//! ```text
//! MetricsCollector
//!   ├── record_completed() ← called with each tick's released tasks
//!   ├── record_tick()      ← per-tick utilization sample
//!   └── snapshot()         → MetricsSnapshot (read-only, any time)
//!
//! ComparisonReport
//!   └── format_report()    → text table for terminals
//! ```

pub mod collector;
pub mod report;

pub use collector::{MetricsCollector, MetricsSnapshot, avg_weighted_turnaround, makespan};
pub use report::{
    ComparisonReport, Improvements, RunStatus, RunSummary, best_episode, format_episodes, format_report,
    format_summary, improvement_pct,
};
