//! Timetable generation, repair and quality metrics.
//!
//! # Algorithm
//!
//! `ScheduleGenerator` places lessons greedily: classes in input order,
//! mappings by priority, cells by a soft-preference penalty with a seeded
//! random tie-break. A cell is only accepted when the conflict detector
//! reports nothing blocking, so a fresh timetable is conflict-free up to
//! what the inputs force.
//!
//! `ScheduleOptimizer` repairs timetables that arrive with blocking
//! conflicts (hand edits, imported records) by moving or clearing lessons.
//!
//! # KPI
//!
//! `GenerationStatistics` reports fill and coverage figures; `QualityScores`
//! combines quota satisfaction, daily balance and gap compactness.
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"

mod cancel;
mod generator;
mod kpi;
mod optimizer;

pub use cancel::CancellationToken;
pub use generator::{GenerationOutcome, ScheduleGenerator};
pub use kpi::{GenerationStatistics, QualityScores};
pub use optimizer::{
    strategy_for, sync_mappings, BalanceDailyLoad, ImprovementStrategy, IterationRecord,
    MaximizeTeacherPreferences, MinimizeGaps, OptimizationReport, OptimizerConfig,
    ScheduleOptimizer, StopReason,
};
