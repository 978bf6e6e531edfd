//! School timetabling for the U-Engine ecosystem.
//!
//! Assigns weekly lesson periods to teachers, classes and subjects while
//! honoring availability constraints, weekly-hour quotas and the
//! no-double-booking rule, then repairs whatever conflicts remain.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Teacher`, `ClassGroup`, `Subject`, `Day`,
//!   `Period`, `Level`, `TimeConstraint`, `SubjectTeacherMapping`,
//!   `Timetable`, `Schedule`
//! - **`mapping`**: Five-tier teacher selection per (class, subject)
//! - **`tracker`**: Weekly-hour quota counters
//! - **`conflict`**: Pure conflict detector, 11 categories
//! - **`scheduler`**: Seeded greedy generator, conflict-repair optimizer,
//!   quality metrics
//! - **`validation`**: Input, mapping and pre-commit schedule checks
//! - **`pipeline`**: End-to-end run and commit
//! - **`store`**: Persistence seam
//! - **`config`**, **`events`**, **`error`**, **`logging`**: Ambient stack
//!
//! # Architecture
//!
//! ```text
//! MappingBuilder → HourTracker → ScheduleGenerator → ScheduleOptimizer → Validator → ScheduleStore
//! ```
//!
//! Every stage is synchronous and owns its data; randomness comes only from
//! the configured seed.
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - de Werra (1985), "An introduction to timetabling"

pub mod config;
pub mod conflict;
pub mod error;
pub mod events;
pub mod logging;
pub mod mapping;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod tracker;
pub mod validation;

pub use error::{Result, TimetableError};
