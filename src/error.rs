//! Error taxonomy for timetable generation.
//!
//! Conflicts found by the detector are *not* errors: they are returned as
//! structured [`Conflict`](crate::conflict::Conflict) values. This type covers
//! the failures that abort a single operation: malformed keys, missing
//! entities, exhausted quotas, configuration and persistence failures.

use thiserror::Error;

use crate::models::{Day, Period};

/// Errors raised by timetable operations.
#[derive(Error, Debug)]
pub enum TimetableError {
    #[error("unknown day key: {0}")]
    UnknownDay(String),

    #[error("unknown period key: {0}")]
    UnknownPeriod(String),

    #[error("unknown fixed period subject: {0}")]
    UnknownFixedPeriod(String),

    /// A referenced teacher, class or subject does not exist.
    #[error("{kind} not found: {id}")]
    UnknownEntity { kind: &'static str, id: String },

    #[error("weekly quota exhausted for subject {subject_id} in class {class_id}")]
    QuotaExceeded {
        subject_id: String,
        class_id: String,
    },

    #[error("cell {day} {period} is not open for a lesson")]
    CellUnavailable { day: Day, period: Period },

    /// A lesson sequence number would exceed `u64::MAX`.
    #[error("lesson sequence number overflow")]
    SequenceOverflow,

    #[error("no valid subject-teacher mappings")]
    NoValidMappings,

    #[error("no class schedule could be produced")]
    NoSchedulesProduced,

    #[error("validation failed with {errors} blocking conflict(s)")]
    ValidationFailed { errors: usize },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("schedule store error: {0}")]
    Store(String),
}

impl TimetableError {
    /// Shorthand for a missing-entity error.
    pub fn unknown(kind: &'static str, id: impl Into<String>) -> Self {
        Self::UnknownEntity {
            kind,
            id: id.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TimetableError>;
