//! Subject-teacher mappings.
//!
//! A mapping binds a (class, subject) pair to a teacher and a weekly-hour
//! quota. Mappings are rebuilt at the start of every generation run.

use serde::{Deserialize, Serialize};

/// Scheduling priority of a subject selection.
///
/// Ordering follows declaration order, so an ascending sort puts `High`
/// first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// A subject selected for a class, with optional overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSelection {
    pub subject_id: String,
    /// Overrides the subject's default weekly quota.
    #[serde(default)]
    pub weekly_hours: Option<u32>,
    #[serde(default)]
    pub priority: Priority,
}

impl SubjectSelection {
    /// Selects a subject with its default quota and medium priority.
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            weekly_hours: None,
            priority: Priority::Medium,
        }
    }

    /// Overrides the weekly quota.
    pub fn with_weekly_hours(mut self, hours: u32) -> Self {
        self.weekly_hours = Some(hours);
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// A (class, subject) pair bound to a teacher and a quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectTeacherMapping {
    /// Deterministic id: `"{class_id}:{subject_id}"`.
    pub id: String,
    pub subject_id: String,
    /// Empty when no eligible teacher was found.
    pub teacher_id: String,
    pub class_id: String,
    /// Weekly quota.
    pub weekly_hours: u32,
    /// Lessons placed so far; never exceeds `weekly_hours`.
    pub assigned_hours: u32,
    pub priority: Priority,
    pub is_valid: bool,
    /// Teacher fit, 0..=100.
    pub compatibility_score: u8,
    /// Reasons the mapping is invalid or degraded.
    #[serde(default)]
    pub issues: Vec<String>,
}

impl SubjectTeacherMapping {
    /// Creates a valid mapping with no hours assigned.
    pub fn new(
        class_id: impl Into<String>,
        subject_id: impl Into<String>,
        teacher_id: impl Into<String>,
        weekly_hours: u32,
    ) -> Self {
        let class_id = class_id.into();
        let subject_id = subject_id.into();
        Self {
            id: format!("{class_id}:{subject_id}"),
            subject_id,
            teacher_id: teacher_id.into(),
            class_id,
            weekly_hours,
            assigned_hours: 0,
            priority: Priority::Medium,
            is_valid: true,
            compatibility_score: 0,
            issues: Vec::new(),
        }
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the compatibility score (clamped to 100).
    pub fn with_score(mut self, score: u8) -> Self {
        self.compatibility_score = score.min(100);
        self
    }

    /// Marks the mapping invalid with a reason.
    pub fn invalidate(&mut self, issue: impl Into<String>) {
        self.is_valid = false;
        self.issues.push(issue.into());
    }

    /// Hours still to place.
    pub fn remaining_hours(&self) -> u32 {
        self.weekly_hours.saturating_sub(self.assigned_hours)
    }

    /// Whether the quota is met.
    pub fn is_complete(&self) -> bool {
        self.assigned_hours >= self.weekly_hours
    }

    /// Counts one placed lesson. Returns `false` (and changes nothing) when
    /// the quota is already met.
    pub fn record_assignment(&mut self) -> bool {
        if self.is_complete() {
            return false;
        }
        self.assigned_hours += 1;
        true
    }

    /// Sets the assigned count from an observed lesson count, clamped to the quota.
    pub fn sync_assigned(&mut self, placed: u32) {
        self.assigned_hours = placed.min(self.weekly_hours);
    }
}
