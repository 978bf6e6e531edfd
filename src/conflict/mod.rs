//! Conflict detection for timetables.
//!
//! A pure evaluator: rules read a [`Timetable`] through a
//! [`ConflictContext`] and return structured [`Conflict`] values. Detection
//! never fails; absence of a conflict is `None`.
//!
//! # Categories
//!
//! | Type | Severity |
//! |------|----------|
//! | teacher double-booking | error |
//! | class double-booking | error |
//! | teacher unavailable | error |
//! | teacher restricted | warning |
//! | class unavailable | error |
//! | class restricted | warning |
//! | level mismatch | warning |
//! | branch mismatch | warning |
//! | weekly hours exceeded | error |
//! | daily hours exceeded | error |
//! | consecutive hours exceeded | warning |
//!
//! Break periods and the lunch period of the class's level are exempt from
//! every check.
//!
//! # Usage
//!
//! ```
//! use u_timetable::conflict::{check_all_conflicts, Candidate, ConflictContext};
//! use u_timetable::models::*;
//!
//! let teachers = vec![Teacher::new("T1", "Mathematics", Level::Primary)];
//! let classes = vec![ClassGroup::new("5A", Level::Primary)];
//! let constraints = ConstraintSet::new();
//! let rules = SchedulingRules::default();
//! let ctx = ConflictContext::new(&teachers, &classes, &[], &constraints, &rules);
//! let tt = Timetable::for_teachers(&teachers);
//!
//! let cell = CellKey::new(Day::Monday, Period::lesson(1).unwrap());
//! let conflicts = check_all_conflicts(&ctx, &tt, &Candidate::new("T1", "5A", "MATH", cell));
//! assert!(conflicts.is_empty());
//! ```

mod context;
pub mod rules;

pub use context::{Candidate, ConflictContext};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

use crate::models::{CellKey, CellRef, Timetable};

/// Conflict category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    TeacherDoubleBooking,
    ClassDoubleBooking,
    TeacherUnavailable,
    TeacherRestricted,
    ClassUnavailable,
    ClassRestricted,
    LevelMismatch,
    BranchMismatch,
    WeeklyHoursExceeded,
    DailyHoursExceeded,
    ConsecutiveHoursExceeded,
}

impl ConflictType {
    /// Severity of this category.
    pub fn severity(self) -> Severity {
        match self {
            ConflictType::TeacherDoubleBooking
            | ConflictType::ClassDoubleBooking
            | ConflictType::TeacherUnavailable
            | ConflictType::ClassUnavailable
            | ConflictType::WeeklyHoursExceeded
            | ConflictType::DailyHoursExceeded => Severity::Error,
            ConflictType::TeacherRestricted
            | ConflictType::ClassRestricted
            | ConflictType::LevelMismatch
            | ConflictType::BranchMismatch
            | ConflictType::ConsecutiveHoursExceeded => Severity::Warning,
        }
    }

    /// Repair order; lower is repaired first.
    pub fn priority(self) -> u8 {
        match self {
            ConflictType::TeacherDoubleBooking => 0,
            ConflictType::ClassDoubleBooking => 1,
            ConflictType::TeacherUnavailable => 2,
            ConflictType::ClassUnavailable => 3,
            ConflictType::WeeklyHoursExceeded => 4,
            ConflictType::DailyHoursExceeded => 5,
            ConflictType::ConsecutiveHoursExceeded => 6,
            ConflictType::TeacherRestricted => 7,
            ConflictType::ClassRestricted => 8,
            ConflictType::LevelMismatch => 9,
            ConflictType::BranchMismatch => 10,
        }
    }
}

/// Blocking or advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A detected conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub conflict_type: ConflictType,
    pub message: String,
    pub severity: Severity,
    /// Ids of the teachers, classes and subjects involved.
    pub entities: Vec<String>,
    /// Day and period of the offending lesson.
    pub cell: CellKey,
    /// Timetable address, when the conflict concerns a placed lesson.
    #[serde(skip)]
    pub at: Option<CellRef>,
}

impl Conflict {
    /// Creates a conflict with the category's default severity.
    pub fn new(
        conflict_type: ConflictType,
        cell: CellKey,
        message: impl Into<String>,
        entities: Vec<String>,
    ) -> Self {
        Self {
            conflict_type,
            message: message.into(),
            severity: conflict_type.severity(),
            entities,
            cell,
            at: None,
        }
    }

    /// Attaches the timetable address.
    pub fn at(mut self, at: CellRef) -> Self {
        self.at = Some(at);
        self
    }

    /// Whether this conflict blocks a placement or a commit.
    #[inline]
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

/// Conflicts split by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSummary {
    pub blocking: Vec<Conflict>,
    pub advisory: Vec<Conflict>,
}

impl ConflictSummary {
    pub fn error_count(&self) -> usize {
        self.blocking.len()
    }

    pub fn warning_count(&self) -> usize {
        self.advisory.len()
    }

    /// Whether nothing blocks.
    pub fn is_clear(&self) -> bool {
        self.blocking.is_empty()
    }
}

/// Partitions conflicts into blocking (error) and advisory (warning).
pub fn summarize_conflicts(conflicts: &[Conflict]) -> ConflictSummary {
    let (blocking, advisory): (Vec<Conflict>, Vec<Conflict>) =
        conflicts.iter().cloned().partition(Conflict::is_blocking);
    ConflictSummary { blocking, advisory }
}

/// A single conflict check.
///
/// Rules are pure: they read the context and the timetable and report at
/// most one conflict for a candidate.
pub trait ConflictRule: Send + Sync + Debug {
    /// Rule name (e.g., "teacher-double-booking").
    fn name(&self) -> &'static str;

    /// Evaluates `candidate` as if placed in `timetable`.
    fn check(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &Timetable,
        candidate: &Candidate<'_>,
    ) -> Option<Conflict>;
}

/// An ordered set of conflict rules.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    rules: Vec<Arc<dyn ConflictRule>>,
}

impl ConflictDetector {
    /// Creates a detector with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detector running every built-in check.
    pub fn standard() -> Self {
        Self::new()
            .with_rule(rules::TeacherDoubleBooking)
            .with_rule(rules::ClassDoubleBooking)
            .with_rule(rules::TeacherAvailability)
            .with_rule(rules::ClassAvailability)
            .with_rule(rules::LevelMatch)
            .with_rule(rules::BranchMatch)
            .with_rule(rules::WeeklyQuota)
            .with_rule(rules::TeacherDailyLimit)
            .with_rule(rules::ClassDailyLimit)
            .with_rule(rules::ConsecutiveLimit)
    }

    /// Appends a rule.
    pub fn with_rule<R: ConflictRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Names of the configured rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Runs every rule against one candidate.
    pub fn check(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &Timetable,
        candidate: &Candidate<'_>,
    ) -> Vec<Conflict> {
        if ctx.is_exempt(candidate) {
            return Vec::new();
        }
        self.rules
            .iter()
            .filter_map(|r| r.check(ctx, timetable, candidate))
            .map(|c| match candidate.exclude {
                Some(at) => c.at(at),
                None => c,
            })
            .collect()
    }

    /// Whether any rule reports a blocking conflict for `candidate`.
    pub fn blocks(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &Timetable,
        candidate: &Candidate<'_>,
    ) -> bool {
        !ctx.is_exempt(candidate)
            && self
                .rules
                .iter()
                .filter_map(|r| r.check(ctx, timetable, candidate))
                .any(|c| c.is_blocking())
    }

    /// Evaluates every placed lesson in place. A conflict involving several
    /// lessons is reported once per lesson.
    pub fn detect_all(&self, ctx: &ConflictContext<'_>, timetable: &Timetable) -> Vec<Conflict> {
        timetable
            .lessons()
            .flat_map(|(at, lesson)| self.check(ctx, timetable, &Candidate::placed(at, lesson)))
            .collect()
    }
}

/// Runs every built-in check for one candidate placement.
pub fn check_all_conflicts(
    ctx: &ConflictContext<'_>,
    timetable: &Timetable,
    candidate: &Candidate<'_>,
) -> Vec<Conflict> {
    ConflictDetector::standard().check(ctx, timetable, candidate)
}

/// Runs every built-in check for every placed lesson.
pub fn detect_all(ctx: &ConflictContext<'_>, timetable: &Timetable) -> Vec<Conflict> {
    ConflictDetector::standard().detect_all(ctx, timetable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ClassGroup, ConstraintSet, Day, Level, Period, SchedulingRules, Subject, Teacher,
    };

    fn lesson(n: u8) -> CellKey {
        CellKey::new(Day::Monday, Period::lesson(n).unwrap())
    }

    #[test]
    fn test_standard_detector_covers_all_categories() {
        let names = ConflictDetector::standard().rule_names();
        assert_eq!(names.len(), 10);
        assert!(names.contains(&"consecutive-limit"));
    }

    #[test]
    fn test_summarize_partitions_by_severity() {
        let conflicts = vec![
            Conflict::new(ConflictType::TeacherDoubleBooking, lesson(1), "a", vec![]),
            Conflict::new(ConflictType::BranchMismatch, lesson(1), "b", vec![]),
            Conflict::new(ConflictType::DailyHoursExceeded, lesson(2), "c", vec![]),
        ];
        let summary = summarize_conflicts(&conflicts);
        assert_eq!(summary.error_count(), 2);
        assert_eq!(summary.warning_count(), 1);
        assert!(!summary.is_clear());
        assert_eq!(summarize_conflicts(&[]), ConflictSummary::default());
    }

    #[test]
    fn test_priority_orders_double_booking_first() {
        assert!(ConflictType::TeacherDoubleBooking.priority() < ConflictType::ClassDoubleBooking.priority());
        assert!(ConflictType::ClassDoubleBooking.priority() < ConflictType::WeeklyHoursExceeded.priority());
        assert!(Severity::Error < Severity::Warning);
    }

    #[test]
    fn test_exempt_cells_report_nothing() {
        let teachers = vec![Teacher::new("T1", "Music", Level::Middle)];
        let classes = vec![ClassGroup::new("5A", Level::Primary)];
        let subjects = vec![Subject::new("MATH", "Mathematics", Level::Primary)];
        let constraints = ConstraintSet::new();
        let rules = SchedulingRules::default();
        let ctx = ConflictContext::new(&teachers, &classes, &subjects, &constraints, &rules);
        let tt = Timetable::for_teachers(&teachers);

        // Level and branch both mismatch, but lesson 5 is the class's lunch.
        assert!(check_all_conflicts(&ctx, &tt, &Candidate::new("T1", "5A", "MATH", lesson(5))).is_empty());
        let conflicts = check_all_conflicts(&ctx, &tt, &Candidate::new("T1", "5A", "MATH", lesson(4)));
        assert_eq!(conflicts.len(), 2);
        assert!(conflicts.iter().all(|c| !c.is_blocking()));
    }

    #[test]
    fn test_detect_all_reports_both_sides_of_a_double_booking() {
        let teachers = vec![
            Teacher::new("T1", "Mathematics", Level::Primary),
            Teacher::new("T2", "Science", Level::Primary),
        ];
        let classes = vec![ClassGroup::new("5A", Level::Primary)];
        let subjects = vec![
            Subject::new("MATH", "Mathematics", Level::Primary).with_weekly_hours(4),
            Subject::new("SCI", "Science", Level::Primary).with_weekly_hours(4),
        ];
        let constraints = ConstraintSet::new();
        let rules = SchedulingRules::default();
        let ctx = ConflictContext::new(&teachers, &classes, &subjects, &constraints, &rules);
        let mut tt = Timetable::for_teachers(&teachers);
        tt.place(CellRef::new(0, lesson(1)), "MATH", "5A", "T1").unwrap();
        tt.place(CellRef::new(1, lesson(1)), "SCI", "5A", "T2").unwrap();
        tt.place(CellRef::new(0, lesson(2)), "MATH", "5A", "T1").unwrap();

        let conflicts = detect_all(&ctx, &tt);
        let class_clashes: Vec<&Conflict> = conflicts
            .iter()
            .filter(|c| c.conflict_type == ConflictType::ClassDoubleBooking)
            .collect();
        assert_eq!(class_clashes.len(), 2);
        assert!(class_clashes.iter().all(|c| c.at.is_some()));
        assert_eq!(conflicts.len(), 2);
    }
}
