//! Read-only lookups shared by every conflict rule.

use std::collections::HashMap;

use crate::models::{
    CellKey, CellRef, ClassGroup, ConstraintSet, Lesson, Level, SchedulingRules, Subject,
    SubjectTeacherMapping, Teacher,
};

/// Entity lookups, availability constraints, rules and quotas.
///
/// The context never holds the timetable; rules receive it separately so
/// one context serves every iteration of a run.
#[derive(Debug, Clone)]
pub struct ConflictContext<'a> {
    teachers: HashMap<&'a str, &'a Teacher>,
    classes: HashMap<&'a str, &'a ClassGroup>,
    subjects: HashMap<&'a str, &'a Subject>,
    /// Availability records.
    pub constraints: &'a ConstraintSet,
    /// Hard caps and soft preferences.
    pub rules: &'a SchedulingRules,
    /// Weekly quota per (class_id, subject_id).
    quotas: HashMap<(String, String), u32>,
}

impl<'a> ConflictContext<'a> {
    /// Creates a context without mapping quotas; weekly checks fall back to
    /// the subject's default hours.
    pub fn new(
        teachers: &'a [Teacher],
        classes: &'a [ClassGroup],
        subjects: &'a [Subject],
        constraints: &'a ConstraintSet,
        rules: &'a SchedulingRules,
    ) -> Self {
        Self {
            teachers: teachers.iter().map(|t| (t.id.as_str(), t)).collect(),
            classes: classes.iter().map(|c| (c.id.as_str(), c)).collect(),
            subjects: subjects.iter().map(|s| (s.id.as_str(), s)).collect(),
            constraints,
            rules,
            quotas: HashMap::new(),
        }
    }

    /// Takes weekly quotas from valid mappings.
    pub fn with_mappings(mut self, mappings: &[SubjectTeacherMapping]) -> Self {
        self.quotas = mappings
            .iter()
            .filter(|m| m.is_valid)
            .map(|m| ((m.class_id.clone(), m.subject_id.clone()), m.weekly_hours))
            .collect();
        self
    }

    pub fn teacher(&self, id: &str) -> Option<&'a Teacher> {
        self.teachers.get(id).copied()
    }

    pub fn class(&self, id: &str) -> Option<&'a ClassGroup> {
        self.classes.get(id).copied()
    }

    pub fn subject(&self, id: &str) -> Option<&'a Subject> {
        self.subjects.get(id).copied()
    }

    /// Weekly quota of a subject in a class: the mapping's quota, else the
    /// subject default.
    pub fn quota(&self, class_id: &str, subject_id: &str) -> Option<u32> {
        self.quotas
            .get(&(class_id.to_string(), subject_id.to_string()))
            .copied()
            .or_else(|| self.subject(subject_id).map(|s| s.weekly_hours))
    }

    /// Level whose lunch applies to a lesson: the class's, else the teacher's.
    pub fn lunch_level(&self, class_id: &str, teacher_id: &str) -> Option<Level> {
        self.class(class_id)
            .map(|c| c.level)
            .or_else(|| self.teacher(teacher_id).map(|t| t.level))
    }

    /// Whether no check applies to `candidate`: breaks and the lunch period
    /// of the class's level.
    pub fn is_exempt(&self, candidate: &Candidate<'_>) -> bool {
        let period = candidate.cell.period;
        if !period.is_lesson() {
            return true;
        }
        self.lunch_level(candidate.class_id, candidate.teacher_id)
            .is_some_and(|level| level.lunch_period() == period)
    }
}

/// A lesson evaluated as if placed at `cell`.
///
/// When `exclude` is set, the lesson already stored there is ignored by
/// counting rules so a placed lesson does not conflict with itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub teacher_id: &'a str,
    pub class_id: &'a str,
    pub subject_id: &'a str,
    pub cell: CellKey,
    pub exclude: Option<CellRef>,
}

impl<'a> Candidate<'a> {
    /// A new placement.
    pub fn new(teacher_id: &'a str, class_id: &'a str, subject_id: &'a str, cell: CellKey) -> Self {
        Self {
            teacher_id,
            class_id,
            subject_id,
            cell,
            exclude: None,
        }
    }

    /// An already placed lesson, evaluated in place.
    pub fn placed(at: CellRef, lesson: &'a Lesson) -> Self {
        Self {
            teacher_id: &lesson.teacher_id,
            class_id: &lesson.class_id,
            subject_id: &lesson.subject_id,
            cell: at.cell,
            exclude: Some(at),
        }
    }

    /// Ignores the lesson stored at `at`.
    pub fn excluding(mut self, at: CellRef) -> Self {
        self.exclude = Some(at);
        self
    }

    /// Whether `at` is the excluded cell.
    #[inline]
    pub fn skips(&self, at: CellRef) -> bool {
        self.exclude == Some(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Day, Period};

    #[test]
    fn test_lunch_exemption_follows_class_level() {
        let teachers = vec![Teacher::new("T1", "Science", Level::Middle)];
        let classes = vec![ClassGroup::new("5A", Level::Primary)];
        let constraints = ConstraintSet::new();
        let rules = SchedulingRules::default();
        let ctx = ConflictContext::new(&teachers, &classes, &[], &constraints, &rules);

        let lesson5 = CellKey::new(Day::Monday, Period::lesson(5).unwrap());
        let lesson6 = CellKey::new(Day::Monday, Period::lesson(6).unwrap());
        assert!(ctx.is_exempt(&Candidate::new("T1", "5A", "SCI", lesson5)));
        assert!(!ctx.is_exempt(&Candidate::new("T1", "5A", "SCI", lesson6)));
        // Unknown class falls back to the teacher's level.
        assert!(ctx.is_exempt(&Candidate::new("T1", "9Z", "SCI", lesson6)));
        assert!(ctx.is_exempt(&Candidate::new(
            "T1",
            "5A",
            "SCI",
            CellKey::new(Day::Monday, Period::PREP)
        )));
    }

    #[test]
    fn test_quota_prefers_mapping() {
        let subjects = vec![Subject::new("MATH", "Mathematics", Level::Primary).with_weekly_hours(5)];
        let constraints = ConstraintSet::new();
        let rules = SchedulingRules::default();
        let mappings = vec![SubjectTeacherMapping::new("5A", "MATH", "T1", 3)];
        let ctx = ConflictContext::new(&[], &[], &subjects, &constraints, &rules)
            .with_mappings(&mappings);
        assert_eq!(ctx.quota("5A", "MATH"), Some(3));
        assert_eq!(ctx.quota("5B", "MATH"), Some(5));
        assert_eq!(ctx.quota("5A", "ART"), None);
    }
}
