//! Subject-teacher mapping builder.
//!
//! For every (class, subject) pair the builder picks a teacher and a weekly
//! quota, producing one [`SubjectTeacherMapping`]. Selection is fully
//! deterministic: identical input order yields identical mappings.
//!
//! # Teacher selection
//!
//! Five tiers, most specific first:
//!
//! | Tier | Candidate pool | Must match |
//! |------|----------------|------------|
//! | 1 | class-assigned teachers | branch and level |
//! | 2 | all selected teachers | branch and level |
//! | 3 | class-assigned teachers | level |
//! | 4 | all selected teachers | level |
//! | 5 | class-assigned teachers | anything |
//!
//! Levels are matched against the subject's level. A pair with no
//! candidate still yields a mapping, with an empty teacher id and
//! `is_valid = false`, so the gap is reported downstream.
//!
//! # Compatibility score
//!
//! Level: 50 if the teacher's level equals the subject's, 25 if it only
//! equals the class's. Branch: 50 if equal, 25 if related.

mod branch;

pub use branch::{are_related, is_compatible};

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::models::{ClassGroup, Subject, SubjectSelection, SubjectTeacherMapping, Teacher};

/// Which fallback tier produced a teacher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    AssignedBranchAndLevel,
    BranchAndLevel,
    AssignedLevel,
    Level,
    AssignedAny,
}

/// Builds subject-teacher mappings.
///
/// # Example
/// ```
/// use u_timetable::mapping::MappingBuilder;
/// use u_timetable::models::{ClassGroup, Level, Subject, SubjectSelection, Teacher};
///
/// let classes = vec![ClassGroup::new("5A", Level::Primary)];
/// let subjects = vec![Subject::new("MATH", "Mathematics", Level::Primary).with_weekly_hours(4)];
/// let teachers = vec![Teacher::new("T1", "Mathematics", Level::Primary)];
///
/// let mappings = MappingBuilder::new(&classes, &subjects, &teachers)
///     .with_selections(vec![SubjectSelection::new("MATH")])
///     .build();
/// assert_eq!(mappings[0].teacher_id, "T1");
/// assert_eq!(mappings[0].compatibility_score, 100);
/// ```
#[derive(Debug, Clone)]
pub struct MappingBuilder<'a> {
    classes: &'a [ClassGroup],
    subjects: &'a [Subject],
    teachers: &'a [Teacher],
    selections: Vec<SubjectSelection>,
    class_selections: HashMap<String, Vec<SubjectSelection>>,
}

impl<'a> MappingBuilder<'a> {
    /// Creates a builder over the selected entities.
    pub fn new(classes: &'a [ClassGroup], subjects: &'a [Subject], teachers: &'a [Teacher]) -> Self {
        Self {
            classes,
            subjects,
            teachers,
            selections: Vec::new(),
            class_selections: HashMap::new(),
        }
    }

    /// Sets the subject selection applied to every class.
    ///
    /// When empty, each class receives every subject of its level at the
    /// subject's default quota.
    pub fn with_selections(mut self, selections: Vec<SubjectSelection>) -> Self {
        self.selections = selections;
        self
    }

    /// Replaces the selection for one class.
    pub fn with_class_selections(
        mut self,
        class_id: impl Into<String>,
        selections: Vec<SubjectSelection>,
    ) -> Self {
        self.class_selections.insert(class_id.into(), selections);
        self
    }

    /// Adds all per-class selections.
    pub fn with_class_selection_map(mut self, map: HashMap<String, Vec<SubjectSelection>>) -> Self {
        self.class_selections.extend(map);
        self
    }

    /// Effective selection for a class.
    pub fn selections_for(&self, class: &ClassGroup) -> Vec<SubjectSelection> {
        if let Some(own) = self.class_selections.get(&class.id) {
            return own.clone();
        }
        if !self.selections.is_empty() {
            return self.selections.clone();
        }
        self.subjects
            .iter()
            .filter(|s| s.level == class.level)
            .map(|s| SubjectSelection::new(&s.id))
            .collect()
    }

    /// Builds one mapping per (class, selected subject), classes first.
    pub fn build(&self) -> Vec<SubjectTeacherMapping> {
        let mut mappings = Vec::new();

        for class in self.classes {
            let mut seen = HashSet::new();
            for selection in self.selections_for(class) {
                let mut mapping = self.map_one(class, &selection);
                if !seen.insert(selection.subject_id.clone()) {
                    mapping.invalidate(format!(
                        "subject {} selected more than once for class {}",
                        selection.subject_id, class.id
                    ));
                }
                mappings.push(mapping);
            }
        }

        let valid = mappings.iter().filter(|m| m.is_valid).count();
        info!(
            total = mappings.len(),
            valid,
            "Built subject-teacher mappings"
        );
        mappings
    }

    fn map_one(&self, class: &ClassGroup, selection: &SubjectSelection) -> SubjectTeacherMapping {
        let Some(subject) = self.subjects.iter().find(|s| s.id == selection.subject_id) else {
            let mut m = SubjectTeacherMapping::new(
                &class.id,
                &selection.subject_id,
                "",
                selection.weekly_hours.unwrap_or(0),
            )
            .with_priority(selection.priority);
            m.invalidate(format!("subject not found: {}", selection.subject_id));
            return m;
        };

        let weekly_hours = selection.weekly_hours.unwrap_or(subject.weekly_hours);
        match self.select_teacher(class, subject) {
            Some((teacher, tier)) => {
                let score = compatibility_score(teacher, subject, class);
                debug!(
                    class = %class.id,
                    subject = %subject.id,
                    teacher = %teacher.id,
                    ?tier,
                    score,
                    "Mapped subject"
                );
                SubjectTeacherMapping::new(&class.id, &subject.id, &teacher.id, weekly_hours)
                    .with_priority(selection.priority)
                    .with_score(score)
            }
            None => {
                let mut m = SubjectTeacherMapping::new(&class.id, &subject.id, "", weekly_hours)
                    .with_priority(selection.priority);
                m.invalidate(format!(
                    "no eligible teacher for {} in class {}",
                    subject.label(),
                    class.id
                ));
                m
            }
        }
    }

    /// Picks a teacher for (class, subject) using the five-tier fallback.
    pub fn select_teacher(
        &self,
        class: &ClassGroup,
        subject: &Subject,
    ) -> Option<(&'a Teacher, MatchTier)> {
        let assigned: Vec<&'a Teacher> = class
            .assigned_teacher_ids
            .iter()
            .filter_map(|id| self.teachers.iter().find(|t| &t.id == id))
            .collect();

        let branch_and_level =
            |t: &&Teacher| t.teaches_branch(&subject.branch) && t.level == subject.level;
        let level_only = |t: &&Teacher| t.level == subject.level;

        if let Some(t) = assigned.iter().copied().find(branch_and_level) {
            return Some((t, MatchTier::AssignedBranchAndLevel));
        }
        if let Some(t) = self.teachers.iter().find(branch_and_level) {
            return Some((t, MatchTier::BranchAndLevel));
        }
        if let Some(t) = assigned.iter().copied().find(level_only) {
            return Some((t, MatchTier::AssignedLevel));
        }
        if let Some(t) = self.teachers.iter().find(level_only) {
            return Some((t, MatchTier::Level));
        }
        assigned.first().map(|t| (*t, MatchTier::AssignedAny))
    }
}

/// Heuristic fit of a teacher for a subject in a class, 0..=100.
pub fn compatibility_score(teacher: &Teacher, subject: &Subject, class: &ClassGroup) -> u8 {
    let level = if teacher.level == subject.level {
        50
    } else if teacher.level == class.level {
        25
    } else {
        0
    };
    let branch = if teacher.teaches_branch(&subject.branch) {
        50
    } else if are_related(&teacher.branch, &subject.branch) {
        25
    } else {
        0
    };
    level + branch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Level, Priority};

    fn subjects() -> Vec<Subject> {
        vec![
            Subject::new("MATH", "Mathematics", Level::Primary).with_weekly_hours(4),
            Subject::new("SCI", "Science", Level::Primary).with_weekly_hours(3),
            Subject::new("MUS", "Music", Level::Primary).with_weekly_hours(1),
        ]
    }

    #[test]
    fn test_tier_one_prefers_assigned_teacher() {
        let classes = vec![ClassGroup::new("5A", Level::Primary).with_teacher("T2")];
        let teachers = vec![
            Teacher::new("T1", "Mathematics", Level::Primary),
            Teacher::new("T2", "Mathematics", Level::Primary),
        ];
        let subjects = subjects();
        let builder = MappingBuilder::new(&classes, &subjects, &teachers);
        let (t, tier) = builder.select_teacher(&classes[0], &subjects[0]).unwrap();
        assert_eq!(t.id, "T2");
        assert_eq!(tier, MatchTier::AssignedBranchAndLevel);
    }

    #[test]
    fn test_tier_two_any_branch_and_level() {
        let classes = vec![ClassGroup::new("5A", Level::Primary).with_teacher("T1")];
        let teachers = vec![
            Teacher::new("T1", "Music", Level::Primary),
            Teacher::new("T2", "Mathematics", Level::Primary),
        ];
        let subjects = subjects();
        let builder = MappingBuilder::new(&classes, &subjects, &teachers);
        let (t, tier) = builder.select_teacher(&classes[0], &subjects[0]).unwrap();
        assert_eq!(t.id, "T2");
        assert_eq!(tier, MatchTier::BranchAndLevel);
    }

    #[test]
    fn test_tiers_three_to_five() {
        let subjects = subjects();
        let teachers = vec![
            Teacher::new("T1", "Music", Level::Middle),
            Teacher::new("T2", "Art", Level::Primary),
            Teacher::new("T3", "English", Level::Primary),
        ];

        let assigned_level = vec![ClassGroup::new("5A", Level::Primary).with_teacher("T3")];
        let b = MappingBuilder::new(&assigned_level, &subjects, &teachers);
        let (t, tier) = b.select_teacher(&assigned_level[0], &subjects[0]).unwrap();
        assert_eq!((t.id.as_str(), tier), ("T3", MatchTier::AssignedLevel));

        let unassigned = vec![ClassGroup::new("5B", Level::Primary)];
        let b = MappingBuilder::new(&unassigned, &subjects, &teachers);
        let (t, tier) = b.select_teacher(&unassigned[0], &subjects[0]).unwrap();
        assert_eq!((t.id.as_str(), tier), ("T2", MatchTier::Level));

        let middle_only = vec![Teacher::new("T1", "Music", Level::Middle)];
        let assigned_any = vec![ClassGroup::new("5C", Level::Primary).with_teacher("T1")];
        let b = MappingBuilder::new(&assigned_any, &subjects, &middle_only);
        let (t, tier) = b.select_teacher(&assigned_any[0], &subjects[0]).unwrap();
        assert_eq!((t.id.as_str(), tier), ("T1", MatchTier::AssignedAny));
    }

    #[test]
    fn test_unresolved_mapping_is_kept_invalid() {
        let classes = vec![ClassGroup::new("5A", Level::Primary)];
        let teachers = vec![Teacher::new("T1", "Mathematics", Level::Middle)];
        let subjects = subjects();
        let mappings = MappingBuilder::new(&classes, &subjects, &teachers)
            .with_selections(vec![SubjectSelection::new("MATH")])
            .build();
        assert_eq!(mappings.len(), 1);
        assert!(!mappings[0].is_valid);
        assert!(mappings[0].teacher_id.is_empty());
        assert_eq!(mappings[0].weekly_hours, 4);
    }

    #[test]
    fn test_unknown_subject_is_structural() {
        let classes = vec![ClassGroup::new("5A", Level::Primary)];
        let teachers = vec![Teacher::new("T1", "Mathematics", Level::Primary)];
        let subjects = subjects();
        let mappings = MappingBuilder::new(&classes, &subjects, &teachers)
            .with_selections(vec![SubjectSelection::new("GHOST").with_weekly_hours(2)])
            .build();
        assert!(!mappings[0].is_valid);
        assert!(mappings[0].issues[0].contains("GHOST"));
    }

    #[test]
    fn test_compatibility_score() {
        let class = ClassGroup::new("5A", Level::Primary);
        let math = Subject::new("MATH", "Mathematics", Level::Primary);
        let full = Teacher::new("T1", "Mathematics", Level::Primary);
        let related = Teacher::new("T2", "Science", Level::Primary);
        let none = Teacher::new("T3", "Music", Level::Middle);
        assert_eq!(compatibility_score(&full, &math, &class), 100);
        assert_eq!(compatibility_score(&related, &math, &class), 75);
        assert_eq!(compatibility_score(&none, &math, &class), 0);

        let middle_subject = Subject::new("ALG", "Mathematics", Level::Middle);
        assert_eq!(compatibility_score(&full, &middle_subject, &class), 75);
    }

    #[test]
    fn test_overrides_and_defaults() {
        let classes = vec![
            ClassGroup::new("5A", Level::Primary),
            ClassGroup::new("5B", Level::Primary),
        ];
        let teachers = vec![
            Teacher::new("T1", "Mathematics", Level::Primary),
            Teacher::new("T2", "Science", Level::Primary),
        ];
        let subjects = subjects();
        let mappings = MappingBuilder::new(&classes, &subjects, &teachers)
            .with_class_selections(
                "5B",
                vec![SubjectSelection::new("SCI")
                    .with_weekly_hours(5)
                    .with_priority(Priority::High)],
            )
            .build();

        // 5A gets every Primary subject, 5B only its override.
        assert_eq!(mappings.iter().filter(|m| m.class_id == "5A").count(), 3);
        let sci_b = mappings.iter().find(|m| m.id == "5B:SCI").unwrap();
        assert_eq!(sci_b.weekly_hours, 5);
        assert_eq!(sci_b.priority, Priority::High);
        assert_eq!(mappings.len(), 4);
    }

    #[test]
    fn test_duplicate_selection_invalidated() {
        let classes = vec![ClassGroup::new("5A", Level::Primary)];
        let teachers = vec![Teacher::new("T1", "Mathematics", Level::Primary)];
        let subjects = subjects();
        let mappings = MappingBuilder::new(&classes, &subjects, &teachers)
            .with_selections(vec![SubjectSelection::new("MATH"), SubjectSelection::new("MATH")])
            .build();
        assert!(mappings[0].is_valid);
        assert!(!mappings[1].is_valid);
    }

    #[test]
    fn test_build_is_deterministic() {
        let classes = vec![
            ClassGroup::new("5A", Level::Primary).with_teacher("T2"),
            ClassGroup::new("5B", Level::Primary),
        ];
        let teachers = vec![
            Teacher::new("T1", "Mathematics", Level::Primary),
            Teacher::new("T2", "Science", Level::Primary),
            Teacher::new("T3", "Music", Level::Primary),
        ];
        let subjects = subjects();
        let builder = MappingBuilder::new(&classes, &subjects, &teachers);
        let first = builder.build();
        for _ in 0..5 {
            assert_eq!(builder.build(), first);
        }
    }
}
