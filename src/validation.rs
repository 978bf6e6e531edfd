//! Input, mapping and schedule validation.
//!
//! Three gates guard a generation run:
//! - [`validate_input`]: structural integrity of teachers, classes and
//!   subjects (duplicate IDs, dangling teacher references).
//! - [`validate_mappings`]: partitions structurally invalid mappings from
//!   the ones the generator can use.
//! - [`validate_schedule`] / [`validate_timetable`]: the pre-commit check.
//!   A candidate grid is merged into a copy of every schedule and each of
//!   its lessons is run through the conflict detector.
//!
//! Validation never mutates its input.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::conflict::{
    summarize_conflicts, Candidate, Conflict, ConflictContext, ConflictDetector,
};
use crate::error::{Result, TimetableError};
use crate::models::{
    CellKey, CellRef, ClassGroup, Subject, SubjectTeacherMapping, Teacher, Timetable, WeekGrid,
};

/// Validation result.
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A class lists a teacher that doesn't exist.
    InvalidTeacherReference,
    /// A mapping names a subject that doesn't exist.
    UnknownSubject,
    /// No teacher could be found for a mapping.
    MissingTeacher,
    /// A mapping was invalidated for another reason.
    InvalidMapping,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the entity lists of a generation request.
///
/// Checks:
/// 1. No duplicate teacher, class or subject IDs
/// 2. Every class-assigned teacher ID points to an existing teacher
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(
    teachers: &[Teacher],
    classes: &[ClassGroup],
    subjects: &[Subject],
) -> ValidationResult {
    let mut errors = Vec::new();

    let teacher_ids = unique_ids("teacher", teachers.iter().map(|t| t.id.as_str()), &mut errors);
    unique_ids("class", classes.iter().map(|c| c.id.as_str()), &mut errors);
    unique_ids("subject", subjects.iter().map(|s| s.id.as_str()), &mut errors);

    for class in classes {
        for id in &class.assigned_teacher_ids {
            if !teacher_ids.contains(id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidTeacherReference,
                    format!("Class '{}' references unknown teacher '{}'", class.id, id),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn unique_ids<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {kind} ID: {id}"),
            ));
        }
    }
    seen
}

/// Outcome of [`validate_mappings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingValidation {
    /// Number of mappings the generator can use.
    pub valid: usize,
    /// One error per structurally invalid mapping.
    pub errors: Vec<ValidationError>,
}

impl MappingValidation {
    /// Whether at least one valid mapping remains.
    pub fn has_valid(&self) -> bool {
        self.valid > 0
    }

    /// `NoValidMappings` when nothing is left to schedule.
    pub fn into_result(self) -> Result<Self> {
        if self.has_valid() {
            Ok(self)
        } else {
            Err(TimetableError::NoValidMappings)
        }
    }
}

/// Partitions structurally invalid mappings.
///
/// Invalid mappings are reported, not dropped; they invalidate only
/// themselves.
pub fn validate_mappings(
    mappings: &[SubjectTeacherMapping],
    subjects: &[Subject],
) -> MappingValidation {
    let mut report = MappingValidation::default();
    for m in mappings {
        if m.is_valid {
            report.valid += 1;
            continue;
        }
        let kind = if !subjects.iter().any(|s| s.id == m.subject_id) {
            ValidationErrorKind::UnknownSubject
        } else if m.teacher_id.is_empty() {
            ValidationErrorKind::MissingTeacher
        } else {
            ValidationErrorKind::InvalidMapping
        };
        let detail = if m.issues.is_empty() {
            "invalid".to_string()
        } else {
            m.issues.join("; ")
        };
        report.errors.push(ValidationError::new(
            kind,
            format!("Mapping '{}': {}", m.id, detail),
        ));
    }
    report
}

/// Which entity a candidate grid belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// The grid is a teacher's schedule row.
    Teacher,
    /// The grid is a class view; lessons carry their teacher IDs.
    Class,
}

/// Result of a schedule validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// No blocking conflict was found and every lesson resolved to a teacher.
    pub is_valid: bool,
    pub errors: Vec<Conflict>,
    pub warnings: Vec<Conflict>,
    /// Class-grid lessons whose teacher could not be resolved to a schedule.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<ValidationError>,
}

impl ValidationReport {
    fn from_conflicts(conflicts: &[Conflict]) -> Self {
        let summary = summarize_conflicts(conflicts);
        Self {
            is_valid: summary.is_clear(),
            errors: summary.blocking,
            warnings: summary.advisory,
            unresolved: Vec::new(),
        }
    }

    fn with_unresolved(mut self, unresolved: Vec<ValidationError>) -> Self {
        self.is_valid &= unresolved.is_empty();
        self.unresolved = unresolved;
        self
    }

    /// `ValidationFailed` when a blocking conflict remains.
    pub fn ensure_valid(&self) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(TimetableError::ValidationFailed {
                errors: self.errors.len() + self.unresolved.len(),
            })
        }
    }
}

/// Validates a candidate grid for one teacher or class against every other
/// schedule.
///
/// In [`ValidationMode::Teacher`] the grid replaces the lessons of the
/// teacher's row. In [`ValidationMode::Class`] it replaces every lesson of
/// the class; a lesson whose teacher is already busy at that cell is kept
/// on an extra row so the double-booking is reported rather than lost. A
/// class lesson with no teacher, or with a teacher that has no schedule,
/// lands in [`ValidationReport::unresolved`] and makes the report invalid.
///
/// # Errors
/// `UnknownEntity` when the selected teacher has no schedule in teacher
/// mode; `CellUnavailable` when a lesson sits on a fixed period.
pub fn validate_schedule(
    mode: ValidationMode,
    grid: &WeekGrid,
    selected_id: &str,
    all: &Timetable,
    ctx: &ConflictContext<'_>,
) -> Result<ValidationReport> {
    let mut merged = all.clone();
    let mut unresolved = Vec::new();
    let targets: Vec<CellRef> = match mode {
        ValidationMode::Teacher => {
            let row = merged
                .row_for_teacher(selected_id)
                .ok_or_else(|| TimetableError::unknown("teacher schedule", selected_id))?;
            merged.replace_row_lessons(row, grid)?;
            merged
                .lessons()
                .filter(|(at, _)| at.row == row)
                .map(|(at, _)| at)
                .collect()
        }
        ValidationMode::Class => {
            merged.remove_class_lessons(selected_id);
            let mut targets = Vec::new();
            for (cell, lesson) in grid.lessons() {
                let mut lesson = lesson.clone();
                lesson.class_id = selected_id.to_string();
                if lesson.teacher_id.is_empty() {
                    unresolved.push(ValidationError::new(
                        ValidationErrorKind::MissingTeacher,
                        format!("{} {}: {} has no teacher", cell.day, cell.period, lesson.subject_id),
                    ));
                    continue;
                }
                let Some(at) = open_row_for(&mut merged, &lesson.teacher_id, cell) else {
                    unresolved.push(ValidationError::new(
                        ValidationErrorKind::InvalidTeacherReference,
                        format!(
                            "{} {}: teacher '{}' has no schedule",
                            cell.day, cell.period, lesson.teacher_id
                        ),
                    ));
                    continue;
                };
                merged.insert_lesson(at, lesson)?;
                targets.push(at);
            }
            targets
        }
    };

    let detector = ConflictDetector::standard();
    let conflicts: Vec<Conflict> = targets
        .into_iter()
        .filter_map(|at| merged.lesson(at).map(|l| (at, l)))
        .flat_map(|(at, lesson)| detector.check(ctx, &merged, &Candidate::placed(at, lesson)))
        .collect();
    Ok(ValidationReport::from_conflicts(&conflicts).with_unresolved(unresolved))
}

/// A row of `teacher_id` free at `cell`, adding an overflow row when every
/// row of the teacher is occupied. `None` when the teacher has no row.
fn open_row_for(timetable: &mut Timetable, teacher_id: &str, cell: CellKey) -> Option<CellRef> {
    let rows: Vec<usize> = timetable
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, r)| r.teacher_id == teacher_id)
        .map(|(i, _)| i)
        .collect();
    let first = *rows.first()?;
    if let Some(row) = rows
        .iter()
        .copied()
        .find(|row| timetable.is_open(CellRef::new(*row, cell)))
    {
        return Some(CellRef::new(row, cell));
    }
    let level = timetable.rows()[first].level;
    let row = timetable.add_row(format!("overflow-{teacher_id}"), teacher_id, level);
    Some(CellRef::new(row, cell))
}

/// Validates every lesson of a timetable.
pub fn validate_timetable(timetable: &Timetable, ctx: &ConflictContext<'_>) -> ValidationReport {
    let conflicts = ConflictDetector::standard().detect_all(ctx, timetable);
    ValidationReport::from_conflicts(&conflicts)
}
