//! Built-in conflict rules.
//!
//! # Categories
//!
//! - **Double-booking**: [`TeacherDoubleBooking`], [`ClassDoubleBooking`]
//! - **Availability**: [`TeacherAvailability`], [`ClassAvailability`]
//! - **Compatibility**: [`LevelMatch`], [`BranchMatch`]
//! - **Quota**: [`WeeklyQuota`], [`TeacherDailyLimit`], [`ClassDailyLimit`],
//!   [`ConsecutiveLimit`]
//!
//! Every rule evaluates a [`Candidate`] as if it were placed, against the
//! other lessons of the timetable.

use super::{Candidate, Conflict, ConflictContext, ConflictRule, ConflictType};
use crate::models::{same_branch, CellKey, ConstraintType, EntityType, Lesson, Period, Timetable};

// ======================== Double-booking ========================

/// The teacher already teaches another lesson in this cell.
#[derive(Debug, Clone, Copy)]
pub struct TeacherDoubleBooking;

impl ConflictRule for TeacherDoubleBooking {
    fn name(&self) -> &'static str {
        "teacher-double-booking"
    }

    fn check(
        &self,
        _ctx: &ConflictContext<'_>,
        timetable: &Timetable,
        cand: &Candidate<'_>,
    ) -> Option<Conflict> {
        let (_, other) = timetable
            .lessons_at(cand.cell)
            .find(|(at, l)| !cand.skips(*at) && l.teacher_id == cand.teacher_id)?;
        Some(Conflict::new(
            ConflictType::TeacherDoubleBooking,
            cand.cell,
            format!(
                "teacher {} already teaches class {} on {}",
                cand.teacher_id, other.class_id, cand.cell
            ),
            vec![
                cand.teacher_id.to_string(),
                cand.class_id.to_string(),
                other.class_id.clone(),
            ],
        ))
    }
}

/// The class already has another lesson in this cell.
#[derive(Debug, Clone, Copy)]
pub struct ClassDoubleBooking;

impl ConflictRule for ClassDoubleBooking {
    fn name(&self) -> &'static str {
        "class-double-booking"
    }

    fn check(
        &self,
        _ctx: &ConflictContext<'_>,
        timetable: &Timetable,
        cand: &Candidate<'_>,
    ) -> Option<Conflict> {
        let (_, other) = timetable
            .lessons_at(cand.cell)
            .find(|(at, l)| !cand.skips(*at) && l.class_id == cand.class_id)?;
        Some(Conflict::new(
            ConflictType::ClassDoubleBooking,
            cand.cell,
            format!(
                "class {} already has {} with teacher {} on {}",
                cand.class_id, other.subject_id, other.teacher_id, cand.cell
            ),
            vec![
                cand.class_id.to_string(),
                cand.teacher_id.to_string(),
                other.teacher_id.clone(),
            ],
        ))
    }
}

// ======================== Availability ========================

fn availability(
    ctx: &ConflictContext<'_>,
    entity_type: EntityType,
    entity_id: &str,
    cand: &Candidate<'_>,
    blocking: ConflictType,
    advisory: ConflictType,
) -> Option<Conflict> {
    let kind = match entity_type {
        EntityType::Teacher => "teacher",
        EntityType::Class => "class",
        EntityType::Subject => "subject",
    };
    let (conflict_type, verdict) = match ctx.constraints.lookup(entity_type, entity_id, cand.cell) {
        ConstraintType::Preferred => return None,
        ConstraintType::Restricted => (advisory, "restricted"),
        ConstraintType::Unavailable => (blocking, "unavailable"),
    };
    Some(Conflict::new(
        conflict_type,
        cand.cell,
        format!("{kind} {entity_id} is {verdict} on {}", cand.cell),
        vec![entity_id.to_string()],
    ))
}

/// Teacher `unavailable` (error) or `restricted` (warning) at the cell.
#[derive(Debug, Clone, Copy)]
pub struct TeacherAvailability;

impl ConflictRule for TeacherAvailability {
    fn name(&self) -> &'static str {
        "teacher-availability"
    }

    fn check(
        &self,
        ctx: &ConflictContext<'_>,
        _timetable: &Timetable,
        cand: &Candidate<'_>,
    ) -> Option<Conflict> {
        availability(
            ctx,
            EntityType::Teacher,
            cand.teacher_id,
            cand,
            ConflictType::TeacherUnavailable,
            ConflictType::TeacherRestricted,
        )
    }
}

/// Class `unavailable` (error) or `restricted` (warning) at the cell.
#[derive(Debug, Clone, Copy)]
pub struct ClassAvailability;

impl ConflictRule for ClassAvailability {
    fn name(&self) -> &'static str {
        "class-availability"
    }

    fn check(
        &self,
        ctx: &ConflictContext<'_>,
        _timetable: &Timetable,
        cand: &Candidate<'_>,
    ) -> Option<Conflict> {
        availability(
            ctx,
            EntityType::Class,
            cand.class_id,
            cand,
            ConflictType::ClassUnavailable,
            ConflictType::ClassRestricted,
        )
    }
}

// ======================== Compatibility ========================

/// Teacher level differs from the class level.
#[derive(Debug, Clone, Copy)]
pub struct LevelMatch;

impl ConflictRule for LevelMatch {
    fn name(&self) -> &'static str {
        "level-match"
    }

    fn check(
        &self,
        ctx: &ConflictContext<'_>,
        _timetable: &Timetable,
        cand: &Candidate<'_>,
    ) -> Option<Conflict> {
        let teacher = ctx.teacher(cand.teacher_id)?;
        let class = ctx.class(cand.class_id)?;
        if teacher.level == class.level {
            return None;
        }
        Some(Conflict::new(
            ConflictType::LevelMismatch,
            cand.cell,
            format!(
                "teacher {} ({}) teaches {} class {}",
                teacher.id, teacher.level, class.level, class.id
            ),
            vec![teacher.id.clone(), class.id.clone()],
        ))
    }
}

/// Teacher branch differs from the subject branch.
#[derive(Debug, Clone, Copy)]
pub struct BranchMatch;

impl ConflictRule for BranchMatch {
    fn name(&self) -> &'static str {
        "branch-match"
    }

    fn check(
        &self,
        ctx: &ConflictContext<'_>,
        _timetable: &Timetable,
        cand: &Candidate<'_>,
    ) -> Option<Conflict> {
        let teacher = ctx.teacher(cand.teacher_id)?;
        let subject = ctx.subject(cand.subject_id)?;
        if same_branch(&teacher.branch, &subject.branch) {
            return None;
        }
        Some(Conflict::new(
            ConflictType::BranchMismatch,
            cand.cell,
            format!(
                "teacher {} ({}) teaches {} ({})",
                teacher.id,
                teacher.branch,
                subject.label(),
                subject.branch
            ),
            vec![teacher.id.clone(), subject.id.clone()],
        ))
    }
}

// ======================== Quota ========================

/// Placing the lesson would exceed the weekly quota of the subject in the class.
#[derive(Debug, Clone, Copy)]
pub struct WeeklyQuota;

impl ConflictRule for WeeklyQuota {
    fn name(&self) -> &'static str {
        "weekly-quota"
    }

    fn check(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &Timetable,
        cand: &Candidate<'_>,
    ) -> Option<Conflict> {
        let quota = ctx.quota(cand.class_id, cand.subject_id)?;
        let placed = timetable
            .lessons()
            .filter(|(at, l)| {
                !cand.skips(*at) && l.class_id == cand.class_id && l.subject_id == cand.subject_id
            })
            .count() as u32;
        if placed < quota {
            return None;
        }
        Some(Conflict::new(
            ConflictType::WeeklyHoursExceeded,
            cand.cell,
            format!(
                "subject {} in class {} exceeds its weekly quota of {quota}",
                cand.subject_id, cand.class_id
            ),
            vec![cand.class_id.to_string(), cand.subject_id.to_string()],
        ))
    }
}

fn daily_count(
    timetable: &Timetable,
    cand: &Candidate<'_>,
    matches: impl Fn(&Lesson) -> bool,
) -> u32 {
    timetable
        .lessons()
        .filter(|(at, l)| !cand.skips(*at) && at.cell.day == cand.cell.day && matches(*l))
        .count() as u32
}

/// Placing the lesson would exceed the teacher's daily cap.
#[derive(Debug, Clone, Copy)]
pub struct TeacherDailyLimit;

impl ConflictRule for TeacherDailyLimit {
    fn name(&self) -> &'static str {
        "teacher-daily-limit"
    }

    fn check(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &Timetable,
        cand: &Candidate<'_>,
    ) -> Option<Conflict> {
        let cap = ctx.rules.max_daily_hours_teacher;
        let placed = daily_count(timetable, cand, |l| l.teacher_id == cand.teacher_id);
        if placed < cap {
            return None;
        }
        Some(Conflict::new(
            ConflictType::DailyHoursExceeded,
            cand.cell,
            format!(
                "teacher {} exceeds {cap} hours on {}",
                cand.teacher_id, cand.cell.day
            ),
            vec![cand.teacher_id.to_string()],
        ))
    }
}

/// Placing the lesson would exceed the class's daily cap.
#[derive(Debug, Clone, Copy)]
pub struct ClassDailyLimit;

impl ConflictRule for ClassDailyLimit {
    fn name(&self) -> &'static str {
        "class-daily-limit"
    }

    fn check(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &Timetable,
        cand: &Candidate<'_>,
    ) -> Option<Conflict> {
        let cap = ctx.rules.max_daily_hours_class;
        let placed = daily_count(timetable, cand, |l| l.class_id == cand.class_id);
        if placed < cap {
            return None;
        }
        Some(Conflict::new(
            ConflictType::DailyHoursExceeded,
            cand.cell,
            format!(
                "class {} exceeds {cap} hours on {}",
                cand.class_id, cand.cell.day
            ),
            vec![cand.class_id.to_string()],
        ))
    }
}

/// The teacher's uninterrupted run through this cell is longer than the cap.
///
/// Runs follow grid order; any cell without a lesson of this teacher,
/// breaks included, ends the run.
#[derive(Debug, Clone, Copy)]
pub struct ConsecutiveLimit;

impl ConsecutiveLimit {
    fn teaches(timetable: &Timetable, cand: &Candidate<'_>, period: Period) -> bool {
        let cell = CellKey::new(cand.cell.day, period);
        timetable
            .lessons_at(cell)
            .any(|(at, l)| !cand.skips(at) && l.teacher_id == cand.teacher_id)
    }
}

impl ConflictRule for ConsecutiveLimit {
    fn name(&self) -> &'static str {
        "consecutive-limit"
    }

    fn check(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &Timetable,
        cand: &Candidate<'_>,
    ) -> Option<Conflict> {
        let cap = ctx.rules.max_consecutive_hours as usize;
        let index = cand.cell.period.index();
        let periods: Vec<Period> = Period::all().collect();

        let before = periods[..index]
            .iter()
            .rev()
            .take_while(|p| Self::teaches(timetable, cand, **p))
            .count();
        let after = periods[index + 1..]
            .iter()
            .take_while(|p| Self::teaches(timetable, cand, **p))
            .count();
        let run = before + 1 + after;
        if run <= cap {
            return None;
        }
        Some(Conflict::new(
            ConflictType::ConsecutiveHoursExceeded,
            cand.cell,
            format!(
                "teacher {} would teach {run} consecutive hours on {} (max {cap})",
                cand.teacher_id, cand.cell.day
            ),
            vec![cand.teacher_id.to_string()],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CellRef, ClassGroup, ConstraintSet, Day, Level, SchedulingRules, Subject, Teacher,
        TimeConstraint,
    };

    fn lesson(n: u8) -> CellKey {
        CellKey::new(Day::Monday, Period::lesson(n).unwrap())
    }

    struct Fixture {
        teachers: Vec<Teacher>,
        classes: Vec<ClassGroup>,
        subjects: Vec<Subject>,
        constraints: ConstraintSet,
        rules: SchedulingRules,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                teachers: vec![
                    Teacher::new("T1", "Mathematics", Level::Primary),
                    Teacher::new("T2", "Music", Level::Middle),
                ],
                classes: vec![
                    ClassGroup::new("5A", Level::Primary),
                    ClassGroup::new("5B", Level::Primary),
                ],
                subjects: vec![
                    Subject::new("MATH", "Mathematics", Level::Primary).with_weekly_hours(2),
                ],
                constraints: ConstraintSet::new(),
                rules: SchedulingRules::default(),
            }
        }

        fn ctx(&self) -> ConflictContext<'_> {
            ConflictContext::new(
                &self.teachers,
                &self.classes,
                &self.subjects,
                &self.constraints,
                &self.rules,
            )
        }

        fn timetable(&self) -> Timetable {
            Timetable::for_teachers(&self.teachers)
        }
    }

    #[test]
    fn test_teacher_double_booking() {
        let fx = Fixture::new();
        let mut tt = fx.timetable();
        tt.place(CellRef::new(0, lesson(1)), "MATH", "5A", "T1").unwrap();

        let cand = Candidate::new("T1", "5B", "MATH", lesson(1));
        let c = TeacherDoubleBooking.check(&fx.ctx(), &tt, &cand).unwrap();
        assert_eq!(c.conflict_type, ConflictType::TeacherDoubleBooking);
        assert!(c.entities.contains(&"5A".to_string()));

        // A lesson does not conflict with itself.
        let placed = Candidate::new("T1", "5A", "MATH", lesson(1)).excluding(CellRef::new(0, lesson(1)));
        assert!(TeacherDoubleBooking.check(&fx.ctx(), &tt, &placed).is_none());
    }

    #[test]
    fn test_class_double_booking_across_rows() {
        let fx = Fixture::new();
        let mut tt = fx.timetable();
        tt.place(CellRef::new(1, lesson(2)), "MUSIC", "5A", "T2").unwrap();

        let cand = Candidate::new("T1", "5A", "MATH", lesson(2));
        assert!(ClassDoubleBooking.check(&fx.ctx(), &tt, &cand).is_some());
        assert!(ClassDoubleBooking
            .check(&fx.ctx(), &tt, &Candidate::new("T1", "5B", "MATH", lesson(2)))
            .is_none());
    }

    #[test]
    fn test_availability_severity() {
        let mut fx = Fixture::new();
        fx.constraints = ConstraintSet::new()
            .with(TimeConstraint::teacher_unavailable("T1", Day::Monday, Period::lesson(1).unwrap()))
            .with(TimeConstraint::new(
                EntityType::Class,
                "5A",
                Day::Monday,
                Period::lesson(2).unwrap(),
                ConstraintType::Restricted,
            ));
        let tt = fx.timetable();

        let c = TeacherAvailability
            .check(&fx.ctx(), &tt, &Candidate::new("T1", "5A", "MATH", lesson(1)))
            .unwrap();
        assert_eq!(c.conflict_type, ConflictType::TeacherUnavailable);
        assert!(c.is_blocking());

        let c = ClassAvailability
            .check(&fx.ctx(), &tt, &Candidate::new("T1", "5A", "MATH", lesson(2)))
            .unwrap();
        assert_eq!(c.conflict_type, ConflictType::ClassRestricted);
        assert!(!c.is_blocking());

        assert!(ClassAvailability
            .check(&fx.ctx(), &tt, &Candidate::new("T1", "5A", "MATH", lesson(3)))
            .is_none());
    }

    #[test]
    fn test_compatibility_warnings() {
        let fx = Fixture::new();
        let tt = fx.timetable();
        let cand = Candidate::new("T2", "5A", "MATH", lesson(1));
        assert_eq!(
            LevelMatch.check(&fx.ctx(), &tt, &cand).unwrap().conflict_type,
            ConflictType::LevelMismatch
        );
        assert_eq!(
            BranchMatch.check(&fx.ctx(), &tt, &cand).unwrap().conflict_type,
            ConflictType::BranchMismatch
        );
        let fit = Candidate::new("T1", "5A", "MATH", lesson(1));
        assert!(LevelMatch.check(&fx.ctx(), &tt, &fit).is_none());
        assert!(BranchMatch.check(&fx.ctx(), &tt, &fit).is_none());
    }

    #[test]
    fn test_weekly_quota() {
        let fx = Fixture::new();
        let mut tt = fx.timetable();
        tt.place(CellRef::new(0, lesson(1)), "MATH", "5A", "T1").unwrap();
        let cand = Candidate::new("T1", "5A", "MATH", lesson(2));
        assert!(WeeklyQuota.check(&fx.ctx(), &tt, &cand).is_none());

        tt.place(CellRef::new(0, lesson(2)), "MATH", "5A", "T1").unwrap();
        let third = Candidate::new("T1", "5A", "MATH", lesson(3));
        assert_eq!(
            WeeklyQuota.check(&fx.ctx(), &tt, &third).unwrap().conflict_type,
            ConflictType::WeeklyHoursExceeded
        );
        // Evaluating one of the two placed lessons stays within quota.
        let placed = Candidate::new("T1", "5A", "MATH", lesson(2)).excluding(CellRef::new(0, lesson(2)));
        assert!(WeeklyQuota.check(&fx.ctx(), &tt, &placed).is_none());
    }

    #[test]
    fn test_daily_limits() {
        let mut fx = Fixture::new();
        fx.rules.max_daily_hours_teacher = 2;
        fx.rules.max_daily_hours_class = 3;
        let mut tt = fx.timetable();
        tt.place(CellRef::new(0, lesson(1)), "MATH", "5A", "T1").unwrap();
        tt.place(CellRef::new(0, lesson(3)), "MATH", "5B", "T1").unwrap();

        let cand = Candidate::new("T1", "5A", "MATH", lesson(7));
        assert!(TeacherDailyLimit.check(&fx.ctx(), &tt, &cand).is_some());
        assert!(ClassDailyLimit.check(&fx.ctx(), &tt, &cand).is_none());

        let tuesday = Candidate::new("T1", "5A", "MATH", CellKey::new(Day::Tuesday, Period::lesson(1).unwrap()));
        assert!(TeacherDailyLimit.check(&fx.ctx(), &tt, &tuesday).is_none());
    }

    #[test]
    fn test_consecutive_limit_stops_at_breaks() {
        let fx = Fixture::new();
        let mut tt = fx.timetable();
        for n in [1, 2, 3] {
            tt.place(CellRef::new(0, lesson(n)), "MATH", "5A", "T1").unwrap();
        }
        let fourth = Candidate::new("T1", "5B", "MATH", lesson(4));
        let c = ConsecutiveLimit.check(&fx.ctx(), &tt, &fourth).unwrap();
        assert_eq!(c.conflict_type, ConflictType::ConsecutiveHoursExceeded);

        // Lessons 8 and 9 are separated by the afternoon break.
        tt.place(CellRef::new(0, lesson(7)), "MATH", "5A", "T1").unwrap();
        tt.place(CellRef::new(0, lesson(8)), "MATH", "5A", "T1").unwrap();
        tt.place(CellRef::new(0, lesson(10)), "MATH", "5A", "T1").unwrap();
        let ninth = Candidate::new("T1", "5B", "MATH", lesson(9));
        assert!(ConsecutiveLimit.check(&fx.ctx(), &tt, &ninth).is_none());
    }
}
