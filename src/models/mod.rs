//! Timetabling domain models.
//!
//! Provides the core data types for school timetabling: the canonical
//! week domain, school entities, availability constraints, subject-teacher
//! mappings and the schedule representation.
//!
//! # Domain Mappings
//!
//! | u-timetable | Meaning |
//! |-------------|---------|
//! | Teacher | holds one schedule row |
//! | ClassGroup | receives lessons; its view is derived |
//! | Subject | what is taught, with a default weekly quota |
//! | SubjectTeacherMapping | (class, subject) → teacher + quota |
//! | Timetable | all schedule rows of one run |

mod calendar;
mod constraint;
mod mapping;
mod resource;
mod schedule;

pub use calendar::{
    CellKey, Day, FixedPeriod, Level, Period, CELLS_PER_WEEK, DAY_COUNT, LESSON_COUNT,
    PERIOD_COUNT,
};
pub use constraint::{ConstraintSet, ConstraintType, EntityType, SchedulingRules, TimeConstraint};
pub use mapping::{Priority, SubjectSelection, SubjectTeacherMapping};
pub use resource::{same_branch, ClassGroup, Subject, Teacher};
pub use schedule::{
    CellRef, Lesson, Schedule, ScheduleRow, Slot, Timetable, WeekGrid, FIXED_CLASS_ID,
};
