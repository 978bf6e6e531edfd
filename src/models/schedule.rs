//! Schedule (solution) model.
//!
//! The working representation is a [`Timetable`]: a flat, owned slot array
//! indexed by schedule-row × day × period, one row per teacher schedule.
//! Rows are stamped with their fixed periods when created and fixed cells
//! are never overwritten.
//!
//! Persisted records are [`Schedule`]s, one per row, whose [`WeekGrid`] is
//! fully keyed over the canonical day and period domain. A class view is
//! derived by filtering lessons across all rows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{CellKey, Day, FixedPeriod, Level, Period, Teacher, CELLS_PER_WEEK};
use crate::error::{Result, TimetableError};

/// Class id carried by fixed-period sentinel slots.
pub const FIXED_CLASS_ID: &str = "fixed-period";

/// A placed lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    pub subject_id: String,
    pub class_id: String,
    pub teacher_id: String,
    /// Placement order starting at 1; lower was placed earlier. 0 means unknown.
    pub sequence: u64,
}

/// Content of a grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SlotRecord", into = "SlotRecord")]
pub enum Slot {
    Fixed(FixedPeriod),
    Lesson(Lesson),
}

/// Persisted slot form: `{subjectId, classId, teacherId?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotRecord {
    subject_id: String,
    class_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    teacher_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sequence: Option<u64>,
}

impl Slot {
    /// The lesson, if this is not a fixed period.
    pub fn as_lesson(&self) -> Option<&Lesson> {
        match self {
            Slot::Lesson(l) => Some(l),
            Slot::Fixed(_) => None,
        }
    }

    /// Whether this slot is a fixed period.
    pub fn is_fixed(&self) -> bool {
        matches!(self, Slot::Fixed(_))
    }

    /// Subject id as persisted (sentinel id for fixed periods).
    pub fn subject_id(&self) -> &str {
        match self {
            Slot::Fixed(f) => f.subject_id(),
            Slot::Lesson(l) => &l.subject_id,
        }
    }

    /// Class id as persisted ([`FIXED_CLASS_ID`] for fixed periods).
    pub fn class_id(&self) -> &str {
        match self {
            Slot::Fixed(_) => FIXED_CLASS_ID,
            Slot::Lesson(l) => &l.class_id,
        }
    }
}

impl TryFrom<SlotRecord> for Slot {
    type Error = TimetableError;

    fn try_from(r: SlotRecord) -> std::result::Result<Self, Self::Error> {
        if r.class_id == FIXED_CLASS_ID {
            return FixedPeriod::from_subject_id(&r.subject_id).map(Slot::Fixed);
        }
        Ok(Slot::Lesson(Lesson {
            subject_id: r.subject_id,
            class_id: r.class_id,
            teacher_id: r.teacher_id.unwrap_or_default(),
            sequence: r.sequence.unwrap_or(0),
        }))
    }
}

impl From<Slot> for SlotRecord {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Fixed(f) => SlotRecord {
                subject_id: f.subject_id().to_string(),
                class_id: FIXED_CLASS_ID.to_string(),
                teacher_id: None,
                sequence: None,
            },
            Slot::Lesson(l) => SlotRecord {
                subject_id: l.subject_id,
                class_id: l.class_id,
                teacher_id: (!l.teacher_id.is_empty()).then_some(l.teacher_id),
                sequence: Some(l.sequence),
            },
        }
    }
}

/// A fully keyed week grid: every (day, period) cell exists, empty or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridRecord", into = "GridRecord")]
pub struct WeekGrid {
    cells: Vec<Option<Slot>>,
}

type GridRecord = BTreeMap<Day, BTreeMap<Period, Option<Slot>>>;

impl WeekGrid {
    /// Creates an empty grid.
    pub fn new() -> Self {
        Self {
            cells: vec![None; CELLS_PER_WEEK],
        }
    }

    /// Creates a grid with the fixed periods of `level` stamped on every day.
    pub fn stamped(level: Level) -> Self {
        let mut grid = Self::new();
        grid.stamp_fixed(level);
        grid
    }

    /// Stamps the fixed periods of `level` on every day.
    pub fn stamp_fixed(&mut self, level: Level) {
        for day in Day::ALL {
            for (period, fixed) in level.fixed_periods() {
                self.cells[CellKey::new(day, period).index()] = Some(Slot::Fixed(fixed));
            }
        }
    }

    /// Slot at `cell`.
    pub fn get(&self, cell: CellKey) -> Option<&Slot> {
        self.cells[cell.index()].as_ref()
    }

    /// Overwrites `cell`.
    pub fn set(&mut self, cell: CellKey, slot: Option<Slot>) {
        self.cells[cell.index()] = slot;
    }

    /// Lesson at `cell`, if any.
    pub fn lesson(&self, cell: CellKey) -> Option<&Lesson> {
        self.get(cell).and_then(Slot::as_lesson)
    }

    /// All lessons with their cells, day-major.
    pub fn lessons(&self) -> impl Iterator<Item = (CellKey, &Lesson)> + '_ {
        self.cells.iter().enumerate().filter_map(|(i, s)| {
            let lesson = s.as_ref()?.as_lesson()?;
            CellKey::from_index(i).map(|c| (c, lesson))
        })
    }

    /// Number of lessons.
    pub fn lesson_count(&self) -> usize {
        self.lessons().count()
    }
}

impl Default for WeekGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<GridRecord> for WeekGrid {
    type Error = TimetableError;

    fn try_from(record: GridRecord) -> std::result::Result<Self, Self::Error> {
        let mut grid = WeekGrid::new();
        for (day, periods) in record {
            for (period, slot) in periods {
                grid.set(CellKey::new(day, period), slot);
            }
        }
        Ok(grid)
    }
}

impl From<WeekGrid> for GridRecord {
    fn from(grid: WeekGrid) -> Self {
        let mut record = GridRecord::new();
        for (i, slot) in grid.cells.into_iter().enumerate() {
            if let Some(cell) = CellKey::from_index(i) {
                record
                    .entry(cell.day)
                    .or_default()
                    .insert(cell.period, slot);
            }
        }
        record
    }
}

/// A persisted teacher schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub teacher_id: String,
    pub grid: WeekGrid,
}

/// Owner of one timetable row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub schedule_id: String,
    pub teacher_id: String,
    pub level: Level,
}

/// Address of a cell in a [`Timetable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: usize,
    pub cell: CellKey,
}

impl CellRef {
    pub fn new(row: usize, cell: CellKey) -> Self {
        Self { row, cell }
    }
}

/// The in-memory schedule set for one generation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timetable {
    rows: Vec<ScheduleRow>,
    cells: Vec<Option<Slot>>,
    /// Last issued sequence; placement sequences start at 1.
    next_sequence: u64,
}

impl Timetable {
    /// Creates an empty timetable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates one stamped row per teacher.
    pub fn for_teachers(teachers: &[Teacher]) -> Self {
        let mut tt = Self::new();
        for t in teachers {
            tt.add_row(format!("schedule-{}", t.id), &t.id, t.level);
        }
        tt
    }

    /// Appends a row stamped with the fixed periods of `level`.
    pub fn add_row(
        &mut self,
        schedule_id: impl Into<String>,
        teacher_id: impl Into<String>,
        level: Level,
    ) -> usize {
        let row = self.rows.len();
        self.rows.push(ScheduleRow {
            schedule_id: schedule_id.into(),
            teacher_id: teacher_id.into(),
            level,
        });
        self.cells.extend(WeekGrid::stamped(level).cells);
        row
    }

    /// Row owners.
    pub fn rows(&self) -> &[ScheduleRow] {
        &self.rows
    }

    /// First row owned by `teacher_id`.
    pub fn row_for_teacher(&self, teacher_id: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.teacher_id == teacher_id)
    }

    #[inline]
    fn offset(&self, at: CellRef) -> usize {
        at.row * CELLS_PER_WEEK + at.cell.index()
    }

    /// Slot at `at`. Out-of-range rows read as empty.
    pub fn slot(&self, at: CellRef) -> Option<&Slot> {
        if at.row >= self.rows.len() {
            return None;
        }
        self.cells[self.offset(at)].as_ref()
    }

    /// Lesson at `at`.
    pub fn lesson(&self, at: CellRef) -> Option<&Lesson> {
        self.slot(at).and_then(Slot::as_lesson)
    }

    /// Whether `at` is an empty lesson cell of an existing row.
    pub fn is_open(&self, at: CellRef) -> bool {
        at.row < self.rows.len() && at.cell.period.is_lesson() && self.slot(at).is_none()
    }

    /// Places a new lesson and returns its sequence number.
    ///
    /// # Errors
    ///
    /// [`TimetableError::CellUnavailable`] when the cell is not open and
    /// [`TimetableError::SequenceOverflow`] once the sequence space is used up.
    pub fn place(
        &mut self,
        at: CellRef,
        subject_id: impl Into<String>,
        class_id: impl Into<String>,
        teacher_id: impl Into<String>,
    ) -> Result<u64> {
        let sequence = self
            .next_sequence
            .checked_add(1)
            .ok_or(TimetableError::SequenceOverflow)?;
        self.insert_lesson(
            at,
            Lesson {
                subject_id: subject_id.into(),
                class_id: class_id.into(),
                teacher_id: teacher_id.into(),
                sequence,
            },
        )?;
        Ok(sequence)
    }

    /// Inserts an existing lesson (keeping its sequence) into an open cell.
    pub fn insert_lesson(&mut self, at: CellRef, lesson: Lesson) -> Result<()> {
        if !self.is_open(at) {
            return Err(TimetableError::CellUnavailable {
                day: at.cell.day,
                period: at.cell.period,
            });
        }
        self.next_sequence = self.next_sequence.max(lesson.sequence);
        let offset = self.offset(at);
        self.cells[offset] = Some(Slot::Lesson(lesson));
        Ok(())
    }

    /// Removes and returns the lesson at `at`. Fixed periods are untouched.
    pub fn remove(&mut self, at: CellRef) -> Option<Lesson> {
        if self.lesson(at).is_none() {
            return None;
        }
        let offset = self.offset(at);
        match self.cells[offset].take() {
            Some(Slot::Lesson(l)) => Some(l),
            other => {
                self.cells[offset] = other;
                None
            }
        }
    }

    /// Every lesson with its address, row-major.
    pub fn lessons(&self) -> impl Iterator<Item = (CellRef, &Lesson)> + '_ {
        self.cells.iter().enumerate().filter_map(|(i, s)| {
            let lesson = s.as_ref()?.as_lesson()?;
            let cell = CellKey::from_index(i % CELLS_PER_WEEK)?;
            Some((CellRef::new(i / CELLS_PER_WEEK, cell), lesson))
        })
    }

    /// Lessons at one (day, period) across all rows.
    pub fn lessons_at(&self, cell: CellKey) -> impl Iterator<Item = (CellRef, &Lesson)> + '_ {
        (0..self.rows.len()).filter_map(move |row| {
            let at = CellRef::new(row, cell);
            self.lesson(at).map(|l| (at, l))
        })
    }

    /// Number of lessons.
    pub fn lesson_count(&self) -> usize {
        self.lessons().count()
    }

    /// Copy of one row as a grid.
    pub fn row_grid(&self, row: usize) -> WeekGrid {
        let start = row * CELLS_PER_WEEK;
        WeekGrid {
            cells: self.cells[start..start + CELLS_PER_WEEK].to_vec(),
        }
    }

    /// Replaces the lessons of a row with those of `grid`.
    ///
    /// The row keeps its own fixed periods; lessons of `grid` landing on a
    /// fixed cell are rejected.
    pub fn replace_row_lessons(&mut self, row: usize, grid: &WeekGrid) -> Result<()> {
        for cell in CellKey::lessons() {
            self.remove(CellRef::new(row, cell));
        }
        for (cell, lesson) in grid.lessons() {
            let mut lesson = lesson.clone();
            if lesson.teacher_id.is_empty() {
                lesson.teacher_id = self.rows[row].teacher_id.clone();
            }
            self.insert_lesson(CellRef::new(row, cell), lesson)?;
        }
        Ok(())
    }

    /// Removes every lesson of `class_id`; returns how many were removed.
    pub fn remove_class_lessons(&mut self, class_id: &str) -> usize {
        let targets: Vec<CellRef> = self
            .lessons()
            .filter(|(_, l)| l.class_id == class_id)
            .map(|(at, _)| at)
            .collect();
        targets.iter().filter(|at| self.remove(**at).is_some()).count()
    }

    /// Derived class view: the class level's fixed periods plus every lesson
    /// of `class_id` across all rows. On a double-booked cell the earliest
    /// placed lesson is shown.
    pub fn class_view(&self, class_id: &str, level: Level) -> WeekGrid {
        let mut grid = WeekGrid::stamped(level);
        let mut lessons: Vec<(CellRef, &Lesson)> =
            self.lessons().filter(|(_, l)| l.class_id == class_id).collect();
        lessons.sort_by_key(|(_, l)| l.sequence);
        for (at, lesson) in lessons {
            if grid.get(at.cell).is_none() {
                grid.set(at.cell, Some(Slot::Lesson(lesson.clone())));
            }
        }
        grid
    }

    /// Persistable records, one per row.
    pub fn to_schedules(&self) -> Vec<Schedule> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, r)| Schedule {
                id: r.schedule_id.clone(),
                teacher_id: r.teacher_id.clone(),
                grid: self.row_grid(i),
            })
            .collect()
    }

    /// Rebuilds a timetable from persisted records.
    ///
    /// Rows are re-stamped from the owning teacher's level; a lesson stored
    /// on a fixed cell is an error. Lessons without a sequence keep their
    /// grid order after the highest stored sequence.
    ///
    /// # Errors
    ///
    /// [`TimetableError::SequenceOverflow`] when an unsequenced lesson cannot
    /// be numbered past the highest stored sequence.
    pub fn from_schedules(schedules: &[Schedule], teachers: &[Teacher]) -> Result<Self> {
        let mut tt = Self::new();
        let mut fallback_sequence = schedules
            .iter()
            .flat_map(|s| s.grid.lessons().map(|(_, l)| l.sequence))
            .max()
            .map_or(Some(1), |m| m.checked_add(1));

        for schedule in schedules {
            let teacher = teachers
                .iter()
                .find(|t| t.id == schedule.teacher_id)
                .ok_or_else(|| TimetableError::unknown("teacher", &schedule.teacher_id))?;
            let row = tt.add_row(&schedule.id, &schedule.teacher_id, teacher.level);
            for (cell, lesson) in schedule.grid.lessons() {
                let mut lesson = lesson.clone();
                if lesson.teacher_id.is_empty() {
                    lesson.teacher_id = schedule.teacher_id.clone();
                }
                if lesson.sequence == 0 {
                    let next = fallback_sequence.ok_or(TimetableError::SequenceOverflow)?;
                    lesson.sequence = next;
                    fallback_sequence = next.checked_add(1);
                }
                tt.insert_lesson(CellRef::new(row, cell), lesson)?;
            }
        }
        Ok(tt)
    }
}
