//! Weekly calendar domain.
//!
//! A school week is the product of five [`Day`]s and thirteen [`Period`]s.
//! Ten periods are lessons (`"1"`..`"10"`); the rest are non-teaching
//! breaks. Keys are validated once at construction, so downstream code never
//! sees an unknown day or period.
//!
//! # Grid order
//!
//! | Index | Key | Kind |
//! |-------|-----|------|
//! | 0 | `prep` | fixed |
//! | 1 | `breakfast` | fixed (Middle level only) |
//! | 2..=9 | `1`..`8` | lessons |
//! | 10 | `afternoon-breakfast` | fixed |
//! | 11..=12 | `9`, `10` | lessons |
//!
//! The lunch period is a lesson index reserved per [`Level`]: see
//! [`Level::lunch_period`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TimetableError;

/// Number of school days per week.
pub const DAY_COUNT: usize = 5;
/// Number of grid periods per day (lessons and fixed breaks).
pub const PERIOD_COUNT: usize = 13;
/// Number of lesson periods per day.
pub const LESSON_COUNT: usize = 10;
/// Number of cells in a week grid.
pub const CELLS_PER_WEEK: usize = DAY_COUNT * PERIOD_COUNT;

const PERIOD_KEYS: [&str; PERIOD_COUNT] = [
    "prep",
    "breakfast",
    "1",
    "2",
    "3",
    "4",
    "5",
    "6",
    "7",
    "8",
    "afternoon-breakfast",
    "9",
    "10",
];

/// A school day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Day {
    /// All days in canonical order.
    pub const ALL: [Day; DAY_COUNT] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    /// Zero-based position in the week.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical day name.
    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Day {
    type Err = TimetableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Day::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(key))
            .ok_or_else(|| TimetableError::UnknownDay(s.to_string()))
    }
}

impl TryFrom<String> for Day {
    type Error = TimetableError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Day> for String {
    fn from(day: Day) -> Self {
        day.name().to_string()
    }
}

/// A period key within a day.
///
/// Wraps the grid index; construct through [`Period::lesson`], the
/// associated constants, or parsing a key string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Period(u8);

impl Period {
    /// Morning preparation.
    pub const PREP: Period = Period(0);
    /// Breakfast break (stamped for Middle level only).
    pub const BREAKFAST: Period = Period(1);
    /// Afternoon break after the 8th lesson.
    pub const AFTERNOON_BREAKFAST: Period = Period(10);

    /// Returns the period for a lesson number (1..=10).
    pub fn lesson(number: u8) -> Option<Period> {
        match number {
            1..=8 => Some(Period(number + 1)),
            9 | 10 => Some(Period(number + 2)),
            _ => None,
        }
    }

    /// All periods in grid order.
    pub fn all() -> impl Iterator<Item = Period> {
        (0..PERIOD_COUNT as u8).map(Period)
    }

    /// Lesson periods in grid order.
    pub fn lessons() -> impl Iterator<Item = Period> {
        Self::all().filter(|p| p.is_lesson())
    }

    /// Zero-based grid index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Canonical key (`"prep"`, `"1"`, ...).
    pub fn key(self) -> &'static str {
        PERIOD_KEYS[self.index()]
    }

    /// Lesson number (1..=10), or `None` for breaks.
    pub fn lesson_number(self) -> Option<u8> {
        match self.0 {
            2..=9 => Some(self.0 - 1),
            11 | 12 => Some(self.0 - 2),
            _ => None,
        }
    }

    /// Whether a subject can ever be taught in this period.
    #[inline]
    pub fn is_lesson(self) -> bool {
        self.lesson_number().is_some()
    }

    /// Lessons 1..=4 count as morning hours.
    pub fn is_morning(self) -> bool {
        matches!(self.lesson_number(), Some(n) if n <= 4)
    }

    /// First or last lesson of the day.
    pub fn is_edge_lesson(self) -> bool {
        matches!(self.lesson_number(), Some(1) | Some(10))
    }

    /// Previous lesson by number (skips breaks).
    pub fn previous_lesson(self) -> Option<Period> {
        self.lesson_number()
            .and_then(|n| n.checked_sub(1))
            .and_then(Period::lesson)
    }

    /// Next lesson by number (skips breaks).
    pub fn next_lesson(self) -> Option<Period> {
        self.lesson_number().and_then(|n| Period::lesson(n + 1))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Period {
    type Err = TimetableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        PERIOD_KEYS
            .iter()
            .position(|k| k.eq_ignore_ascii_case(key))
            .map(|i| Period(i as u8))
            .ok_or_else(|| TimetableError::UnknownPeriod(s.to_string()))
    }
}

impl TryFrom<String> for Period {
    type Error = TimetableError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.key().to_string()
    }
}

/// School level of a teacher, class or subject.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Kindergarten,
    Primary,
    Middle,
}

impl Level {
    /// The lesson period reserved for lunch at this level.
    ///
    /// This is the single source of the lunch rule: lesson 5 for
    /// Kindergarten and Primary, lesson 6 for Middle.
    pub fn lunch_period(self) -> Period {
        match self {
            Level::Kindergarten | Level::Primary => Period(6),
            Level::Middle => Period(7),
        }
    }

    /// Fixed periods stamped on every day for this level, in grid order.
    pub fn fixed_periods(self) -> Vec<(Period, FixedPeriod)> {
        let mut fixed = vec![(Period::PREP, FixedPeriod::Prep)];
        if self == Level::Middle {
            fixed.push((Period::BREAKFAST, FixedPeriod::Breakfast));
        }
        fixed.push((self.lunch_period(), FixedPeriod::Lunch));
        fixed.push((Period::AFTERNOON_BREAKFAST, FixedPeriod::AfternoonBreakfast));
        fixed
    }

    /// The fixed period occupying `period` at this level, if any.
    pub fn fixed_at(self, period: Period) -> Option<FixedPeriod> {
        self.fixed_periods()
            .into_iter()
            .find(|(p, _)| *p == period)
            .map(|(_, f)| f)
    }

    /// Whether a lesson may be placed in `period` at this level.
    pub fn is_teachable(self, period: Period) -> bool {
        period.is_lesson() && period != self.lunch_period()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Kindergarten => "Kindergarten",
            Level::Primary => "Primary",
            Level::Middle => "Middle",
        };
        f.write_str(name)
    }
}

/// A non-teaching grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixedPeriod {
    Prep,
    Breakfast,
    Lunch,
    AfternoonBreakfast,
}

impl FixedPeriod {
    /// Sentinel subject id used in persisted slots.
    pub fn subject_id(self) -> &'static str {
        match self {
            FixedPeriod::Prep => "fixed-prep",
            FixedPeriod::Breakfast => "fixed-breakfast",
            FixedPeriod::Lunch => "fixed-lunch",
            FixedPeriod::AfternoonBreakfast => "fixed-afternoon-breakfast",
        }
    }

    /// Parses a sentinel subject id.
    pub fn from_subject_id(id: &str) -> Result<Self, TimetableError> {
        match id {
            "fixed-prep" => Ok(FixedPeriod::Prep),
            "fixed-breakfast" => Ok(FixedPeriod::Breakfast),
            "fixed-lunch" => Ok(FixedPeriod::Lunch),
            "fixed-afternoon-breakfast" => Ok(FixedPeriod::AfternoonBreakfast),
            other => Err(TimetableError::UnknownFixedPeriod(other.to_string())),
        }
    }
}

/// A (day, period) coordinate in the week grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellKey {
    pub day: Day,
    pub period: Period,
}

impl CellKey {
    /// Creates a cell key.
    pub fn new(day: Day, period: Period) -> Self {
        Self { day, period }
    }

    /// Parses day and period keys.
    pub fn parse(day: &str, period: &str) -> Result<Self, TimetableError> {
        Ok(Self::new(day.parse()?, period.parse()?))
    }

    /// Flat index into a week grid.
    #[inline]
    pub fn index(self) -> usize {
        self.day.index() * PERIOD_COUNT + self.period.index()
    }

    /// Inverse of [`CellKey::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= CELLS_PER_WEEK {
            return None;
        }
        Some(Self::new(
            Day::ALL[index / PERIOD_COUNT],
            Period((index % PERIOD_COUNT) as u8),
        ))
    }

    /// Every cell of the week, day-major.
    pub fn all() -> impl Iterator<Item = CellKey> {
        Day::ALL
            .into_iter()
            .flat_map(|d| Period::all().map(move |p| CellKey::new(d, p)))
    }

    /// Every lesson cell of the week, day-major.
    pub fn lessons() -> impl Iterator<Item = CellKey> {
        Self::all().filter(|c| c.period.is_lesson())
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.day, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_order_and_keys() {
        let keys: Vec<&str> = Period::all().map(|p| p.key()).collect();
        assert_eq!(keys, PERIOD_KEYS.to_vec());
        assert_eq!(Period::lessons().count(), LESSON_COUNT);
        assert_eq!(Period::lesson(8).unwrap().next_lesson(), Period::lesson(9));
        assert!(Period::AFTERNOON_BREAKFAST > Period::lesson(8).unwrap());
        assert!(Period::AFTERNOON_BREAKFAST < Period::lesson(9).unwrap());
    }

    #[test]
    fn test_lesson_numbers() {
        for n in 1..=10u8 {
            let p = Period::lesson(n).unwrap();
            assert_eq!(p.lesson_number(), Some(n));
            assert_eq!(p.key(), n.to_string());
        }
        assert!(Period::lesson(0).is_none());
        assert!(Period::lesson(11).is_none());
        assert!(!Period::PREP.is_lesson());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert_eq!("monday".parse::<Day>().unwrap(), Day::Monday);
        assert!("Saturday".parse::<Day>().is_err());
        assert_eq!("afternoon-breakfast".parse::<Period>().unwrap(), Period::AFTERNOON_BREAKFAST);
        assert!("11".parse::<Period>().is_err());
        assert!(CellKey::parse("Friday", "lunch").is_err());
    }

    #[test]
    fn test_lunch_period_by_level() {
        assert_eq!(Level::Kindergarten.lunch_period().key(), "5");
        assert_eq!(Level::Primary.lunch_period().key(), "5");
        assert_eq!(Level::Middle.lunch_period().key(), "6");
        assert!(!Level::Primary.is_teachable(Period::lesson(5).unwrap()));
        assert!(Level::Middle.is_teachable(Period::lesson(5).unwrap()));
    }

    #[test]
    fn test_fixed_periods_by_level() {
        let primary = Level::Primary.fixed_periods();
        assert_eq!(primary.len(), 3);
        assert!(Level::Primary.fixed_at(Period::BREAKFAST).is_none());

        let middle = Level::Middle.fixed_periods();
        assert_eq!(middle.len(), 4);
        assert_eq!(Level::Middle.fixed_at(Period::BREAKFAST), Some(FixedPeriod::Breakfast));
        assert_eq!(
            Level::Middle.fixed_at(Period::lesson(6).unwrap()),
            Some(FixedPeriod::Lunch)
        );
    }

    #[test]
    fn test_cell_index_roundtrip() {
        assert_eq!(CellKey::all().count(), CELLS_PER_WEEK);
        for (i, cell) in CellKey::all().enumerate() {
            assert_eq!(cell.index(), i);
            assert_eq!(CellKey::from_index(i), Some(cell));
        }
        assert!(CellKey::from_index(CELLS_PER_WEEK).is_none());
    }

    #[test]
    fn test_serde_keys() {
        let cell = CellKey::new(Day::Wednesday, Period::lesson(3).unwrap());
        let json = serde_json::to_string(&cell).unwrap();
        assert_eq!(json, r#"{"day":"Wednesday","period":"3"}"#);
        let back: CellKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cell);
        assert!(serde_json::from_str::<CellKey>(r#"{"day":"Sunday","period":"3"}"#).is_err());
    }
}
