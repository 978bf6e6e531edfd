//! Time availability constraints and the global rule set.
//!
//! A [`TimeConstraint`] marks one (entity, day, period) cell as preferred,
//! restricted or unavailable. Unmarked cells are implicitly preferred.
//! [`ConstraintSet`] indexes the records for O(1) lookup by the detector.
//!
//! [`SchedulingRules`] holds the school-wide caps and soft preferences.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{CellKey, Day, Period};

/// The kind of entity a constraint applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Teacher,
    Class,
    Subject,
}

/// Availability of a cell for an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintType {
    /// No blocking effect (implicit default).
    #[default]
    Preferred,
    /// Placement allowed but reported as a warning.
    Restricted,
    /// Placement is a blocking error.
    Unavailable,
}

/// A single availability record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeConstraint {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub day: Day,
    pub period: Period,
    pub constraint_type: ConstraintType,
}

impl TimeConstraint {
    /// Creates a constraint record.
    pub fn new(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        day: Day,
        period: Period,
        constraint_type: ConstraintType,
    ) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
            day,
            period,
            constraint_type,
        }
    }

    /// Marks a teacher unavailable.
    pub fn teacher_unavailable(teacher_id: impl Into<String>, day: Day, period: Period) -> Self {
        Self::new(
            EntityType::Teacher,
            teacher_id,
            day,
            period,
            ConstraintType::Unavailable,
        )
    }

    /// Marks a class unavailable.
    pub fn class_unavailable(class_id: impl Into<String>, day: Day, period: Period) -> Self {
        Self::new(
            EntityType::Class,
            class_id,
            day,
            period,
            ConstraintType::Unavailable,
        )
    }

    /// The cell this record refers to.
    pub fn cell(&self) -> CellKey {
        CellKey::new(self.day, self.period)
    }
}

/// Indexed collection of time constraints.
///
/// Later records for the same cell override earlier ones. Recording a
/// `Preferred` cell removes any stored entry, since it is the default.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    entries: HashMap<(EntityType, String, CellKey), ConstraintType>,
}

impl ConstraintSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from records.
    pub fn from_records(records: &[TimeConstraint]) -> Self {
        let mut set = Self::new();
        for r in records {
            set.insert(r);
        }
        set
    }

    /// Adds a record.
    pub fn insert(&mut self, record: &TimeConstraint) {
        let key = (record.entity_type, record.entity_id.clone(), record.cell());
        if record.constraint_type == ConstraintType::Preferred {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, record.constraint_type);
        }
    }

    /// Builder-style [`ConstraintSet::insert`].
    pub fn with(mut self, record: TimeConstraint) -> Self {
        self.insert(&record);
        self
    }

    /// Availability of `cell` for an entity (`Preferred` if unmarked).
    pub fn lookup(&self, entity_type: EntityType, entity_id: &str, cell: CellKey) -> ConstraintType {
        self.entries
            .get(&(entity_type, entity_id.to_string(), cell))
            .copied()
            .unwrap_or_default()
    }

    /// Number of non-default entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no cell is restricted or unavailable.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// School-wide caps and soft preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulingRules {
    /// Maximum lessons per teacher per day.
    pub max_daily_hours_teacher: u32,
    /// Maximum lessons per class per day.
    pub max_daily_hours_class: u32,
    /// Maximum back-to-back lessons for a teacher.
    pub max_consecutive_hours: u32,
    /// Prefer not to schedule the same subject twice in a row for a class.
    pub avoid_consecutive_same_subject: bool,
    /// Prefer lessons 1..=4.
    pub prefer_morning_hours: bool,
    /// Prefer not to use the first and last lesson.
    pub avoid_first_last_period: bool,
    /// Accepted for compatibility; lunch is always reserved.
    pub lunch_break_required: bool,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            max_daily_hours_teacher: 8,
            max_daily_hours_class: 8,
            max_consecutive_hours: 3,
            avoid_consecutive_same_subject: true,
            prefer_morning_hours: false,
            avoid_first_last_period: false,
            lunch_break_required: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u8) -> Period {
        Period::lesson(n).unwrap()
    }

    #[test]
    fn test_lookup_defaults_to_preferred() {
        let set = ConstraintSet::new();
        let cell = CellKey::new(Day::Monday, p(1));
        assert_eq!(set.lookup(EntityType::Teacher, "T1", cell), ConstraintType::Preferred);
        assert!(set.is_empty());
    }

    #[test]
    fn test_lookup_is_entity_scoped() {
        let set = ConstraintSet::new()
            .with(TimeConstraint::teacher_unavailable("T1", Day::Monday, p(1)))
            .with(TimeConstraint::new(
                EntityType::Class,
                "5A",
                Day::Monday,
                p(2),
                ConstraintType::Restricted,
            ));

        let mon1 = CellKey::new(Day::Monday, p(1));
        let mon2 = CellKey::new(Day::Monday, p(2));
        assert_eq!(set.lookup(EntityType::Teacher, "T1", mon1), ConstraintType::Unavailable);
        assert_eq!(set.lookup(EntityType::Teacher, "T2", mon1), ConstraintType::Preferred);
        assert_eq!(set.lookup(EntityType::Class, "T1", mon1), ConstraintType::Preferred);
        assert_eq!(set.lookup(EntityType::Class, "5A", mon2), ConstraintType::Restricted);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_preferred_record_clears_entry() {
        let set = ConstraintSet::new()
            .with(TimeConstraint::teacher_unavailable("T1", Day::Friday, p(3)))
            .with(TimeConstraint::new(
                EntityType::Teacher,
                "T1",
                Day::Friday,
                p(3),
                ConstraintType::Preferred,
            ));
        assert!(set.is_empty());
    }

    #[test]
    fn test_record_json_rejects_unknown_period() {
        let ok = r#"{"entityType":"teacher","entityId":"T1","day":"Monday","period":"4","constraintType":"unavailable"}"#;
        let c: TimeConstraint = serde_json::from_str(ok).unwrap();
        assert_eq!(c.constraint_type, ConstraintType::Unavailable);

        let bad = r#"{"entityType":"teacher","entityId":"T1","day":"Monday","period":"12","constraintType":"unavailable"}"#;
        assert!(serde_json::from_str::<TimeConstraint>(bad).is_err());
    }

    #[test]
    fn test_rules_defaults() {
        let rules: SchedulingRules = serde_json::from_str("{}").unwrap();
        assert_eq!(rules.max_daily_hours_teacher, 8);
        assert_eq!(rules.max_consecutive_hours, 3);
        assert!(rules.lunch_break_required);
    }
}
