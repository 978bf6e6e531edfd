//! Weekly hour trackers.
//!
//! One [`WeeklyHourTracker`] per (subject, class) mirrors a mapping's quota
//! while placement is searched. Trackers never exceed their target:
//! [`HourTracker::assign_hour`] refuses instead.
//!
//! # Search order
//!
//! [`HourTracker::sorted`] orders trackers for priority-driven searches:
//! incomplete before completed, then `High > Medium > Low`, then fewest
//! remaining hours first, so nearly finished subjects are not starved at
//! the end of a run.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{Result, TimetableError};
use crate::models::{CellKey, Priority, SubjectTeacherMapping, Timetable};

/// Quota counter for one (subject, class) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyHourTracker {
    pub subject_id: String,
    pub class_id: String,
    pub target_hours: u32,
    pub assigned_hours: u32,
    pub remaining_hours: u32,
    pub is_completed: bool,
    pub priority: Priority,
    /// Cell of the most recent assignment.
    pub last_assigned: Option<CellKey>,
}

impl WeeklyHourTracker {
    /// Creates an empty tracker.
    pub fn new(
        subject_id: impl Into<String>,
        class_id: impl Into<String>,
        target_hours: u32,
        priority: Priority,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            class_id: class_id.into(),
            target_hours,
            assigned_hours: 0,
            remaining_hours: target_hours,
            is_completed: target_hours == 0,
            priority,
            last_assigned: None,
        }
    }

    fn refresh(&mut self) {
        self.remaining_hours = self.target_hours.saturating_sub(self.assigned_hours);
        self.is_completed = self.assigned_hours >= self.target_hours;
    }
}

/// Search order: incomplete first, then priority, then fewest remaining.
pub fn tracker_order(a: &WeeklyHourTracker, b: &WeeklyHourTracker) -> Ordering {
    a.is_completed
        .cmp(&b.is_completed)
        .then(a.priority.cmp(&b.priority))
        .then(a.remaining_hours.cmp(&b.remaining_hours))
}

/// All trackers of a generation run.
#[derive(Debug, Clone, Default)]
pub struct HourTracker {
    trackers: Vec<WeeklyHourTracker>,
    index: HashMap<(String, String), usize>,
}

impl HourTracker {
    /// Creates an empty tracker set.
    pub fn new() -> Self {
        Self::default()
    }

    /// One tracker per valid mapping, targeting the mapping's quota.
    pub fn from_mappings(mappings: &[SubjectTeacherMapping]) -> Self {
        let mut tracker = Self::new();
        for m in mappings.iter().filter(|m| m.is_valid) {
            tracker.register(&m.subject_id, &m.class_id, m.weekly_hours, m.priority);
        }
        tracker
    }

    /// Adds (or resets) the tracker for a pair.
    pub fn register(
        &mut self,
        subject_id: &str,
        class_id: &str,
        target_hours: u32,
        priority: Priority,
    ) {
        let t = WeeklyHourTracker::new(subject_id, class_id, target_hours, priority);
        let key = (subject_id.to_string(), class_id.to_string());
        match self.index.get(&key) {
            Some(&i) => self.trackers[i] = t,
            None => {
                self.index.insert(key, self.trackers.len());
                self.trackers.push(t);
            }
        }
    }

    /// Tracker for a pair.
    pub fn get(&self, subject_id: &str, class_id: &str) -> Option<&WeeklyHourTracker> {
        self.position(subject_id, class_id).map(|i| &self.trackers[i])
    }

    fn position(&self, subject_id: &str, class_id: &str) -> Option<usize> {
        self.index
            .get(&(subject_id.to_string(), class_id.to_string()))
            .copied()
    }

    /// Whether one more hour may be assigned.
    pub fn can_assign(&self, subject_id: &str, class_id: &str) -> bool {
        self.get(subject_id, class_id)
            .is_some_and(|t| !t.is_completed && t.remaining_hours > 0)
    }

    /// Records one assigned hour at `cell`.
    pub fn assign_hour(
        &mut self,
        subject_id: &str,
        class_id: &str,
        cell: CellKey,
    ) -> Result<&WeeklyHourTracker> {
        if !self.can_assign(subject_id, class_id) {
            return Err(TimetableError::QuotaExceeded {
                subject_id: subject_id.to_string(),
                class_id: class_id.to_string(),
            });
        }
        let i = self
            .position(subject_id, class_id)
            .ok_or_else(|| TimetableError::unknown("tracker", format!("{class_id}:{subject_id}")))?;
        let t = &mut self.trackers[i];
        t.assigned_hours += 1;
        t.last_assigned = Some(cell);
        t.refresh();
        Ok(&self.trackers[i])
    }

    /// Gives back one hour after a lesson was removed. Returns `false` when
    /// nothing was assigned.
    pub fn release_hour(&mut self, subject_id: &str, class_id: &str) -> bool {
        let Some(i) = self.position(subject_id, class_id) else {
            return false;
        };
        let t = &mut self.trackers[i];
        if t.assigned_hours == 0 {
            return false;
        }
        t.assigned_hours -= 1;
        t.refresh();
        true
    }

    /// Re-counts every tracker from the lessons in `timetable`, clamped to
    /// the target.
    pub fn sync_from_timetable(&mut self, timetable: &Timetable) {
        let mut counts: HashMap<(&str, &str), u32> = HashMap::new();
        for (_, l) in timetable.lessons() {
            *counts
                .entry((l.subject_id.as_str(), l.class_id.as_str()))
                .or_insert(0) += 1;
        }
        for t in &mut self.trackers {
            let placed = counts
                .get(&(t.subject_id.as_str(), t.class_id.as_str()))
                .copied()
                .unwrap_or(0);
            t.assigned_hours = placed.min(t.target_hours);
            t.refresh();
        }
    }

    /// Trackers in search order.
    pub fn sorted(&self) -> Vec<&WeeklyHourTracker> {
        let mut v: Vec<&WeeklyHourTracker> = self.trackers.iter().collect();
        v.sort_by(|a, b| tracker_order(a, b));
        v
    }

    /// Trackers of one class in search order.
    pub fn sorted_for_class(&self, class_id: &str) -> Vec<&WeeklyHourTracker> {
        let mut v: Vec<&WeeklyHourTracker> = self
            .trackers
            .iter()
            .filter(|t| t.class_id == class_id)
            .collect();
        v.sort_by(|a, b| tracker_order(a, b));
        v
    }

    /// Trackers still short of their target.
    pub fn incomplete(&self) -> impl Iterator<Item = &WeeklyHourTracker> + '_ {
        self.trackers.iter().filter(|t| !t.is_completed)
    }

    /// All trackers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &WeeklyHourTracker> + '_ {
        self.trackers.iter()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellRef, Day, Level, Period, Teacher};

    fn cell(n: u8) -> CellKey {
        CellKey::new(Day::Monday, Period::lesson(n).unwrap())
    }

    #[test]
    fn test_assign_until_complete() {
        let mut ht = HourTracker::new();
        ht.register("MATH", "5A", 2, Priority::High);
        assert!(ht.can_assign("MATH", "5A"));

        ht.assign_hour("MATH", "5A", cell(1)).unwrap();
        let t = ht.assign_hour("MATH", "5A", cell(2)).unwrap();
        assert_eq!(t.assigned_hours, 2);
        assert_eq!(t.remaining_hours, 0);
        assert!(t.is_completed);
        assert_eq!(t.last_assigned, Some(cell(2)));

        assert!(!ht.can_assign("MATH", "5A"));
        assert!(ht.assign_hour("MATH", "5A", cell(3)).is_err());
        assert_eq!(ht.get("MATH", "5A").unwrap().assigned_hours, 2);
    }

    #[test]
    fn test_unknown_pair_cannot_assign() {
        let mut ht = HourTracker::new();
        assert!(!ht.can_assign("MATH", "5A"));
        assert!(ht.assign_hour("MATH", "5A", cell(1)).is_err());
        assert!(!ht.release_hour("MATH", "5A"));
    }

    #[test]
    fn test_zero_target_is_complete() {
        let mut ht = HourTracker::new();
        ht.register("ART", "5A", 0, Priority::Low);
        assert!(!ht.can_assign("ART", "5A"));
    }

    #[test]
    fn test_release_hour() {
        let mut ht = HourTracker::new();
        ht.register("MATH", "5A", 1, Priority::Medium);
        ht.assign_hour("MATH", "5A", cell(1)).unwrap();
        assert!(ht.release_hour("MATH", "5A"));
        assert!(ht.can_assign("MATH", "5A"));
        assert!(!ht.release_hour("MATH", "5A"));
    }

    #[test]
    fn test_sort_order() {
        let mut ht = HourTracker::new();
        ht.register("LOW", "5A", 1, Priority::Low);
        ht.register("HIGH_BIG", "5A", 5, Priority::High);
        ht.register("HIGH_SMALL", "5A", 2, Priority::High);
        ht.register("DONE", "5A", 1, Priority::High);
        ht.assign_hour("DONE", "5A", cell(1)).unwrap();

        let order: Vec<&str> = ht.sorted().iter().map(|t| t.subject_id.as_str()).collect();
        assert_eq!(order, vec!["HIGH_SMALL", "HIGH_BIG", "LOW", "DONE"]);
    }

    #[test]
    fn test_sync_from_timetable_clamps() {
        let mut ht = HourTracker::new();
        ht.register("MATH", "5A", 1, Priority::Medium);
        let mut tt = Timetable::for_teachers(&[Teacher::new("T1", "Mathematics", Level::Primary)]);
        tt.place(CellRef::new(0, cell(1)), "MATH", "5A", "T1").unwrap();
        tt.place(CellRef::new(0, cell(2)), "MATH", "5A", "T1").unwrap();

        ht.sync_from_timetable(&tt);
        let t = ht.get("MATH", "5A").unwrap();
        assert_eq!(t.assigned_hours, 1);
        assert!(t.is_completed);
    }

    #[test]
    fn test_from_mappings_skips_invalid() {
        let mut bad = SubjectTeacherMapping::new("5A", "ART", "", 2);
        bad.invalidate("no teacher");
        let good = SubjectTeacherMapping::new("5A", "MATH", "T1", 4).with_priority(Priority::High);
        let ht = HourTracker::from_mappings(&[bad, good]);
        assert_eq!(ht.len(), 1);
        assert_eq!(ht.get("MATH", "5A").unwrap().target_hours, 4);
        assert_eq!(ht.incomplete().count(), 1);
    }
}
