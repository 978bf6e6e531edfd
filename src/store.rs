//! Schedule persistence seam.
//!
//! The pipeline commits through [`ScheduleStore`]; a document database or
//! file backend implements it outside this crate. [`InMemoryStore`] backs
//! tests and embedding.

use std::collections::BTreeMap;

use crate::error::{Result, TimetableError};
use crate::models::Schedule;

/// Destination of committed schedules.
pub trait ScheduleStore {
    /// Saves (inserts or replaces by id) every schedule.
    fn save_schedules(&mut self, schedules: &[Schedule]) -> Result<()>;

    /// Loads one schedule.
    fn load_schedule(&self, id: &str) -> Result<Option<Schedule>>;
}

/// Map-backed store keyed by schedule id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    schedules: BTreeMap<String, Schedule>,
    read_only: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    /// Stored schedules in id order.
    pub fn schedules(&self) -> impl Iterator<Item = &Schedule> + '_ {
        self.schedules.values()
    }
}

impl ScheduleStore for InMemoryStore {
    fn save_schedules(&mut self, schedules: &[Schedule]) -> Result<()> {
        if self.read_only {
            return Err(TimetableError::Store("store is read-only".to_string()));
        }
        for s in schedules {
            self.schedules.insert(s.id.clone(), s.clone());
        }
        Ok(())
    }

    fn load_schedule(&self, id: &str) -> Result<Option<Schedule>> {
        Ok(self.schedules.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Level, Teacher, Timetable};

    #[test]
    fn test_save_replaces_by_id() {
        let tt = Timetable::for_teachers(&[
            Teacher::new("T1", "Mathematics", Level::Primary),
            Teacher::new("T2", "Music", Level::Middle),
        ]);
        let schedules = tt.to_schedules();

        let mut store = InMemoryStore::new();
        store.save_schedules(&schedules).unwrap();
        store.save_schedules(&schedules[..1]).unwrap();
        assert_eq!(store.len(), 2);

        let loaded = store.load_schedule("schedule-T2").unwrap().unwrap();
        assert_eq!(loaded, schedules[1]);
        assert!(store.load_schedule("missing").unwrap().is_none());
    }

    #[test]
    fn test_read_only_store_rejects_writes() {
        let mut store = InMemoryStore::read_only();
        let err = store.save_schedules(&[]).unwrap_err();
        assert!(matches!(err, TimetableError::Store(_)));
        assert!(store.is_empty());
    }
}
