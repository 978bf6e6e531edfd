//! School entities: teachers, classes and subjects.
//!
//! Teachers are the resources that hold schedules; classes and subjects are
//! what they are assigned to. All three carry a [`Level`]; teachers and
//! subjects additionally carry a branch (discipline) used for matching.

use serde::{Deserialize, Serialize};

use super::Level;

/// A teacher who can be assigned lessons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    /// Unique teacher identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Discipline (e.g., "Mathematics").
    pub branch: String,
    /// School level the teacher works at.
    pub level: Level,
}

/// A class (group of pupils).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassGroup {
    /// Unique class identifier.
    pub id: String,
    /// Display name (e.g., "5-A").
    #[serde(default)]
    pub name: String,
    /// School level of the class.
    pub level: Level,
    /// Teachers pre-assigned to this class, in preference order.
    #[serde(default)]
    pub assigned_teacher_ids: Vec<String>,
}

/// A subject taught to classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Unique subject identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Discipline the subject belongs to.
    pub branch: String,
    /// School level the subject is designed for.
    pub level: Level,
    /// Default weekly quota when a selection does not override it.
    pub weekly_hours: u32,
}

impl Teacher {
    /// Creates a teacher.
    pub fn new(id: impl Into<String>, branch: impl Into<String>, level: Level) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            branch: branch.into(),
            level,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether the teacher's branch equals `branch` (case-insensitive).
    pub fn teaches_branch(&self, branch: &str) -> bool {
        same_branch(&self.branch, branch)
    }
}

impl ClassGroup {
    /// Creates a class.
    pub fn new(id: impl Into<String>, level: Level) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            level,
            assigned_teacher_ids: Vec::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Pre-assigns a teacher.
    pub fn with_teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.assigned_teacher_ids.push(teacher_id.into());
        self
    }

    /// Whether `teacher_id` is pre-assigned to this class.
    pub fn has_teacher(&self, teacher_id: &str) -> bool {
        self.assigned_teacher_ids.iter().any(|t| t == teacher_id)
    }
}

impl Subject {
    /// Creates a subject with a default quota of one hour.
    pub fn new(id: impl Into<String>, branch: impl Into<String>, level: Level) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            branch: branch.into(),
            level,
            weekly_hours: 1,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the default weekly quota.
    pub fn with_weekly_hours(mut self, hours: u32) -> Self {
        self.weekly_hours = hours;
        self
    }

    /// Label for messages: name if set, id otherwise.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Case- and whitespace-insensitive branch equality.
pub fn same_branch(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teacher_builder() {
        let t = Teacher::new("T1", "Mathematics", Level::Middle).with_name("Ayşe");
        assert_eq!(t.id, "T1");
        assert_eq!(t.name, "Ayşe");
        assert!(t.teaches_branch(" mathematics "));
        assert!(!t.teaches_branch("Science"));
    }

    #[test]
    fn test_class_assigned_teachers() {
        let c = ClassGroup::new("5A", Level::Primary)
            .with_name("5-A")
            .with_teacher("T1")
            .with_teacher("T2");
        assert!(c.has_teacher("T2"));
        assert!(!c.has_teacher("T3"));
        assert_eq!(c.assigned_teacher_ids, vec!["T1", "T2"]);
    }

    #[test]
    fn test_subject_label_and_quota() {
        let s = Subject::new("MATH", "Mathematics", Level::Primary).with_weekly_hours(5);
        assert_eq!(s.weekly_hours, 5);
        assert_eq!(s.label(), "MATH");
        assert_eq!(s.with_name("Math").label(), "Math");
    }

    #[test]
    fn test_serde_camel_case() {
        let json = r#"{"id":"5A","level":"primary","assignedTeacherIds":["T1"]}"#;
        let c: ClassGroup = serde_json::from_str(json).unwrap();
        assert_eq!(c.level, Level::Primary);
        assert_eq!(c.assigned_teacher_ids, vec!["T1"]);
        assert!(c.name.is_empty());
    }
}
