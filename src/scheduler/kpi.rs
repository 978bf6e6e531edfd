//! Timetable quality metrics.
//!
//! # Statistics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Total slots | Teachable cells over all rows (lesson periods minus lunch) |
//! | Filled slots | Placed lessons |
//! | Conflict count | Conflicts reported by the detector |
//! | Subject coverage | Share of valid mappings whose quota is met (%) |
//! | Teacher utilization | Filled / total slots (%) |
//!
//! # Scores
//!
//! | Score | Definition |
//! |-------|-----------|
//! | Satisfaction | min(100, placed / target × 100) |
//! | Balance | 100 − coefficient of variation of the per-day load (%) |
//! | Gap | 100 − share of idle teachable cells between a row's first and last lesson of a day (%) |
//! | Overall | 0.5·S + 0.3·B + 0.2·G − min(100, 10·errors) − min(20, 2·warnings) |

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::conflict::{summarize_conflicts, Conflict};
use crate::models::{CellKey, CellRef, Day, Period, SubjectTeacherMapping, Timetable};

/// Output statistics of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatistics {
    pub total_slots: usize,
    pub filled_slots: usize,
    pub empty_slots: usize,
    pub conflict_count: usize,
    /// Percentage of valid mappings at quota.
    pub subject_coverage: f64,
    /// Percentage of teachable cells filled.
    pub teacher_utilization: f64,
    /// Lessons per teacher.
    pub teacher_workload: BTreeMap<String, u32>,
    /// Lessons per subject.
    pub subject_distribution: BTreeMap<String, u32>,
}

impl GenerationStatistics {
    /// Computes statistics from a timetable, its mappings and the detected
    /// conflicts.
    pub fn calculate(
        timetable: &Timetable,
        mappings: &[SubjectTeacherMapping],
        conflicts: &[Conflict],
    ) -> Self {
        let total_slots = teachable_cells(timetable);
        let filled_slots = timetable.lesson_count();

        let mut teacher_workload = BTreeMap::new();
        let mut subject_distribution = BTreeMap::new();
        for (_, lesson) in timetable.lessons() {
            *teacher_workload.entry(lesson.teacher_id.clone()).or_insert(0) += 1;
            *subject_distribution.entry(lesson.subject_id.clone()).or_insert(0) += 1;
        }

        let placed = placed_per_pair(timetable);
        let valid: Vec<&SubjectTeacherMapping> = mappings.iter().filter(|m| m.is_valid).collect();
        let subject_coverage = if valid.is_empty() {
            0.0
        } else {
            let met = valid
                .iter()
                .filter(|m| pair_count(&placed, m) >= m.weekly_hours)
                .count();
            met as f64 / valid.len() as f64 * 100.0
        };

        let teacher_utilization = if total_slots == 0 {
            0.0
        } else {
            filled_slots as f64 / total_slots as f64 * 100.0
        };

        Self {
            total_slots,
            filled_slots,
            empty_slots: total_slots.saturating_sub(filled_slots),
            conflict_count: conflicts.len(),
            subject_coverage,
            teacher_utilization,
            teacher_workload,
            subject_distribution,
        }
    }
}

/// Composite quality scores, each on a 0..=100 scale before penalties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityScores {
    pub satisfaction: f64,
    pub balance: f64,
    pub gap: f64,
    /// Weighted score minus conflict penalties; may be negative.
    pub overall: f64,
}

impl QualityScores {
    /// Scores a timetable against the mapping quotas and detected conflicts.
    pub fn calculate(
        timetable: &Timetable,
        mappings: &[SubjectTeacherMapping],
        conflicts: &[Conflict],
    ) -> Self {
        let satisfaction = satisfaction(timetable, mappings);
        let balance = balance(timetable);
        let gap = gap(timetable);
        let summary = summarize_conflicts(conflicts);
        let penalty = (10.0 * summary.error_count() as f64).min(100.0)
            + (2.0 * summary.warning_count() as f64).min(20.0);
        Self {
            satisfaction,
            balance,
            gap,
            overall: 0.5 * satisfaction + 0.3 * balance + 0.2 * gap - penalty,
        }
    }
}

fn teachable_cells(timetable: &Timetable) -> usize {
    timetable
        .rows()
        .iter()
        .map(|r| {
            CellKey::lessons()
                .filter(|c| r.level.is_teachable(c.period))
                .count()
        })
        .sum()
}

fn placed_per_pair(timetable: &Timetable) -> HashMap<(&str, &str), u32> {
    let mut placed = HashMap::new();
    for (_, l) in timetable.lessons() {
        *placed
            .entry((l.class_id.as_str(), l.subject_id.as_str()))
            .or_insert(0) += 1;
    }
    placed
}

fn pair_count(placed: &HashMap<(&str, &str), u32>, m: &SubjectTeacherMapping) -> u32 {
    placed
        .get(&(m.class_id.as_str(), m.subject_id.as_str()))
        .copied()
        .unwrap_or(0)
}

fn satisfaction(timetable: &Timetable, mappings: &[SubjectTeacherMapping]) -> f64 {
    let placed = placed_per_pair(timetable);
    let (filled, target) = mappings
        .iter()
        .filter(|m| m.is_valid)
        .fold((0u32, 0u32), |(f, t), m| {
            (f + pair_count(&placed, m).min(m.weekly_hours), t + m.weekly_hours)
        });
    if target == 0 {
        return 100.0;
    }
    (filled as f64 / target as f64 * 100.0).min(100.0)
}

fn balance(timetable: &Timetable) -> f64 {
    let mut loads = [0f64; 5];
    for (at, _) in timetable.lessons() {
        loads[at.cell.day.index()] += 1.0;
    }
    let mean = loads.iter().sum::<f64>() / loads.len() as f64;
    if mean == 0.0 {
        return 100.0;
    }
    let variance = loads.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / loads.len() as f64;
    100.0 - (variance.sqrt() / mean * 100.0).min(100.0)
}

fn gap(timetable: &Timetable) -> f64 {
    let mut idle = 0usize;
    let mut span = 0usize;
    for (row, owner) in timetable.rows().iter().enumerate() {
        for day in Day::ALL {
            let cells: Vec<bool> = Period::lessons()
                .filter(|p| owner.level.is_teachable(*p))
                .map(|p| timetable.lesson(CellRef::new(row, CellKey::new(day, p))).is_some())
                .collect();
            let (Some(first), Some(last)) = (
                cells.iter().position(|b| *b),
                cells.iter().rposition(|b| *b),
            ) else {
                continue;
            };
            span += last - first + 1;
            idle += cells[first..=last].iter().filter(|b| !**b).count();
        }
    }
    if span == 0 {
        return 100.0;
    }
    100.0 - idle as f64 / span as f64 * 100.0
}
