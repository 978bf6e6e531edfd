//! Iterative conflict repair.
//!
//! # Algorithm
//!
//! Each iteration detects every conflict, stops as soon as none blocks, and
//! otherwise runs one repair pass over the blocking conflicts in priority
//! order:
//!
//! | Conflict | Repair |
//! |----------|--------|
//! | Teacher double-booking | later lessons move to a free teacher of the same level and a compatible branch, else are cleared |
//! | Class double-booking | later lessons move to another open cell of the same teacher, else are cleared |
//! | Teacher / class unavailable | the lesson moves as above, else is cleared |
//! | Weekly hours exceeded | lessons beyond the quota are cleared, earliest kept |
//! | Daily hours exceeded | lessons beyond the daily cap are cleared, earliest kept |
//!
//! "Later" and "earliest" follow placement sequence. The best snapshot by
//! (errors, warnings) is kept; the loop ends after `patience` iterations
//! without improvement or at `max_iterations`.
//!
//! # Reference
//! Minton et al. (1992), "Minimizing conflicts: a heuristic repair method"

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::OptimizationStrategy;
use crate::conflict::{
    summarize_conflicts, Candidate, Conflict, ConflictContext, ConflictDetector, ConflictType,
};
use crate::mapping::is_compatible;
use crate::models::{
    CellKey, CellRef, ConstraintType, EntityType, Lesson, SubjectTeacherMapping, Timetable,
};
use crate::events::{PipelineEvent, PipelineObserver, PipelineStage, TracingObserver};
use crate::tracker::HourTracker;

use super::cancel::CancellationToken;
use super::kpi::QualityScores;

/// An optional improvement pass run after conflict repair.
///
/// A pass may move lessons freely; the optimizer discards its result when
/// it raises the number of blocking conflicts.
pub trait ImprovementStrategy: Send + Sync + Debug {
    /// Strategy name (e.g., "balance-daily-load").
    fn name(&self) -> &'static str;

    /// Rewrites `timetable` in place; returns the number of moves made.
    fn improve(&self, ctx: &ConflictContext<'_>, timetable: &mut Timetable) -> usize;
}

/// Teacher-preference maximization. Makes no moves.
#[derive(Debug, Clone, Copy)]
pub struct MaximizeTeacherPreferences;

impl ImprovementStrategy for MaximizeTeacherPreferences {
    fn name(&self) -> &'static str {
        "maximize-teacher-preferences"
    }

    fn improve(&self, _ctx: &ConflictContext<'_>, _timetable: &mut Timetable) -> usize {
        0
    }
}

/// Daily-load balancing. Makes no moves.
#[derive(Debug, Clone, Copy)]
pub struct BalanceDailyLoad;

impl ImprovementStrategy for BalanceDailyLoad {
    fn name(&self) -> &'static str {
        "balance-daily-load"
    }

    fn improve(&self, _ctx: &ConflictContext<'_>, _timetable: &mut Timetable) -> usize {
        0
    }
}

/// Gap minimization. Makes no moves.
#[derive(Debug, Clone, Copy)]
pub struct MinimizeGaps;

impl ImprovementStrategy for MinimizeGaps {
    fn name(&self) -> &'static str {
        "minimize-gaps"
    }

    fn improve(&self, _ctx: &ConflictContext<'_>, _timetable: &mut Timetable) -> usize {
        0
    }
}

/// Built-in pass for a configured strategy; conflict minimization has none.
pub fn strategy_for(strategy: OptimizationStrategy) -> Option<Arc<dyn ImprovementStrategy>> {
    match strategy {
        OptimizationStrategy::MinimizeConflicts => None,
        OptimizationStrategy::MaximizeTeacherPreferences => {
            Some(Arc::new(MaximizeTeacherPreferences))
        }
        OptimizationStrategy::BalanceDailyLoad => Some(Arc::new(BalanceDailyLoad)),
        OptimizationStrategy::MinimizeGaps => Some(Arc::new(MinimizeGaps)),
    }
}

/// Optimizer limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerConfig {
    pub max_iterations: usize,
    /// Non-improving iterations tolerated.
    pub patience: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            patience: 10,
        }
    }
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    NoBlockingConflicts,
    MaxIterations,
    NoImprovement,
    Cancelled,
}

/// State after one repair iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationRecord {
    pub iteration: usize,
    pub repairs: usize,
    pub errors: usize,
    pub warnings: usize,
    pub scores: QualityScores,
}

/// Optimizer result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport {
    /// Repair iterations run.
    pub iterations: usize,
    /// Lessons moved or cleared.
    pub repairs: usize,
    pub initial_errors: usize,
    pub initial_warnings: usize,
    pub final_errors: usize,
    pub final_warnings: usize,
    pub scores: QualityScores,
    pub stop_reason: StopReason,
    pub history: Vec<IterationRecord>,
    /// Conflicts of the returned timetable.
    pub conflicts: Vec<Conflict>,
}

/// Conflict-minimizing repair loop.
///
/// # Example
///
/// ```
/// use u_timetable::conflict::ConflictContext;
/// use u_timetable::models::*;
/// use u_timetable::scheduler::{ScheduleOptimizer, StopReason};
/// use u_timetable::tracker::HourTracker;
///
/// let teachers = vec![Teacher::new("T1", "Mathematics", Level::Primary)];
/// let classes = vec![ClassGroup::new("5A", Level::Primary)];
/// let constraints = ConstraintSet::new();
/// let rules = SchedulingRules::default();
/// let ctx = ConflictContext::new(&teachers, &classes, &[], &constraints, &rules);
/// let mut tt = Timetable::for_teachers(&teachers);
///
/// let report = ScheduleOptimizer::new().optimize(&ctx, &mut tt, &mut [], &mut HourTracker::new());
/// assert_eq!(report.iterations, 0);
/// assert_eq!(report.stop_reason, StopReason::NoBlockingConflicts);
/// ```
#[derive(Debug, Clone)]
pub struct ScheduleOptimizer {
    config: OptimizerConfig,
    detector: ConflictDetector,
    strategy: Option<Arc<dyn ImprovementStrategy>>,
    observer: Arc<dyn PipelineObserver>,
    cancel: CancellationToken,
}

impl ScheduleOptimizer {
    /// Creates an optimizer with default limits and the standard detector.
    pub fn new() -> Self {
        Self {
            config: OptimizerConfig::default(),
            detector: ConflictDetector::standard(),
            strategy: None,
            observer: Arc::new(TracingObserver),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn with_detector(mut self, detector: ConflictDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Sets the improvement pass run after repair.
    pub fn with_strategy(mut self, strategy: Arc<dyn ImprovementStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Repairs `timetable` in place.
    ///
    /// On return `timetable` holds the best snapshot seen, and `mappings`
    /// and `tracker` are re-synced from it.
    pub fn optimize(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &mut Timetable,
        mappings: &mut [SubjectTeacherMapping],
        tracker: &mut HourTracker,
    ) -> OptimizationReport {
        let started = Instant::now();
        self.observer.on_event(&PipelineEvent::StageStarted {
            stage: PipelineStage::Optimize,
        });

        let mut conflicts = self.detector.detect_all(ctx, timetable);
        let initial = summarize_conflicts(&conflicts);
        let mut best = timetable.clone();
        let mut best_key = (initial.error_count(), initial.warning_count());
        let mut stale = 0;
        let mut iterations = 0;
        let mut total_repairs = 0;
        let mut history = Vec::new();
        let stop_reason;

        loop {
            if !conflicts.iter().any(Conflict::is_blocking) {
                stop_reason = StopReason::NoBlockingConflicts;
                break;
            }
            if iterations >= self.config.max_iterations {
                stop_reason = StopReason::MaxIterations;
                break;
            }
            if self.cancel.is_cancelled() {
                stop_reason = StopReason::Cancelled;
                self.observer.on_event(&PipelineEvent::Cancelled {
                    stage: PipelineStage::Optimize,
                });
                break;
            }
            iterations += 1;

            let repairs = self.repair_pass(ctx, timetable, &conflicts, tracker);
            total_repairs += repairs;

            conflicts = self.detector.detect_all(ctx, timetable);
            let summary = summarize_conflicts(&conflicts);
            let key = (summary.error_count(), summary.warning_count());
            let scores = QualityScores::calculate(timetable, mappings, &conflicts);
            history.push(IterationRecord {
                iteration: iterations,
                repairs,
                errors: key.0,
                warnings: key.1,
                scores,
            });
            self.observer.on_event(&PipelineEvent::IterationCompleted {
                iteration: iterations,
                errors: key.0,
                warnings: key.1,
                repairs,
            });

            if key < best_key {
                best = timetable.clone();
                best_key = key;
                stale = 0;
            } else {
                stale += 1;
                if stale >= self.config.patience {
                    stop_reason = StopReason::NoImprovement;
                    break;
                }
            }
        }

        *timetable = best;
        conflicts = self.detector.detect_all(ctx, timetable);

        if let Some(strategy) = &self.strategy {
            if stop_reason != StopReason::Cancelled {
                conflicts = self.apply_strategy(strategy.as_ref(), ctx, timetable, conflicts);
            }
        }

        sync_mappings(timetable, mappings);
        tracker.sync_from_timetable(timetable);

        let summary = summarize_conflicts(&conflicts);
        let scores = QualityScores::calculate(timetable, mappings, &conflicts);
        info!(
            iterations,
            repairs = total_repairs,
            errors = summary.error_count(),
            warnings = summary.warning_count(),
            overall = scores.overall,
            ?stop_reason,
            "optimization finished"
        );
        self.observer.on_event(&PipelineEvent::StageFinished {
            stage: PipelineStage::Optimize,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });

        OptimizationReport {
            iterations,
            repairs: total_repairs,
            initial_errors: initial.error_count(),
            initial_warnings: initial.warning_count(),
            final_errors: summary.error_count(),
            final_warnings: summary.warning_count(),
            scores,
            stop_reason,
            history,
            conflicts,
        }
    }

    /// Runs `strategy` on a copy and keeps it unless blocking conflicts grew.
    fn apply_strategy(
        &self,
        strategy: &dyn ImprovementStrategy,
        ctx: &ConflictContext<'_>,
        timetable: &mut Timetable,
        conflicts: Vec<Conflict>,
    ) -> Vec<Conflict> {
        let before = conflicts.iter().filter(|c| c.is_blocking()).count();
        let mut candidate = timetable.clone();
        let moves = strategy.improve(ctx, &mut candidate);
        if moves == 0 {
            return conflicts;
        }
        let after_conflicts = self.detector.detect_all(ctx, &candidate);
        let after = after_conflicts.iter().filter(|c| c.is_blocking()).count();
        if after > before {
            warn!(
                strategy = strategy.name(),
                before, after, "improvement pass rejected"
            );
            return conflicts;
        }
        debug!(strategy = strategy.name(), moves, "improvement pass accepted");
        *timetable = candidate;
        after_conflicts
    }

    /// One pass over the blocking conflicts; returns lessons moved or cleared.
    fn repair_pass(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &mut Timetable,
        conflicts: &[Conflict],
        tracker: &mut HourTracker,
    ) -> usize {
        let mut blocking: Vec<&Conflict> = conflicts.iter().filter(|c| c.is_blocking()).collect();
        blocking.sort_by_key(|c| (c.conflict_type.priority(), c.at));

        let mut repairs = 0;
        let mut swept: HashSet<ConflictType> = HashSet::new();
        for conflict in blocking {
            let kind = conflict.conflict_type;
            match kind {
                ConflictType::WeeklyHoursExceeded => {
                    if swept.insert(kind) {
                        repairs += self.trim_weekly(ctx, timetable, tracker);
                    }
                }
                ConflictType::DailyHoursExceeded => {
                    if swept.insert(kind) {
                        repairs += self.trim_daily(ctx, timetable, tracker);
                    }
                }
                _ => {
                    let Some(at) = conflict.at else { continue };
                    if self.repair_lesson(ctx, timetable, kind, at, tracker) {
                        repairs += 1;
                    }
                }
            }
        }
        repairs
    }

    /// Repairs one lesson if it still carries a `kind` conflict.
    fn repair_lesson(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &mut Timetable,
        kind: ConflictType,
        at: CellRef,
        tracker: &mut HourTracker,
    ) -> bool {
        let Some(lesson) = timetable.lesson(at).cloned() else {
            return false;
        };
        let still = self
            .detector
            .check(ctx, timetable, &Candidate::placed(at, &lesson))
            .iter()
            .any(|c| c.conflict_type == kind);
        if !still {
            return false;
        }

        match kind {
            ConflictType::TeacherDoubleBooking => {
                if !is_later(timetable, at, &lesson, |l| l.teacher_id == lesson.teacher_id) {
                    return false;
                }
                if let Some(target) = self.alternate_teacher(ctx, timetable, at, &lesson) {
                    return move_lesson(timetable, at, target.0, Some(target.1));
                }
            }
            ConflictType::ClassDoubleBooking => {
                if !is_later(timetable, at, &lesson, |l| l.class_id == lesson.class_id) {
                    return false;
                }
                if let Some(target) = self.open_cell(ctx, timetable, at, &lesson) {
                    return move_lesson(timetable, at, target, None);
                }
            }
            ConflictType::TeacherUnavailable | ConflictType::ClassUnavailable => {
                if let Some(target) = self.open_cell(ctx, timetable, at, &lesson) {
                    return move_lesson(timetable, at, target, None);
                }
            }
            _ => return false,
        }
        clear(timetable, at, tracker)
    }

    /// A free teacher of the class level with a compatible branch.
    fn alternate_teacher(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &Timetable,
        at: CellRef,
        lesson: &Lesson,
    ) -> Option<(CellRef, String)> {
        let level = ctx.lunch_level(&lesson.class_id, &lesson.teacher_id)?;
        let branch = ctx
            .subject(&lesson.subject_id)
            .map(|s| s.branch.clone())
            .or_else(|| ctx.teacher(&lesson.teacher_id).map(|t| t.branch.clone()))?;

        let mut seen = HashSet::new();
        for (row, owner) in timetable.rows().iter().enumerate() {
            if owner.teacher_id == lesson.teacher_id || !seen.insert(owner.teacher_id.as_str()) {
                continue;
            }
            let Some(teacher) = ctx.teacher(&owner.teacher_id) else {
                continue;
            };
            if teacher.level != level || !is_compatible(&teacher.branch, &branch) {
                continue;
            }
            let target = CellRef::new(row, at.cell);
            if !timetable.is_open(target) {
                continue;
            }
            let candidate = Candidate::new(&teacher.id, &lesson.class_id, &lesson.subject_id, at.cell)
                .excluding(at);
            if !self.detector.blocks(ctx, timetable, &candidate) {
                return Some((target, teacher.id.clone()));
            }
        }
        None
    }

    /// First open cell of the same row where the lesson raises no blocking
    /// conflict.
    fn open_cell(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &Timetable,
        at: CellRef,
        lesson: &Lesson,
    ) -> Option<CellRef> {
        let level = ctx.lunch_level(&lesson.class_id, &lesson.teacher_id)?;
        CellKey::lessons()
            .filter(|c| *c != at.cell && level.is_teachable(c.period))
            .map(|c| CellRef::new(at.row, c))
            .find(|target| {
                timetable.is_open(*target)
                    && ctx
                        .constraints
                        .lookup(EntityType::Subject, &lesson.subject_id, target.cell)
                        != ConstraintType::Unavailable
                    && !self.detector.blocks(
                        ctx,
                        timetable,
                        &Candidate::new(
                            &lesson.teacher_id,
                            &lesson.class_id,
                            &lesson.subject_id,
                            target.cell,
                        )
                        .excluding(at),
                    )
            })
    }

    /// Clears lessons beyond each (class, subject) quota, earliest kept.
    fn trim_weekly(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &mut Timetable,
        tracker: &mut HourTracker,
    ) -> usize {
        let mut groups: BTreeMap<(String, String), Vec<(u64, CellRef)>> = BTreeMap::new();
        for (at, l) in timetable.lessons() {
            groups
                .entry((l.class_id.clone(), l.subject_id.clone()))
                .or_default()
                .push((l.sequence, at));
        }
        let mut excess = Vec::new();
        for ((class_id, subject_id), mut lessons) in groups {
            let Some(quota) = ctx.quota(&class_id, &subject_id) else {
                continue;
            };
            lessons.sort();
            excess.extend(lessons.into_iter().skip(quota as usize).map(|(_, at)| at));
        }
        excess
            .into_iter()
            .filter(|at| clear(timetable, *at, tracker))
            .count()
    }

    /// Clears lessons beyond the teacher and class daily caps, earliest kept.
    fn trim_daily(
        &self,
        ctx: &ConflictContext<'_>,
        timetable: &mut Timetable,
        tracker: &mut HourTracker,
    ) -> usize {
        let mut cleared = 0;
        let caps = [
            (true, ctx.rules.max_daily_hours_teacher),
            (false, ctx.rules.max_daily_hours_class),
        ];
        for (by_teacher, cap) in caps {
            let mut groups: BTreeMap<(String, usize), Vec<(u64, CellRef)>> = BTreeMap::new();
            for (at, l) in timetable.lessons() {
                let owner = if by_teacher { &l.teacher_id } else { &l.class_id };
                groups
                    .entry((owner.clone(), at.cell.day.index()))
                    .or_default()
                    .push((l.sequence, at));
            }
            for (_, mut lessons) in groups {
                lessons.sort();
                for (_, at) in lessons.into_iter().skip(cap as usize) {
                    if clear(timetable, at, tracker) {
                        cleared += 1;
                    }
                }
            }
        }
        cleared
    }
}

impl Default for ScheduleOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether another lesson matching `same` shares the cell and was placed
/// before the one at `at`.
fn is_later(
    timetable: &Timetable,
    at: CellRef,
    lesson: &Lesson,
    same: impl Fn(&Lesson) -> bool,
) -> bool {
    timetable
        .lessons_at(at.cell)
        .filter(|(other, l)| *other != at && same(l))
        .any(|(other, l)| (l.sequence, other) < (lesson.sequence, at))
}

/// Moves the lesson at `from` to `to`, keeping its sequence and optionally
/// reassigning the teacher.
fn move_lesson(
    timetable: &mut Timetable,
    from: CellRef,
    to: CellRef,
    teacher_id: Option<String>,
) -> bool {
    let Some(mut lesson) = timetable.remove(from) else {
        return false;
    };
    if let Some(t) = teacher_id {
        lesson.teacher_id = t;
    }
    match timetable.insert_lesson(to, lesson.clone()) {
        Ok(()) => {
            debug!(from = %from.cell, to = %to.cell, class_id = %lesson.class_id, "lesson moved");
            true
        }
        Err(_) => {
            let _ = timetable.insert_lesson(from, lesson);
            false
        }
    }
}

fn clear(timetable: &mut Timetable, at: CellRef, tracker: &mut HourTracker) -> bool {
    match timetable.remove(at) {
        Some(lesson) => {
            tracker.release_hour(&lesson.subject_id, &lesson.class_id);
            debug!(cell = %at.cell, class_id = %lesson.class_id, subject_id = %lesson.subject_id, "lesson cleared");
            true
        }
        None => false,
    }
}

/// Sets every mapping's `assigned_hours` from the timetable.
pub fn sync_mappings(timetable: &Timetable, mappings: &mut [SubjectTeacherMapping]) {
    for m in mappings.iter_mut() {
        let placed = timetable
            .lessons()
            .filter(|(_, l)| l.class_id == m.class_id && l.subject_id == m.subject_id)
            .count() as u32;
        m.sync_assigned(placed);
    }
}
