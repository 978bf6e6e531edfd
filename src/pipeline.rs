//! End-to-end timetable generation.
//!
//! # Stages
//!
//! ```text
//! BuildMappings → ValidateMappings → Generate → [Optimize] → Validate → Persist
//! ```
//!
//! [`TimetablePipeline::run`] performs every stage but the last and returns
//! a [`GenerationResult`]; [`TimetablePipeline::commit`] persists it once
//! validation is clean. A run fails as a batch only when no valid mapping
//! remains or no class received a lesson; anything less is reported as a
//! warning on a successful result.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{Algorithm, GenerationConfig, OptimizationLevel};
use crate::conflict::{detect_all, ConflictContext};
use crate::error::{Result, TimetableError};
use crate::events::{PipelineEvent, PipelineObserver, PipelineStage, TracingObserver};
use crate::mapping::MappingBuilder;
use crate::models::{
    ClassGroup, ConstraintSet, Schedule, Subject, SubjectSelection, SubjectTeacherMapping,
    Teacher, TimeConstraint, Timetable,
};
use crate::scheduler::{
    strategy_for, CancellationToken, GenerationStatistics, OptimizationReport, OptimizerConfig,
    QualityScores, ScheduleGenerator, ScheduleOptimizer, StopReason,
};
use crate::store::ScheduleStore;
use crate::validation::{validate_input, validate_mappings, validate_timetable, ValidationReport};

/// Everything one generation run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub teachers: Vec<Teacher>,
    pub classes: Vec<ClassGroup>,
    pub subjects: Vec<Subject>,
    /// Selection applied to every class; empty means every subject of the
    /// class's level.
    #[serde(default)]
    pub selections: Vec<SubjectSelection>,
    /// Per-class selection overrides.
    #[serde(default)]
    pub class_selections: HashMap<String, Vec<SubjectSelection>>,
    #[serde(default)]
    pub constraints: Vec<TimeConstraint>,
    #[serde(default)]
    pub config: GenerationConfig,
}

impl GenerationRequest {
    pub fn new(teachers: Vec<Teacher>, classes: Vec<ClassGroup>, subjects: Vec<Subject>) -> Self {
        Self {
            teachers,
            classes,
            subjects,
            ..Self::default()
        }
    }

    pub fn with_selections(mut self, selections: Vec<SubjectSelection>) -> Self {
        self.selections = selections;
        self
    }

    pub fn with_class_selections(
        mut self,
        class_id: impl Into<String>,
        selections: Vec<SubjectSelection>,
    ) -> Self {
        self.class_selections.insert(class_id.into(), selections);
        self
    }

    pub fn with_constraint(mut self, constraint: TimeConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Parses a JSON request.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// At least one class received a lesson.
    pub success: bool,
    /// One record per teacher, fully keyed.
    pub schedules: Vec<Schedule>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub statistics: GenerationStatistics,
    pub generation_time_ms: u64,
    pub algorithm: Algorithm,
    pub optimization_level: OptimizationLevel,
    /// Seed actually used, drawn at random when the config had none.
    pub seed: u64,
    pub mappings: Vec<SubjectTeacherMapping>,
    pub quality: QualityScores,
    pub validation: ValidationReport,
    pub optimization: Option<OptimizationReport>,
    pub cancelled: bool,
    #[serde(skip)]
    pub timetable: Timetable,
}

impl GenerationResult {
    fn failed(config: &GenerationConfig, seed: u64, started: Instant) -> Self {
        Self {
            success: false,
            schedules: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            statistics: GenerationStatistics::default(),
            generation_time_ms: started.elapsed().as_millis() as u64,
            algorithm: config.algorithm,
            optimization_level: config.optimization_level,
            seed,
            mappings: Vec::new(),
            quality: QualityScores::default(),
            validation: ValidationReport::default(),
            optimization: None,
            cancelled: false,
            timetable: Timetable::new(),
        }
    }
}

/// Runs the generation stages in order.
///
/// # Example
///
/// ```
/// use u_timetable::config::GenerationConfig;
/// use u_timetable::models::*;
/// use u_timetable::pipeline::{GenerationRequest, TimetablePipeline};
///
/// let request = GenerationRequest::new(
///     vec![Teacher::new("T1", "Mathematics", Level::Primary)],
///     vec![ClassGroup::new("5A", Level::Primary)],
///     vec![Subject::new("MATH", "Mathematics", Level::Primary).with_weekly_hours(4)],
/// )
/// .with_config(GenerationConfig::default().with_seed(1));
///
/// let result = TimetablePipeline::new().run(&request);
/// assert!(result.success);
/// assert_eq!(result.statistics.filled_slots, 4);
/// ```
#[derive(Debug, Clone)]
pub struct TimetablePipeline {
    observer: Arc<dyn PipelineObserver>,
    cancel: CancellationToken,
}

impl TimetablePipeline {
    pub fn new() -> Self {
        Self {
            observer: Arc::new(TracingObserver),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Token polled by the generator and optimizer loops.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Builds, generates, optimizes and validates a timetable.
    pub fn run(&self, request: &GenerationRequest) -> GenerationResult {
        let started = Instant::now();
        let config = &request.config;
        let seed = config.seed.unwrap_or_else(rand::random);
        let cancel = match config.time_limit() {
            Some(limit) => self.cancel.clone().with_deadline(limit),
            None => self.cancel.clone(),
        };
        let mut warnings = Vec::new();

        if let Err(errors) = validate_input(&request.teachers, &request.classes, &request.subjects)
        {
            for e in errors {
                warn!(kind = ?e.kind, "{}", e.message);
                warnings.push(e.message);
            }
        }
        if !config.rules.lunch_break_required {
            warn!("lunch_break_required is false; lunch stays reserved");
            warnings.push("Lunch break cannot be disabled; lunch stays reserved".to_string());
        }

        let stage = self.stage(PipelineStage::BuildMappings);
        let mut mappings = MappingBuilder::new(&request.classes, &request.subjects, &request.teachers)
            .with_selections(request.selections.clone())
            .with_class_selection_map(request.class_selections.clone())
            .build();
        stage.finish(self.observer.as_ref());

        let stage = self.stage(PipelineStage::ValidateMappings);
        let mapping_report = validate_mappings(&mappings, &request.subjects);
        stage.finish(self.observer.as_ref());
        let mut errors: Vec<String> = mapping_report
            .errors
            .iter()
            .map(|e| e.message.clone())
            .collect();
        if !mapping_report.has_valid() {
            errors.push(TimetableError::NoValidMappings.to_string());
            warn!(invalid = mapping_report.errors.len(), "no valid mappings; nothing to schedule");
            let mut result = GenerationResult::failed(config, seed, started);
            result.warnings = warnings;
            result.errors = errors;
            result.mappings = mappings;
            return result;
        }

        let constraints = ConstraintSet::from_records(&request.constraints);
        let ctx = ConflictContext::new(
            &request.teachers,
            &request.classes,
            &request.subjects,
            &constraints,
            &config.rules,
        )
        .with_mappings(&mappings);

        let outcome = ScheduleGenerator::new(seed)
            .with_algorithm(config.algorithm)
            .with_observer(self.observer.clone())
            .with_cancellation(cancel.clone())
            .generate(&ctx, &request.classes, &request.teachers, &mut mappings);
        warnings.extend(outcome.warnings);
        let mut cancelled = outcome.cancelled;
        let mut timetable = outcome.timetable;
        let mut tracker = outcome.tracker;

        let max_iterations = config.effective_max_iterations();
        let optimization = if max_iterations > 0 && !cancelled {
            let mut optimizer = ScheduleOptimizer::new()
                .with_config(OptimizerConfig {
                    max_iterations,
                    patience: config.patience,
                })
                .with_observer(self.observer.clone())
                .with_cancellation(cancel.clone());
            if let Some(strategy) = strategy_for(config.strategy) {
                optimizer = optimizer.with_strategy(strategy);
            }
            let report = optimizer.optimize(&ctx, &mut timetable, &mut mappings, &mut tracker);
            if report.stop_reason == StopReason::Cancelled {
                cancelled = true;
                warnings.push("Optimization cancelled; best timetable so far returned".to_string());
            }
            Some(report)
        } else {
            None
        };

        let stage = self.stage(PipelineStage::Validate);
        let validation = validate_timetable(&timetable, &ctx);
        stage.finish(self.observer.as_ref());
        errors.extend(validation.errors.iter().map(|c| c.message.clone()));

        let conflicts = detect_all(&ctx, &timetable);
        let statistics = GenerationStatistics::calculate(&timetable, &mappings, &conflicts);
        let quality = QualityScores::calculate(&timetable, &mappings, &conflicts);
        let success = request
            .classes
            .iter()
            .any(|c| timetable.lessons().any(|(_, l)| l.class_id == c.id));
        if !success {
            errors.push(TimetableError::NoSchedulesProduced.to_string());
        }

        let generation_time_ms = started.elapsed().as_millis() as u64;
        info!(
            success,
            seed,
            filled = statistics.filled_slots,
            conflicts = statistics.conflict_count,
            overall = quality.overall,
            generation_time_ms,
            "timetable generated"
        );

        GenerationResult {
            success,
            schedules: timetable.to_schedules(),
            warnings,
            errors,
            statistics,
            generation_time_ms,
            algorithm: config.algorithm,
            optimization_level: config.optimization_level,
            seed,
            mappings,
            quality,
            validation,
            optimization,
            cancelled,
            timetable,
        }
    }

    /// Persists a result whose validation is clean; returns the number of
    /// schedules saved.
    ///
    /// # Errors
    /// `NoSchedulesProduced` for a failed run, `ValidationFailed` when a
    /// blocking conflict remains, or the store's own error.
    pub fn commit(&self, result: &GenerationResult, store: &mut dyn ScheduleStore) -> Result<usize> {
        if !result.success {
            return Err(TimetableError::NoSchedulesProduced);
        }
        result.validation.ensure_valid()?;

        let stage = self.stage(PipelineStage::Persist);
        store.save_schedules(&result.schedules)?;
        stage.finish(self.observer.as_ref());
        info!(schedules = result.schedules.len(), "schedules committed");
        Ok(result.schedules.len())
    }

    fn stage(&self, stage: PipelineStage) -> StageTimer {
        self.observer.on_event(&PipelineEvent::StageStarted { stage });
        StageTimer {
            stage,
            started: Instant::now(),
        }
    }
}

impl Default for TimetablePipeline {
    fn default() -> Self {
        Self::new()
    }
}

struct StageTimer {
    stage: PipelineStage,
    started: Instant,
}

impl StageTimer {
    fn finish(self, observer: &dyn PipelineObserver) {
        observer.on_event(&PipelineEvent::StageFinished {
            stage: self.stage,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        });
    }
}
