//! Pipeline events and observers.
//!
//! The generator, optimizer and pipeline report progress through an
//! injected [`PipelineObserver`] instead of printing. [`TracingObserver`]
//! forwards events to `tracing`; [`NoopObserver`] drops them.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use crate::models::CellKey;

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    BuildMappings,
    ValidateMappings,
    Generate,
    Optimize,
    Validate,
    Persist,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::BuildMappings => "build_mappings",
            PipelineStage::ValidateMappings => "validate_mappings",
            PipelineStage::Generate => "generate",
            PipelineStage::Optimize => "optimize",
            PipelineStage::Validate => "validate",
            PipelineStage::Persist => "persist",
        }
    }
}

/// A progress event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStarted {
        stage: PipelineStage,
    },
    StageFinished {
        stage: PipelineStage,
        elapsed_ms: u64,
    },
    LessonPlaced {
        class_id: String,
        subject_id: String,
        teacher_id: String,
        cell: CellKey,
    },
    /// A subject ended below its weekly quota.
    QuotaUnderfilled {
        class_id: String,
        subject_id: String,
        placed: u32,
        target: u32,
    },
    IterationCompleted {
        iteration: usize,
        errors: usize,
        warnings: usize,
        repairs: usize,
    },
    Cancelled {
        stage: PipelineStage,
    },
}

/// Receives pipeline events.
pub trait PipelineObserver: Send + Sync + Debug {
    fn on_event(&self, event: &PipelineEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage } => {
                tracing::debug!(stage = stage.as_str(), "stage started");
            }
            PipelineEvent::StageFinished { stage, elapsed_ms } => {
                tracing::info!(stage = stage.as_str(), elapsed_ms, "stage finished");
            }
            PipelineEvent::LessonPlaced {
                class_id,
                subject_id,
                teacher_id,
                cell,
            } => {
                tracing::trace!(%class_id, %subject_id, %teacher_id, %cell, "lesson placed");
            }
            PipelineEvent::QuotaUnderfilled {
                class_id,
                subject_id,
                placed,
                target,
            } => {
                tracing::warn!(%class_id, %subject_id, placed, target, "weekly quota under-filled");
            }
            PipelineEvent::IterationCompleted {
                iteration,
                errors,
                warnings,
                repairs,
            } => {
                tracing::debug!(iteration, errors, warnings, repairs, "optimizer iteration");
            }
            PipelineEvent::Cancelled { stage } => {
                tracing::warn!(stage = stage.as_str(), "cancelled");
            }
        }
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events received so far.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Shared observer handle.
pub type SharedObserver = Arc<dyn PipelineObserver>;

/// The default observer.
pub fn tracing_observer() -> SharedObserver {
    Arc::new(TracingObserver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer() {
        let observer = RecordingObserver::new();
        observer.on_event(&PipelineEvent::StageStarted {
            stage: PipelineStage::Generate,
        });
        observer.on_event(&PipelineEvent::Cancelled {
            stage: PipelineStage::Generate,
        });
        assert_eq!(observer.events().len(), 2);
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = PipelineEvent::StageFinished {
            stage: PipelineStage::Optimize,
            elapsed_ms: 12,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"event":"stage_finished","stage":"optimize","elapsed_ms":12}"#
        );
    }

    #[test]
    fn test_tracing_observer_accepts_all_events() {
        crate::logging::init_test();
        let observer = TracingObserver;
        observer.on_event(&PipelineEvent::QuotaUnderfilled {
            class_id: "5A".into(),
            subject_id: "MATH".into(),
            placed: 3,
            target: 4,
        });
        NoopObserver.on_event(&PipelineEvent::StageStarted {
            stage: PipelineStage::Persist,
        });
    }
}
