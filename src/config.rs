//! Generation configuration.
//!
//! Every field has a default, so a partial JSON document (even `{}`) is a
//! valid configuration.
//!
//! ```
//! use u_timetable::config::{Algorithm, GenerationConfig, OptimizationLevel};
//!
//! let config = GenerationConfig::from_json_str(
//!     r#"{"algorithm":"compact","optimizationLevel":"thorough","seed":7}"#,
//! ).unwrap();
//! assert_eq!(config.algorithm, Algorithm::Compact);
//! assert_eq!(config.effective_max_iterations(), 300);
//! assert_eq!(config.seed, Some(7));
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;
use crate::models::SchedulingRules;

/// Placement strategy of the generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Quota-driven placement only.
    #[default]
    Greedy,
    /// Greedy placement, then fill every remaining open cell.
    Compact,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Greedy => "greedy",
            Algorithm::Compact => "compact",
        }
    }
}

/// Optimizer effort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    /// Skip the optimizer.
    None,
    #[default]
    Standard,
    Thorough,
}

impl OptimizationLevel {
    /// Iteration budget of this level.
    pub fn max_iterations(&self) -> usize {
        match self {
            OptimizationLevel::None => 0,
            OptimizationLevel::Standard => 100,
            OptimizationLevel::Thorough => 300,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationLevel::None => "none",
            OptimizationLevel::Standard => "standard",
            OptimizationLevel::Thorough => "thorough",
        }
    }
}

/// Optimizer objective after conflict repair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptimizationStrategy {
    #[default]
    MinimizeConflicts,
    MaximizeTeacherPreferences,
    BalanceDailyLoad,
    MinimizeGaps,
}

/// Configuration of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig {
    pub algorithm: Algorithm,
    pub optimization_level: OptimizationLevel,
    /// RNG seed; a random seed is drawn and reported when absent.
    pub seed: Option<u64>,
    pub rules: SchedulingRules,
    /// Overrides the level's iteration budget.
    pub max_iterations: Option<usize>,
    /// Non-improving iterations tolerated before the optimizer stops.
    pub patience: usize,
    pub strategy: OptimizationStrategy,
    /// Wall-clock budget for generation and optimization.
    pub time_limit_ms: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Greedy,
            optimization_level: OptimizationLevel::Standard,
            seed: None,
            rules: SchedulingRules::default(),
            max_iterations: None,
            patience: 10,
            strategy: OptimizationStrategy::MinimizeConflicts,
            time_limit_ms: None,
        }
    }
}

impl GenerationConfig {
    /// Parses a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_optimization_level(mut self, level: OptimizationLevel) -> Self {
        self.optimization_level = level;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_rules(mut self, rules: SchedulingRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_ms = Some(limit.as_millis() as u64);
        self
    }

    /// Iteration budget: the explicit override, else the level's.
    pub fn effective_max_iterations(&self) -> usize {
        self.max_iterations
            .unwrap_or_else(|| self.optimization_level.max_iterations())
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }
}
