//! Recovery, readiness and wellness scoring
//!
//! All three scores are closed-form weighted averages over fixed weight tables.
//! Weight tables are validated once when a [`ScoreCalculator`] is built from
//! configuration; scoring calls themselves cannot fail.

pub mod readiness;
pub mod recovery;
pub mod wellness;

pub use readiness::{IntensityLevel, ReadinessInputs, ReadinessResult};
pub use recovery::{RecoveryInputs, RecoveryResult, RecoveryStatus};
pub use wellness::{ComponentScores, DailyMetrics, Trend, WellnessGoals, WellnessInputs, WellnessResult};

use crate::config::validate_weights;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Recovery factor weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryWeights {
    pub sleep_hours: f64,
    pub sleep_quality: f64,
    pub hrv: f64,
    pub resting_hr: f64,
    pub training_load: f64,
    pub stress: f64,
}

impl Default for RecoveryWeights {
    fn default() -> Self {
        Self {
            sleep_hours: 0.25,
            sleep_quality: 0.20,
            hrv: 0.20,
            resting_hr: 0.15,
            training_load: 0.10,
            stress: 0.10,
        }
    }
}

impl RecoveryWeights {
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("sleep_hours", self.sleep_hours),
            ("sleep_quality", self.sleep_quality),
            ("hrv", self.hrv),
            ("resting_hr", self.resting_hr),
            ("training_load", self.training_load),
            ("stress", self.stress),
        ]
    }

    pub fn total(&self) -> f64 {
        self.entries().iter().map(|(_, w)| w).sum()
    }
}

/// Readiness factor weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadinessWeights {
    pub recovery_score: f64,
    pub sleep_quality: f64,
    pub days_since_hard_workout: f64,
    pub energy_level: f64,
    pub muscle_soreness: f64,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        Self {
            recovery_score: 0.35,
            sleep_quality: 0.20,
            days_since_hard_workout: 0.15,
            energy_level: 0.15,
            muscle_soreness: 0.15,
        }
    }
}

impl ReadinessWeights {
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("recovery_score", self.recovery_score),
            ("sleep_quality", self.sleep_quality),
            ("days_since_hard_workout", self.days_since_hard_workout),
            ("energy_level", self.energy_level),
            ("muscle_soreness", self.muscle_soreness),
        ]
    }
}

/// Wellness component weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WellnessWeights {
    pub sleep: f64,
    pub activity: f64,
    pub recovery: f64,
    pub mental: f64,
    pub nutrition: f64,
    pub training_load: f64,
}

impl Default for WellnessWeights {
    fn default() -> Self {
        Self {
            sleep: 0.20,
            activity: 0.20,
            recovery: 0.15,
            mental: 0.15,
            nutrition: 0.20,
            training_load: 0.10,
        }
    }
}

impl WellnessWeights {
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("sleep", self.sleep),
            ("activity", self.activity),
            ("recovery", self.recovery),
            ("mental", self.mental),
            ("nutrition", self.nutrition),
            ("training_load", self.training_load),
        ]
    }
}

/// Scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub recovery_weights: RecoveryWeights,
    pub readiness_weights: ReadinessWeights,
    pub wellness_weights: WellnessWeights,
    /// Readiness inputs are never optional, so its confidence is fixed
    pub readiness_confidence: f64,
    /// Baseline wellness score used for `comparison_to_baseline`
    pub wellness_baseline: f64,
    pub wellness_goals: WellnessGoals,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            recovery_weights: RecoveryWeights::default(),
            readiness_weights: ReadinessWeights::default(),
            wellness_weights: WellnessWeights::default(),
            readiness_confidence: 0.85,
            wellness_baseline: 70.0,
            wellness_goals: WellnessGoals::default(),
        }
    }
}

impl ScoringConfig {
    /// Check every weight table sums to 1.0 and scalar settings are in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_weights("recovery", &self.recovery_weights.entries())?;
        validate_weights("readiness", &self.readiness_weights.entries())?;
        validate_weights("wellness", &self.wellness_weights.entries())?;

        if !(0.0..=1.0).contains(&self.readiness_confidence) {
            return Err(ConfigError::InvalidValue {
                field: "scoring.readiness_confidence".to_string(),
                reason: format!("{} is outside [0, 1]", self.readiness_confidence),
            });
        }
        if !(0.0..=100.0).contains(&self.wellness_baseline) {
            return Err(ConfigError::InvalidValue {
                field: "scoring.wellness_baseline".to_string(),
                reason: format!("{} is outside [0, 100]", self.wellness_baseline),
            });
        }
        self.wellness_goals.validate()
    }
}

/// Recovery, readiness and wellness score calculator
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    config: ScoringConfig,
}

impl ScoreCalculator {
    /// Create a calculator with the default weight tables
    pub fn new() -> Self {
        ScoreCalculator {
            config: ScoringConfig::default(),
        }
    }

    /// Create a calculator from custom configuration, validating weight tables
    pub fn with_config(config: ScoringConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(ScoreCalculator { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}
