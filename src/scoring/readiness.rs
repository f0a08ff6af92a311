//! Training readiness score

use super::ScoreCalculator;
use crate::models::{
    clamp_score, latest_value, round_to, FactorMap, Impact, MetricSample, MetricType,
    WeightedFactor, WorkoutRecord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inputs to the readiness score, all always present
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadinessInputs {
    /// Current recovery score (0-100)
    pub recovery_score: f64,
    /// Last night's sleep quality (0-100)
    pub sleep_quality: f64,
    pub days_since_hard_workout: u32,
    /// Subjective energy (1-10)
    pub energy_level: f64,
    /// Muscle soreness (1-10, lower is better)
    pub muscle_soreness: f64,
}

impl Default for ReadinessInputs {
    fn default() -> Self {
        Self {
            recovery_score: 70.0,
            sleep_quality: 70.0,
            days_since_hard_workout: 2,
            energy_level: 7.0,
            muscle_soreness: 3.0,
        }
    }
}

impl ReadinessInputs {
    /// Build inputs from a freshly computed recovery score and fetched rows
    ///
    /// Days since the last hard workout default to 3 when no hard or very hard
    /// session is on record.
    pub fn from_records(
        recovery_score: f64,
        samples: &[MetricSample],
        workouts: &[WorkoutRecord],
        now: DateTime<Utc>,
    ) -> Self {
        let days_since_hard_workout = workouts
            .iter()
            .filter(|w| w.intensity.is_some_and(|i| i.is_hard()))
            .map(|w| w.start_time)
            .max()
            .map(|last| (now - last).num_days().max(0) as u32)
            .unwrap_or(3);

        Self {
            recovery_score,
            sleep_quality: latest_value(samples, &MetricType::SleepQuality).unwrap_or(70.0),
            days_since_hard_workout,
            energy_level: latest_value(samples, &MetricType::EnergyLevel).unwrap_or(7.0),
            muscle_soreness: latest_value(samples, &MetricType::Soreness).unwrap_or(3.0),
        }
    }
}

/// Recommended training intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityLevel {
    Rest,
    Light,
    Moderate,
    Hard,
}

impl IntensityLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            IntensityLevel::Hard
        } else if score >= 60.0 {
            IntensityLevel::Moderate
        } else if score >= 40.0 {
            IntensityLevel::Light
        } else {
            IntensityLevel::Rest
        }
    }

    pub fn suggested_workout_types(&self) -> Vec<String> {
        let types: &[&str] = match self {
            IntensityLevel::Hard => &["HIIT", "Strength Training", "Long Run", "Competition"],
            IntensityLevel::Moderate => &["Tempo Run", "Circuit Training", "Swimming", "Cycling"],
            IntensityLevel::Light => &["Yoga", "Walking", "Light Stretching", "Easy Swim"],
            IntensityLevel::Rest => &["Rest", "Meditation", "Gentle Stretching", "Massage"],
        };
        types.iter().map(|t| t.to_string()).collect()
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            IntensityLevel::Hard => "Great recovery! You're ready for high-intensity training.",
            IntensityLevel::Moderate => "Good recovery. Moderate training recommended.",
            IntensityLevel::Light => {
                "Recovery is below optimal. Consider light activity or active recovery."
            }
            IntensityLevel::Rest => "Your body needs rest. Prioritize recovery today.",
        }
    }
}

impl fmt::Display for IntensityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntensityLevel::Rest => write!(f, "rest"),
            IntensityLevel::Light => write!(f, "light"),
            IntensityLevel::Moderate => write!(f, "moderate"),
            IntensityLevel::Hard => write!(f, "hard"),
        }
    }
}

/// Readiness score result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResult {
    pub score: f64,
    pub confidence: f64,
    pub recommended_intensity: IntensityLevel,
    pub factors: FactorMap,
    pub suggested_workout_types: Vec<String>,
    pub recommendation: String,
}

/// Rest-day score: one to three days since a hard session is the sweet spot
pub fn rest_days_score(days: u32) -> f64 {
    match days {
        0 => 40.0,
        1..=3 => 90.0,
        d if d > 5 => 70.0,
        _ => 80.0,
    }
}

impl ScoreCalculator {
    /// Calculate the training readiness score
    pub fn calculate_readiness(&self, inputs: &ReadinessInputs) -> ReadinessResult {
        let weights = &self.config.readiness_weights;
        let mut factors = FactorMap::new();

        let recovery = WeightedFactor::new(
            "recovery",
            inputs.recovery_score,
            inputs.recovery_score,
            if inputs.recovery_score > 70.0 { Impact::Positive } else { Impact::Negative },
        );
        let sleep = WeightedFactor::new(
            "sleep",
            inputs.sleep_quality,
            inputs.sleep_quality,
            if inputs.sleep_quality > 70.0 { Impact::Positive } else { Impact::Negative },
        );
        let days = inputs.days_since_hard_workout;
        let rest_days = WeightedFactor::new(
            "rest_days",
            f64::from(days),
            rest_days_score(days),
            if (1..=3).contains(&days) { Impact::Positive } else { Impact::Neutral },
        );
        let energy = WeightedFactor::new(
            "energy",
            inputs.energy_level,
            inputs.energy_level / 10.0 * 100.0,
            if inputs.energy_level >= 7.0 { Impact::Positive } else { Impact::Negative },
        );
        let soreness = WeightedFactor::new(
            "soreness",
            inputs.muscle_soreness,
            (10.0 - inputs.muscle_soreness) / 10.0 * 100.0,
            if inputs.muscle_soreness <= 4.0 { Impact::Positive } else { Impact::Negative },
        );

        let score = clamp_score(
            recovery.score * weights.recovery_score
                + sleep.score * weights.sleep_quality
                + rest_days.score * weights.days_since_hard_workout
                + energy.score * weights.energy_level
                + soreness.score * weights.muscle_soreness,
        );

        for factor in [recovery, sleep, rest_days, energy, soreness] {
            factors.insert(factor.name.clone(), factor);
        }

        let intensity = IntensityLevel::from_score(score);

        tracing::debug!(score, intensity = %intensity, "Readiness score calculated");

        ReadinessResult {
            score: round_to(score, 1),
            confidence: self.config.readiness_confidence,
            recommended_intensity: intensity,
            factors,
            suggested_workout_types: intensity.suggested_workout_types(),
            recommendation: intensity.recommendation().to_string(),
        }
    }
}
