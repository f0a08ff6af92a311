//! Recovery score
//!
//! Combines sleep, HRV, resting heart rate, recent training load and stress into a
//! single 0-100 score. Missing factors are left out of the weighted average rather
//! than imputed, and the share of the weight table actually used is reported as
//! `confidence`.

use super::ScoreCalculator;
use crate::models::{
    clamp_score, clamp_unit, latest_value, round_to, FactorMap, Impact, MetricSample, MetricType,
    UserBaselines, WeightedFactor, WorkoutRecord, NEUTRAL_SCORE,
};
use serde::{Deserialize, Serialize};
use std::fmt;

const SLEEP_HOURS_TIP: &str = "Aim for 7-9 hours of sleep";
const SLEEP_QUALITY_TIP: &str =
    "Improve sleep quality: avoid screens 1hr before bed, keep room cool and dark.";
const HRV_TIP: &str = "Your HRV is below baseline. Consider light activity or rest today.";
const RESTING_HR_TIP: &str = "Elevated resting HR may indicate incomplete recovery or stress.";
const TRAINING_LOAD_TIP: &str = "High training load this week. Consider a recovery day.";
const STRESS_TIP: &str = "High stress levels detected. Try meditation or breathing exercises.";

/// Inputs to the recovery score
///
/// Every factor except stress is optional. Non-positive sleep, HRV and resting HR
/// readings are treated as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryInputs {
    pub sleep_hours: Option<f64>,
    /// Sleep quality (0-100)
    pub sleep_quality: Option<f64>,
    /// HRV (RMSSD, ms)
    pub hrv: Option<f64>,
    /// Resting heart rate (bpm)
    pub resting_hr: Option<f64>,
    /// Summed training load over the last 7 days
    pub training_load_7d: Option<f64>,
    /// Perceived stress (1-10)
    pub stress_level: f64,
    pub baselines: UserBaselines,
}

impl Default for RecoveryInputs {
    fn default() -> Self {
        Self {
            sleep_hours: None,
            sleep_quality: None,
            hrv: None,
            resting_hr: None,
            training_load_7d: None,
            stress_level: 5.0,
            baselines: UserBaselines::default(),
        }
    }
}

impl RecoveryInputs {
    /// Build inputs from already-fetched rows
    ///
    /// `samples` and `workouts` are expected to cover the trailing 7-day window.
    /// Sleep falls back to 7 h at quality 70 and stress to 5 when unrecorded.
    pub fn from_records(
        samples: &[MetricSample],
        baselines: UserBaselines,
        workouts: &[WorkoutRecord],
    ) -> Self {
        let training_load_7d = workouts
            .iter()
            .map(|w| w.training_load.unwrap_or(0.0))
            .sum::<f64>();

        Self {
            sleep_hours: Some(latest_value(samples, &MetricType::SleepDuration).unwrap_or(7.0)),
            sleep_quality: Some(latest_value(samples, &MetricType::SleepQuality).unwrap_or(70.0)),
            hrv: latest_value(samples, &MetricType::Hrv),
            resting_hr: latest_value(samples, &MetricType::RestingHr),
            training_load_7d: Some(training_load_7d),
            stress_level: latest_value(samples, &MetricType::Stress).unwrap_or(5.0),
            baselines,
        }
    }
}

/// Recovery status bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryStatus {
    Recovered,
    Moderate,
    Fatigued,
    /// Only produced by a degraded dashboard section
    Unknown,
}

impl RecoveryStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RecoveryStatus::Recovered
        } else if score >= 50.0 {
            RecoveryStatus::Moderate
        } else {
            RecoveryStatus::Fatigued
        }
    }
}

impl fmt::Display for RecoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStatus::Recovered => write!(f, "recovered"),
            RecoveryStatus::Moderate => write!(f, "moderate"),
            RecoveryStatus::Fatigued => write!(f, "fatigued"),
            RecoveryStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Recovery score result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryResult {
    /// Score (0-100), rounded to 0.1
    pub score: f64,
    /// Share of the weight table backed by data (0-1), rounded to 0.01
    pub confidence: f64,
    pub status: RecoveryStatus,
    pub contributing_factors: FactorMap,
    pub recommendations: Vec<String>,
}

impl RecoveryResult {
    /// Contributing factors ordered from weakest to strongest score
    pub fn factors_by_score(&self) -> Vec<&WeightedFactor> {
        let mut factors: Vec<&WeightedFactor> = self.contributing_factors.values().collect();
        factors.sort_by(|a, b| a.score.total_cmp(&b.score));
        factors
    }
}

/// Sleep duration score: full marks inside 7-9 h
pub fn sleep_hours_score(hours: f64) -> f64 {
    if (7.0..=9.0).contains(&hours) {
        100.0
    } else if hours < 7.0 {
        (hours / 7.0) * 100.0
    } else {
        (100.0 - (hours - 9.0) * 10.0).max(70.0)
    }
}

/// Seven-day training load score: moderate load (200-500) is ideal
pub fn training_load_score(load: f64) -> f64 {
    if (200.0..=500.0).contains(&load) {
        90.0
    } else if load < 200.0 {
        70.0 + (load / 200.0) * 20.0
    } else {
        (90.0 - (load - 500.0) * 0.12).max(30.0)
    }
}

/// Stress score: lower stress is better
pub fn stress_score(stress_level: f64) -> f64 {
    ((10.0 - stress_level) / 10.0 * 100.0).max(0.0)
}

struct WeightedSum {
    sum: f64,
    weights_used: f64,
}

impl WeightedSum {
    fn add(&mut self, score: f64, weight: f64) {
        self.sum += score * weight;
        self.weights_used += weight;
    }
}

impl ScoreCalculator {
    /// Calculate the recovery score
    pub fn calculate_recovery(&self, inputs: &RecoveryInputs) -> RecoveryResult {
        let weights = &self.config.recovery_weights;
        let baselines = &inputs.baselines;
        let mut factors = FactorMap::new();
        let mut acc = WeightedSum {
            sum: 0.0,
            weights_used: 0.0,
        };

        if let Some(hours) = inputs.sleep_hours.filter(|h| *h > 0.0) {
            let score = sleep_hours_score(hours);
            let impact = if score > 70.0 { Impact::Positive } else { Impact::Negative };
            let mut factor = WeightedFactor::new("sleep_hours", hours, score, impact);
            if score < 70.0 {
                factor = factor.with_recommendation(SLEEP_HOURS_TIP);
            }
            factors.insert(factor.name.clone(), factor);
            acc.add(score, weights.sleep_hours);
        }

        if let Some(quality) = inputs.sleep_quality.filter(|q| *q > 0.0) {
            let score = clamp_score(quality);
            let impact = if score > 70.0 { Impact::Positive } else { Impact::Negative };
            let mut factor = WeightedFactor::new("sleep_quality", quality, score, impact);
            if score < 70.0 {
                factor = factor.with_recommendation(SLEEP_QUALITY_TIP);
            }
            factors.insert(factor.name.clone(), factor);
            acc.add(score, weights.sleep_quality);
        }

        if let Some(hrv) = inputs.hrv.filter(|v| *v > 0.0) {
            if baselines.hrv_baseline > 0.0 {
                let score = clamp_score((hrv / baselines.hrv_baseline) * 80.0);
                let below = hrv < baselines.hrv_baseline;
                let impact = if below { Impact::Negative } else { Impact::Positive };
                let mut factor = WeightedFactor::new("hrv", hrv, score, impact)
                    .with_baseline(baselines.hrv_baseline);
                if below {
                    factor = factor.with_recommendation(HRV_TIP);
                }
                factors.insert(factor.name.clone(), factor);
                acc.add(score, weights.hrv);
            }
        }

        if let Some(rhr) = inputs.resting_hr.filter(|v| *v > 0.0) {
            if baselines.rhr_baseline > 0.0 {
                let score = clamp_score((baselines.rhr_baseline / rhr) * 80.0);
                let elevated = rhr > baselines.rhr_baseline;
                let impact = if elevated { Impact::Negative } else { Impact::Positive };
                let mut factor = WeightedFactor::new("resting_hr", rhr, score, impact)
                    .with_baseline(baselines.rhr_baseline);
                if elevated {
                    factor = factor.with_recommendation(RESTING_HR_TIP);
                }
                factors.insert(factor.name.clone(), factor);
                acc.add(score, weights.resting_hr);
            }
        }

        if let Some(load) = inputs.training_load_7d.filter(|l| *l >= 0.0) {
            let score = training_load_score(load);
            let in_range = (200.0..=500.0).contains(&load);
            let impact = if in_range { Impact::Positive } else { Impact::Negative };
            let mut factor = WeightedFactor::new("training_load", load, score, impact);
            if load > 500.0 {
                factor = factor.with_recommendation(TRAINING_LOAD_TIP);
            }
            factors.insert(factor.name.clone(), factor);
            acc.add(score, weights.training_load);
        }

        let stress = inputs.stress_level;
        let score = stress_score(stress);
        let impact = if stress <= 4.0 { Impact::Positive } else { Impact::Negative };
        let mut factor = WeightedFactor::new("stress", stress, score, impact);
        if stress > 6.0 {
            factor = factor.with_recommendation(STRESS_TIP);
        }
        factors.insert(factor.name.clone(), factor);
        acc.add(score, weights.stress);

        let score = if acc.weights_used > 0.0 {
            clamp_score(acc.sum / acc.weights_used)
        } else {
            NEUTRAL_SCORE
        };
        let total = weights.total();
        let confidence = if total > 0.0 {
            clamp_unit(acc.weights_used / total)
        } else {
            0.0
        };

        let status = RecoveryStatus::from_score(score);
        let recommendations = recovery_recommendations(&factors, score);

        tracing::debug!(
            score,
            confidence,
            weights_used = acc.weights_used,
            factor_count = factors.len(),
            "Recovery score calculated"
        );

        RecoveryResult {
            score: round_to(score, 1),
            confidence: round_to(confidence, 2),
            status,
            contributing_factors: factors,
            recommendations,
        }
    }
}

fn recovery_recommendations(factors: &FactorMap, score: f64) -> Vec<String> {
    let mut recommendations = Vec::new();

    if let Some(sleep) = factors.get("sleep_hours").filter(|f| f.score < 70.0) {
        recommendations.push(format!(
            "{}. You got {:.1} hours.",
            SLEEP_HOURS_TIP, sleep.value
        ));
    }
    if factors.get("sleep_quality").is_some_and(|f| f.score < 70.0) {
        recommendations.push(SLEEP_QUALITY_TIP.to_string());
    }
    if factors
        .get("hrv")
        .is_some_and(|f| f.impact == Impact::Negative)
    {
        recommendations.push(HRV_TIP.to_string());
    }
    if factors
        .get("resting_hr")
        .is_some_and(|f| f.impact == Impact::Negative)
    {
        recommendations.push(RESTING_HR_TIP.to_string());
    }
    if factors.get("training_load").is_some_and(|f| f.value > 500.0) {
        recommendations.push(TRAINING_LOAD_TIP.to_string());
    }
    if factors.get("stress").is_some_and(|f| f.value > 6.0) {
        recommendations.push(STRESS_TIP.to_string());
    }

    if recommendations.is_empty() {
        if score >= 80.0 {
            recommendations.push("Great recovery! You're ready for a challenging workout.".to_string());
        } else {
            recommendations.push("Maintain consistent sleep and recovery habits.".to_string());
        }
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn calculator() -> ScoreCalculator {
        ScoreCalculator::new()
    }

    #[test]
    fn test_partial_inputs_confidence() {
        let inputs = RecoveryInputs {
            sleep_hours: Some(8.0),
            sleep_quality: Some(90.0),
            hrv: None,
            resting_hr: None,
            training_load_7d: Some(0.0),
            stress_level: 2.0,
            baselines: UserBaselines::default(),
        };

        let result = calculator().calculate_recovery(&inputs);

        assert_eq!(result.confidence, 0.65);
        assert_eq!(result.contributing_factors.len(), 4);
        assert!(!result.contributing_factors.contains_key("hrv"));

        // (100*.25 + 90*.20 + 70*.10 + 80*.10) / .65
        let expected = (25.0 + 18.0 + 7.0 + 8.0) / 0.65;
        assert!((result.score - round_to(expected, 1)).abs() < 1e-9);
        assert_eq!(result.status, RecoveryStatus::Recovered);
    }

    #[test]
    fn test_status_bands() {
        assert_eq!(RecoveryStatus::from_score(85.0), RecoveryStatus::Recovered);
        assert_eq!(RecoveryStatus::from_score(80.0), RecoveryStatus::Recovered);
        assert_eq!(RecoveryStatus::from_score(55.0), RecoveryStatus::Moderate);
        assert_eq!(RecoveryStatus::from_score(30.0), RecoveryStatus::Fatigued);
    }

    #[test]
    fn test_factor_scoring_rules() {
        assert_eq!(sleep_hours_score(8.0), 100.0);
        assert!((sleep_hours_score(3.5) - 50.0).abs() < 1e-9);
        assert_eq!(sleep_hours_score(10.0), 90.0);
        assert_eq!(sleep_hours_score(14.0), 70.0);

        assert_eq!(training_load_score(300.0), 90.0);
        assert_eq!(training_load_score(100.0), 80.0);
        assert!((training_load_score(600.0) - 78.0).abs() < 1e-9);
        assert_eq!(training_load_score(5000.0), 30.0);

        assert_eq!(stress_score(2.0), 80.0);
        assert_eq!(stress_score(12.0), 0.0);
    }

    #[test]
    fn test_full_inputs_have_full_confidence() {
        let inputs = RecoveryInputs {
            sleep_hours: Some(7.5),
            sleep_quality: Some(85.0),
            hrv: Some(60.0),
            resting_hr: Some(52.0),
            training_load_7d: Some(350.0),
            stress_level: 3.0,
            baselines: UserBaselines::default(),
        };

        let result = calculator().calculate_recovery(&inputs);

        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.contributing_factors["hrv"].baseline, Some(50.0));
        assert_eq!(result.contributing_factors["hrv"].impact, Impact::Positive);
        assert_eq!(
            result.recommendations,
            vec!["Great recovery! You're ready for a challenging workout.".to_string()]
        );
    }

    #[test]
    fn test_poor_recovery_recommendations() {
        let inputs = RecoveryInputs {
            sleep_hours: Some(4.0),
            sleep_quality: Some(40.0),
            hrv: Some(30.0),
            resting_hr: Some(75.0),
            training_load_7d: Some(800.0),
            stress_level: 8.0,
            baselines: UserBaselines::default(),
        };

        let result = calculator().calculate_recovery(&inputs);

        assert_eq!(result.status, RecoveryStatus::Fatigued);
        assert_eq!(result.recommendations.len(), 6);
        assert!(result.recommendations[0].contains("You got 4.0 hours"));
        assert_eq!(
            result.contributing_factors["training_load"].recommendation.as_deref(),
            Some(TRAINING_LOAD_TIP)
        );
        assert_eq!(result.factors_by_score()[0].name, "stress");
    }

    #[test]
    fn test_zero_baseline_skips_factor() {
        let inputs = RecoveryInputs {
            hrv: Some(55.0),
            baselines: UserBaselines {
                hrv_baseline: 0.0,
                rhr_baseline: 60.0,
            },
            ..RecoveryInputs::default()
        };

        let result = calculator().calculate_recovery(&inputs);

        assert!(!result.contributing_factors.contains_key("hrv"));
        assert_eq!(result.confidence, 0.1);
    }

    #[test]
    fn test_stress_only_uses_stress_score() {
        let inputs = RecoveryInputs {
            stress_level: 5.0,
            ..RecoveryInputs::default()
        };

        let result = calculator().calculate_recovery(&inputs);

        assert_eq!(result.score, 50.0);
        assert_eq!(result.status, RecoveryStatus::Moderate);
        assert_eq!(
            result.recommendations,
            vec!["Maintain consistent sleep and recovery habits.".to_string()]
        );
    }

    #[test]
    fn test_from_records_uses_latest_and_sums_load() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();
        let samples = vec![
            MetricSample::new(MetricType::SleepDuration, 6.0, now - Duration::days(2)),
            MetricSample::new(MetricType::SleepDuration, 8.5, now - Duration::hours(2)),
            MetricSample::new(MetricType::Hrv, 62.0, now - Duration::hours(1)),
        ];
        let workouts = vec![
            workout(now - Duration::days(1), Some(120.0)),
            workout(now - Duration::days(3), None),
            workout(now - Duration::days(4), Some(95.5)),
        ];

        let inputs = RecoveryInputs::from_records(&samples, UserBaselines::default(), &workouts);

        assert_eq!(inputs.sleep_hours, Some(8.5));
        assert_eq!(inputs.sleep_quality, Some(70.0));
        assert_eq!(inputs.hrv, Some(62.0));
        assert_eq!(inputs.resting_hr, None);
        assert_eq!(inputs.training_load_7d, Some(215.5));
        assert_eq!(inputs.stress_level, 5.0);
    }

    fn workout(start_time: DateTime<Utc>, training_load: Option<f64>) -> WorkoutRecord {
        WorkoutRecord {
            start_time,
            training_load,
            intensity: None,
            calories_burned: None,
            duration_minutes: None,
        }
    }

    proptest! {
        #[test]
        fn test_recovery_bounds(
            sleep_hours in proptest::option::of(0.0f64..16.0),
            sleep_quality in proptest::option::of(0.0f64..100.0),
            hrv in proptest::option::of(1.0f64..200.0),
            resting_hr in proptest::option::of(30.0f64..120.0),
            load in proptest::option::of(0.0f64..3000.0),
            stress in 1.0f64..10.0,
        ) {
            let inputs = RecoveryInputs {
                sleep_hours,
                sleep_quality,
                hrv,
                resting_hr,
                training_load_7d: load,
                stress_level: stress,
                baselines: UserBaselines::default(),
            };

            let calc = ScoreCalculator::new();
            let result = calc.calculate_recovery(&inputs);

            prop_assert!(result.score >= 0.0 && result.score <= 100.0);
            prop_assert!(result.confidence >= 0.0 && result.confidence <= 1.0);
            prop_assert!(!result.recommendations.is_empty());

            // Pure: identical inputs give identical output
            prop_assert_eq!(calc.calculate_recovery(&inputs), result);
        }
    }
}
