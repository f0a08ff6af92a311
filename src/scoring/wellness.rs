//! Daily wellness score
//!
//! Wellness is built in two steps. Raw daily metrics are first reduced to four
//! component scores (activity, sleep, recovery, mental); those are then combined
//! with pass-through nutrition and training-load scores into the overall score.

use super::ScoreCalculator;
use crate::error::ConfigError;
use crate::models::{clamp_score, latest_value, round_to, MetricSample, MetricType, NEUTRAL_SCORE};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fmt;

/// Score used for pass-through components that were not supplied
pub const PASS_THROUGH_DEFAULT: f64 = 70.0;

/// Change in mean score that counts as a trend
pub const TREND_THRESHOLD: f64 = 5.0;

/// Daily targets used to normalize activity and recovery metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WellnessGoals {
    pub steps: f64,
    pub active_calories: f64,
    pub hrv_baseline: f64,
    pub resting_hr_optimal: f64,
}

impl Default for WellnessGoals {
    fn default() -> Self {
        Self {
            steps: 10_000.0,
            active_calories: 500.0,
            hrv_baseline: 50.0,
            resting_hr_optimal: 60.0,
        }
    }
}

impl WellnessGoals {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let goals = [
            ("steps", self.steps),
            ("active_calories", self.active_calories),
            ("hrv_baseline", self.hrv_baseline),
            ("resting_hr_optimal", self.resting_hr_optimal),
        ];
        for (name, value) in goals {
            if !(value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field: format!("scoring.wellness_goals.{}", name),
                    reason: format!("goal must be positive, got {}", value),
                });
            }
        }
        Ok(())
    }
}

/// One day of raw wellness inputs; every field is optional
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyMetrics {
    pub steps: Option<f64>,
    pub active_calories: Option<f64>,
    pub sleep_duration_hours: Option<f64>,
    /// 0-100
    pub sleep_quality: Option<f64>,
    pub resting_hr: Option<f64>,
    pub hrv: Option<f64>,
    /// 1-10
    pub energy_level: Option<f64>,
    /// 1-10
    pub mood: Option<f64>,
    /// 1-10
    pub stress: Option<f64>,
    /// 1-10
    pub soreness: Option<f64>,
}

impl DailyMetrics {
    /// Latest value of each metric among `samples`
    pub fn from_samples(samples: &[MetricSample]) -> Self {
        Self {
            steps: latest_value(samples, &MetricType::Steps),
            active_calories: latest_value(samples, &MetricType::ActiveCalories),
            sleep_duration_hours: latest_value(samples, &MetricType::SleepDuration),
            sleep_quality: latest_value(samples, &MetricType::SleepQuality),
            resting_hr: latest_value(samples, &MetricType::RestingHr),
            hrv: latest_value(samples, &MetricType::Hrv),
            energy_level: latest_value(samples, &MetricType::EnergyLevel),
            mood: latest_value(samples, &MetricType::Mood),
            stress: latest_value(samples, &MetricType::Stress),
            soreness: latest_value(samples, &MetricType::Soreness),
        }
    }

    /// Share of the ten fields that are present (0-1)
    pub fn completeness(&self) -> f64 {
        let fields = [
            self.steps,
            self.active_calories,
            self.sleep_duration_hours,
            self.sleep_quality,
            self.resting_hr,
            self.hrv,
            self.energy_level,
            self.mood,
            self.stress,
            self.soreness,
        ];
        fields.iter().filter(|f| f.is_some()).count() as f64 / fields.len() as f64
    }
}

/// Component scores derived from [`DailyMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub activity: f64,
    pub sleep: f64,
    pub recovery: f64,
    pub mental: f64,
    pub data_completeness: f64,
}

impl Default for ComponentScores {
    fn default() -> Self {
        Self {
            activity: NEUTRAL_SCORE,
            sleep: NEUTRAL_SCORE,
            recovery: NEUTRAL_SCORE,
            mental: NEUTRAL_SCORE,
            data_completeness: 0.0,
        }
    }
}

/// Inputs to the overall wellness score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessInputs {
    pub components: ComponentScores,
    /// Nutrition adherence score, computed elsewhere
    pub nutrition: Option<f64>,
    /// Training load score, computed by the recovery model
    pub training_load: Option<f64>,
    /// Earlier overall scores, most recent first
    pub previous_scores: Vec<f64>,
}

/// Direction of a score series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl Trend {
    /// Compare a recent mean against an older mean
    pub fn compare(recent: f64, older: f64, threshold: f64) -> Self {
        if recent > older + threshold {
            Trend::Improving
        } else if recent < older - threshold {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }

    /// Trend of a most-recent-first history
    ///
    /// The three most recent scores are compared against the mean of the rest.
    /// Fewer than three points is always stable.
    pub fn from_history(previous_scores: &[f64]) -> Self {
        if previous_scores.len() < 3 {
            return Trend::Stable;
        }
        let (recent, older) = previous_scores.split_at(3);
        let recent_mean = recent.iter().mean();
        let older_mean = if older.is_empty() {
            recent_mean
        } else {
            older.iter().mean()
        };
        Trend::compare(recent_mean, older_mean, TREND_THRESHOLD)
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Improving => write!(f, "improving"),
            Trend::Stable => write!(f, "stable"),
            Trend::Declining => write!(f, "declining"),
        }
    }
}

/// Wellness score result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessResult {
    pub overall_score: f64,
    pub components: BTreeMap<String, f64>,
    pub trend: Trend,
    pub comparison_to_baseline: f64,
    pub data_completeness: f64,
}

fn mean_or_neutral(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        NEUTRAL_SCORE
    } else {
        clamp_score(scores.iter().mean())
    }
}

/// Sleep duration score for the wellness model
///
/// Short nights are penalized twice as hard as long ones.
pub fn wellness_sleep_duration_score(hours: f64) -> f64 {
    if (7.0..=9.0).contains(&hours) {
        100.0
    } else if hours < 7.0 {
        (100.0 - (7.0 - hours) * 20.0).max(0.0)
    } else {
        (100.0 - (hours - 9.0) * 10.0).max(0.0)
    }
}

impl ScoreCalculator {
    /// Reduce a day of raw metrics to component scores
    pub fn wellness_components(&self, metrics: &DailyMetrics) -> ComponentScores {
        let goals = &self.config.wellness_goals;

        let mut activity = Vec::with_capacity(2);
        if let Some(steps) = metrics.steps {
            activity.push((steps / goals.steps * 100.0).min(100.0));
        }
        if let Some(kcal) = metrics.active_calories {
            activity.push((kcal / goals.active_calories * 100.0).min(100.0));
        }

        let mut sleep = Vec::with_capacity(2);
        if let Some(hours) = metrics.sleep_duration_hours {
            sleep.push(wellness_sleep_duration_score(hours));
        }
        if let Some(quality) = metrics.sleep_quality {
            sleep.push(quality);
        }

        let mut recovery = Vec::with_capacity(3);
        if let Some(hrv) = metrics.hrv {
            recovery.push((hrv / goals.hrv_baseline * 70.0 + 30.0).min(100.0));
        }
        if let Some(rhr) = metrics.resting_hr {
            let optimal = goals.resting_hr_optimal;
            recovery.push(if rhr <= optimal {
                100.0
            } else {
                (100.0 - (rhr - optimal) * 2.0).max(0.0)
            });
        }
        if let Some(soreness) = metrics.soreness {
            recovery.push((10.0 - soreness) * 10.0);
        }

        let mut mental = Vec::with_capacity(3);
        if let Some(energy) = metrics.energy_level {
            mental.push(energy * 10.0);
        }
        if let Some(mood) = metrics.mood {
            mental.push(mood * 10.0);
        }
        if let Some(stress) = metrics.stress {
            mental.push((10.0 - stress) * 10.0);
        }

        ComponentScores {
            activity: round_to(mean_or_neutral(&activity), 1),
            sleep: round_to(mean_or_neutral(&sleep), 1),
            recovery: round_to(mean_or_neutral(&recovery), 1),
            mental: round_to(mean_or_neutral(&mental), 1),
            data_completeness: round_to(metrics.completeness(), 2),
        }
    }

    /// Calculate the overall wellness score
    pub fn calculate_wellness(&self, inputs: &WellnessInputs) -> WellnessResult {
        let weights = &self.config.wellness_weights;
        let c = &inputs.components;
        let nutrition = clamp_score(inputs.nutrition.unwrap_or(PASS_THROUGH_DEFAULT));
        let training_load = clamp_score(inputs.training_load.unwrap_or(PASS_THROUGH_DEFAULT));

        let scored = [
            ("sleep", clamp_score(c.sleep), weights.sleep),
            ("activity", clamp_score(c.activity), weights.activity),
            ("recovery", clamp_score(c.recovery), weights.recovery),
            ("mental", clamp_score(c.mental), weights.mental),
            ("nutrition", nutrition, weights.nutrition),
            ("training_load", training_load, weights.training_load),
        ];

        let overall = clamp_score(scored.iter().map(|(_, score, weight)| score * weight).sum());
        let components = scored
            .iter()
            .map(|(name, score, _)| (name.to_string(), round_to(*score, 1)))
            .collect();

        let trend = Trend::from_history(&inputs.previous_scores);

        tracing::debug!(
            overall,
            trend = %trend,
            history_len = inputs.previous_scores.len(),
            "Wellness score calculated"
        );

        WellnessResult {
            overall_score: round_to(overall, 1),
            components,
            trend,
            comparison_to_baseline: round_to(overall - self.config.wellness_baseline, 1),
            data_completeness: c.data_completeness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn inputs(previous_scores: Vec<f64>) -> WellnessInputs {
        WellnessInputs {
            components: ComponentScores {
                activity: 80.0,
                sleep: 90.0,
                recovery: 70.0,
                mental: 60.0,
                data_completeness: 1.0,
            },
            nutrition: Some(75.0),
            training_load: None,
            previous_scores,
        }
    }

    #[test]
    fn test_overall_weighting() {
        let result = ScoreCalculator::new().calculate_wellness(&inputs(vec![]));

        // 90*.2 + 80*.2 + 70*.15 + 60*.15 + 75*.2 + 70*.1
        assert_eq!(result.overall_score, 75.5);
        assert_eq!(result.comparison_to_baseline, 5.5);
        assert_eq!(result.components["training_load"], 70.0);
        assert_eq!(result.components.len(), 6);
        assert_eq!(result.trend, Trend::Stable);
    }

    #[test]
    fn test_trend_uses_most_recent_scores() {
        // Most recent first: the last three days are clearly higher
        assert_eq!(
            Trend::from_history(&[80.0, 82.0, 81.0, 70.0, 68.0, 71.0]),
            Trend::Improving
        );
        assert_eq!(
            Trend::from_history(&[60.0, 61.0, 59.0, 70.0, 72.0]),
            Trend::Declining
        );
        assert_eq!(Trend::from_history(&[90.0, 40.0, 60.0]), Trend::Stable);
        assert_eq!(Trend::from_history(&[90.0, 40.0]), Trend::Stable);
    }

    #[test]
    fn test_components_neutral_when_empty() {
        let components = ScoreCalculator::new().wellness_components(&DailyMetrics::default());

        assert_eq!(components, ComponentScores::default());
    }

    #[test]
    fn test_component_formulas() {
        let metrics = DailyMetrics {
            steps: Some(12_000.0),
            active_calories: Some(250.0),
            sleep_duration_hours: Some(6.0),
            sleep_quality: Some(70.0),
            resting_hr: Some(65.0),
            hrv: Some(50.0),
            energy_level: Some(8.0),
            mood: None,
            stress: Some(4.0),
            soreness: Some(2.0),
        };

        let components = ScoreCalculator::new().wellness_components(&metrics);

        assert_eq!(components.activity, 75.0);
        assert_eq!(components.sleep, 75.0);
        // (100 + 90 + 80) / 3
        assert_eq!(components.recovery, 90.0);
        assert_eq!(components.mental, 70.0);
        assert_eq!(components.data_completeness, 0.9);
    }

    #[test]
    fn test_sleep_duration_curve() {
        assert_eq!(wellness_sleep_duration_score(8.0), 100.0);
        assert_eq!(wellness_sleep_duration_score(5.0), 60.0);
        assert_eq!(wellness_sleep_duration_score(1.0), 0.0);
        assert_eq!(wellness_sleep_duration_score(11.0), 80.0);
    }

    #[test]
    fn test_goal_validation() {
        let goals = WellnessGoals {
            steps: 0.0,
            ..WellnessGoals::default()
        };
        assert!(goals.validate().is_err());
        assert!(WellnessGoals::default().validate().is_ok());
    }

    proptest! {
        #[test]
        fn test_wellness_bounds(
            activity in 0.0f64..100.0,
            sleep in 0.0f64..100.0,
            recovery in 0.0f64..100.0,
            mental in 0.0f64..100.0,
            nutrition in proptest::option::of(0.0f64..100.0),
            history in proptest::collection::vec(0.0f64..100.0, 0..10),
        ) {
            let inputs = WellnessInputs {
                components: ComponentScores { activity, sleep, recovery, mental, data_completeness: 0.5 },
                nutrition,
                training_load: None,
                previous_scores: history,
            };
            let calc = ScoreCalculator::new();
            let result = calc.calculate_wellness(&inputs);

            prop_assert!(result.overall_score >= 0.0 && result.overall_score <= 100.0);
            prop_assert_eq!(calc.calculate_wellness(&inputs), result);
        }
    }
}
