//! Progressive overload advisor
//!
//! Suggests the next working weight for an exercise from its recent session
//! history. The decision is a small classifier over the latest session's top set
//! and average RPE:
//!
//! - no usable history: `new`
//! - stagnant weight over the last sessions and RPE at or above 9: `deload`
//! - RPE at or below 8: `increase` by the category increment
//! - otherwise: `maintain`
//!
//! Sets flagged as warm-ups are dropped, and any remaining set under half of the
//! session's heaviest load is also treated as a warm-up. A deliberately light
//! back-off day is indistinguishable from warm-ups under this heuristic.

use crate::error::ConfigError;
use crate::models::{group_into_sessions, round_to, ExerciseCategory, ExerciseSession, WorkingSet};
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Progression decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressionStatus {
    New,
    Increase,
    Maintain,
    Deload,
}

impl fmt::Display for ProgressionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressionStatus::New => write!(f, "new"),
            ProgressionStatus::Increase => write!(f, "increase"),
            ProgressionStatus::Maintain => write!(f, "maintain"),
            ProgressionStatus::Deload => write!(f, "deload"),
        }
    }
}

/// Next-session weight suggestion for one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSuggestion {
    pub exercise: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub suggested_weight_kg: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub last_weight_kg: Option<Decimal>,
    pub last_reps: Option<u32>,
    pub last_rpe: Option<f64>,
    pub status: ProgressionStatus,
    pub reason: String,
}

impl ProgressionSuggestion {
    fn without_history(exercise: &str, reason: &str) -> Self {
        Self {
            exercise: exercise.to_string(),
            suggested_weight_kg: None,
            last_weight_kg: None,
            last_reps: None,
            last_rpe: None,
            status: ProgressionStatus::New,
            reason: reason.to_string(),
        }
    }
}

/// Recent history of one exercise, sessions most recent first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseHistory {
    pub exercise: String,
    pub category: ExerciseCategory,
    pub sessions: Vec<ExerciseSession>,
}

/// Progression rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    #[serde(with = "rust_decimal::serde::float")]
    pub upper_body_increment_kg: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub lower_body_increment_kg: Decimal,
    /// Multiplier applied to the last weight on deload
    #[serde(with = "rust_decimal::serde::float")]
    pub deload_factor: Decimal,
    /// Deloaded weights are rounded to a multiple of this
    #[serde(with = "rust_decimal::serde::float")]
    pub rounding_step_kg: Decimal,
    /// Sets lighter than this share of the session max are warm-ups
    #[serde(with = "rust_decimal::serde::float")]
    pub warmup_ratio: Decimal,
    /// Most recent sessions considered per exercise
    pub max_sessions: usize,
    /// Earlier sessions checked for stagnation
    pub deload_lookback: usize,
    pub increase_max_rpe: f64,
    pub deload_min_rpe: f64,
    /// RPE assumed when no working set tracked one
    pub default_rpe: f64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            upper_body_increment_kg: dec!(2.5),
            lower_body_increment_kg: dec!(5.0),
            deload_factor: dec!(0.9),
            rounding_step_kg: dec!(2.5),
            warmup_ratio: dec!(0.5),
            max_sessions: 10,
            deload_lookback: 2,
            increase_max_rpe: 8.0,
            deload_min_rpe: 9.0,
            default_rpe: 7.0,
        }
    }
}

impl ProgressionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: String| ConfigError::InvalidValue {
            field: format!("progression.{}", field),
            reason,
        };

        if self.upper_body_increment_kg <= Decimal::ZERO
            || self.lower_body_increment_kg <= Decimal::ZERO
        {
            return Err(invalid("increment_kg", "increments must be positive".to_string()));
        }
        if self.deload_factor <= Decimal::ZERO || self.deload_factor > Decimal::ONE {
            return Err(invalid(
                "deload_factor",
                format!("{} is outside (0, 1]", self.deload_factor),
            ));
        }
        if self.rounding_step_kg <= Decimal::ZERO {
            return Err(invalid(
                "rounding_step_kg",
                "step must be positive".to_string(),
            ));
        }
        if self.warmup_ratio < Decimal::ZERO || self.warmup_ratio >= Decimal::ONE {
            return Err(invalid(
                "warmup_ratio",
                format!("{} is outside [0, 1)", self.warmup_ratio),
            ));
        }
        if self.max_sessions == 0 {
            return Err(invalid("max_sessions", "must be at least 1".to_string()));
        }
        if self.increase_max_rpe > self.deload_min_rpe {
            return Err(invalid(
                "increase_max_rpe",
                format!(
                    "{} is above deload_min_rpe {}",
                    self.increase_max_rpe, self.deload_min_rpe
                ),
            ));
        }
        Ok(())
    }
}

/// Progressive overload advisor
#[derive(Debug, Clone, Default)]
pub struct ProgressionAdvisor {
    config: ProgressionConfig,
}

impl ProgressionAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ProgressionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    /// Working sets of one session
    ///
    /// Flagged warm-ups are dropped first. When the heaviest remaining load is
    /// not positive every remaining set is kept.
    pub fn working_sets<'a>(&self, sets: &'a [WorkingSet]) -> Vec<&'a WorkingSet> {
        let candidates: Vec<&WorkingSet> = sets.iter().filter(|s| !s.is_warmup).collect();
        let max_weight = candidates
            .iter()
            .map(|s| s.weight_kg)
            .max()
            .unwrap_or(Decimal::ZERO);

        if max_weight <= Decimal::ZERO {
            return candidates;
        }

        let threshold = max_weight * self.config.warmup_ratio;
        candidates
            .into_iter()
            .filter(|s| s.weight_kg >= threshold)
            .collect()
    }

    /// Suggest from raw sets, grouping them into sessions first
    pub fn suggest_from_sets(
        &self,
        exercise: &str,
        category: ExerciseCategory,
        sets: &[WorkingSet],
    ) -> ProgressionSuggestion {
        let sessions = group_into_sessions(sets);
        self.suggest(exercise, category, &sessions)
    }

    /// Suggest the next weight from sessions ordered most recent first
    pub fn suggest(
        &self,
        exercise: &str,
        category: ExerciseCategory,
        sessions: &[ExerciseSession],
    ) -> ProgressionSuggestion {
        let sessions: Vec<&ExerciseSession> = sessions
            .iter()
            .filter(|s| !s.sets.is_empty())
            .take(self.config.max_sessions)
            .collect();

        let Some(latest) = sessions.first() else {
            return ProgressionSuggestion::without_history(exercise, "No previous data");
        };

        let working = self.working_sets(&latest.sets);
        let Some(last_weight) = working.iter().map(|s| s.weight_kg).max() else {
            return ProgressionSuggestion::without_history(exercise, "No working sets found");
        };

        let last_reps = working
            .iter()
            .find(|s| s.weight_kg == last_weight)
            .map(|s| s.reps)
            .unwrap_or(0);

        let rpes: Vec<f64> = working.iter().filter_map(|s| s.rpe).collect();
        let avg_rpe = if rpes.is_empty() {
            self.config.default_rpe
        } else {
            rpes.iter().sum::<f64>() / rpes.len() as f64
        };

        let is_lower = category.is_lower_body();
        let increment = if is_lower {
            self.config.lower_body_increment_kg
        } else {
            self.config.upper_body_increment_kg
        };

        let stagnant = self.is_stagnant(&sessions, last_weight);

        let (status, suggested, reason) = if stagnant && avg_rpe >= self.config.deload_min_rpe {
            let deloaded = self.deload_weight(last_weight);
            let percent = ((Decimal::ONE - self.config.deload_factor) * Decimal::ONE_HUNDRED)
                .normalize();
            (
                ProgressionStatus::Deload,
                deloaded,
                format!(
                    "-{}% deload ({}kg → {}kg)",
                    percent,
                    last_weight.normalize(),
                    deloaded.normalize()
                ),
            )
        } else if avg_rpe <= self.config.increase_max_rpe && last_reps >= 1 {
            let body = if is_lower { "lower body" } else { "upper body" };
            (
                ProgressionStatus::Increase,
                last_weight + increment,
                format!("+{}kg ({} progression)", increment.normalize(), body),
            )
        } else if last_reps == 0 {
            (
                ProgressionStatus::Maintain,
                last_weight,
                "No completed reps at top weight, maintain current weight".to_string(),
            )
        } else {
            (
                ProgressionStatus::Maintain,
                last_weight,
                "RPE high, maintain current weight".to_string(),
            )
        };

        tracing::debug!(
            exercise,
            status = %status,
            sessions = sessions.len(),
            avg_rpe,
            "Progression suggestion computed"
        );

        ProgressionSuggestion {
            exercise: exercise.to_string(),
            suggested_weight_kg: Some(suggested),
            last_weight_kg: Some(last_weight),
            last_reps: Some(last_reps),
            last_rpe: Some(round_to(avg_rpe, 1)),
            status,
            reason,
        }
    }

    /// Suggestions for several exercises, keyed by exercise name
    pub fn suggest_batch(
        &self,
        histories: &[ExerciseHistory],
    ) -> BTreeMap<String, ProgressionSuggestion> {
        histories
            .par_iter()
            .map(|h| {
                (
                    h.exercise.clone(),
                    self.suggest(&h.exercise, h.category, &h.sessions),
                )
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }

    /// Last weight scaled by the deload factor, rounded to the nearest step
    pub fn deload_weight(&self, last_weight: Decimal) -> Decimal {
        let step = self.config.rounding_step_kg;
        (last_weight * self.config.deload_factor / step).round() * step
    }

    /// True when no earlier session in the lookback beat the current max
    ///
    /// Requires at least two sessions. An earlier session with no working sets
    /// breaks the streak.
    fn is_stagnant(&self, sessions: &[&ExerciseSession], current_max: Decimal) -> bool {
        if sessions.len() < 2 {
            return false;
        }

        sessions
            .iter()
            .skip(1)
            .take(self.config.deload_lookback)
            .all(|session| {
                self.working_sets(&session.sets)
                    .iter()
                    .map(|s| s.weight_kg)
                    .max()
                    .is_some_and(|session_max| session_max <= current_max)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 20, 18, 0, 0).unwrap() - Duration::days(n)
    }

    fn set(weight: Decimal, reps: u32, rpe: Option<f64>, when: DateTime<Utc>) -> WorkingSet {
        WorkingSet {
            exercise: "Bench Press".to_string(),
            category: ExerciseCategory::Chest,
            weight_kg: weight,
            reps,
            rpe,
            is_warmup: false,
            performed_at: when,
        }
    }

    fn session(days_ago: i64, sets: Vec<(Decimal, u32, Option<f64>)>) -> ExerciseSession {
        let when = day(days_ago);
        ExerciseSession {
            performed_at: when,
            sets: sets
                .into_iter()
                .map(|(w, r, rpe)| set(w, r, rpe, when))
                .collect(),
        }
    }

    #[test]
    fn test_single_session_increase() {
        let advisor = ProgressionAdvisor::new();
        let sessions = vec![session(2, vec![(dec!(100), 5, Some(7.0))])];

        let s = advisor.suggest("Bench Press", ExerciseCategory::Chest, &sessions);

        assert_eq!(s.status, ProgressionStatus::Increase);
        assert_eq!(s.suggested_weight_kg, Some(dec!(102.5)));
        assert_eq!(s.last_weight_kg, Some(dec!(100)));
        assert_eq!(s.last_reps, Some(5));
        assert_eq!(s.reason, "+2.5kg (upper body progression)");
    }

    #[test]
    fn test_stagnation_triggers_deload() {
        let advisor = ProgressionAdvisor::new();
        let sessions = vec![
            session(2, vec![(dec!(100), 5, Some(9.0))]),
            session(5, vec![(dec!(100), 5, Some(9.0))]),
            session(9, vec![(dec!(100), 5, Some(9.0))]),
        ];

        let s = advisor.suggest("Bench Press", ExerciseCategory::Chest, &sessions);

        assert_eq!(s.status, ProgressionStatus::Deload);
        assert_eq!(s.suggested_weight_kg, Some(dec!(90)));
        assert_eq!(s.reason, "-10% deload (100kg → 90kg)");
        assert_eq!(s.last_rpe, Some(9.0));
    }

    #[test]
    fn test_prior_heavier_session_blocks_deload() {
        let advisor = ProgressionAdvisor::new();
        let sessions = vec![
            session(2, vec![(dec!(100), 5, Some(9.5))]),
            session(5, vec![(dec!(105), 3, Some(9.0))]),
        ];

        let s = advisor.suggest("Bench Press", ExerciseCategory::Chest, &sessions);

        assert_eq!(s.status, ProgressionStatus::Maintain);
        assert_eq!(s.suggested_weight_kg, Some(dec!(100)));
        assert_eq!(s.reason, "RPE high, maintain current weight");
    }

    #[test]
    fn test_single_session_never_deloads() {
        let advisor = ProgressionAdvisor::new();
        let sessions = vec![session(1, vec![(dec!(100), 5, Some(10.0))])];

        let s = advisor.suggest("Bench Press", ExerciseCategory::Chest, &sessions);

        assert_eq!(s.status, ProgressionStatus::Maintain);
    }

    #[test]
    fn test_warmups_excluded_from_top_set_and_rpe() {
        let advisor = ProgressionAdvisor::new();
        let sessions = vec![session(
            1,
            vec![
                (dec!(20), 10, Some(3.0)),
                (dec!(35), 8, Some(4.0)),
                (dec!(80), 5, Some(8.0)),
                (dec!(80), 5, Some(8.0)),
            ],
        )];

        let s = advisor.suggest("Squat", ExerciseCategory::Legs, &sessions);

        assert_eq!(s.status, ProgressionStatus::Increase);
        assert_eq!(s.last_rpe, Some(8.0));
        assert_eq!(s.suggested_weight_kg, Some(dec!(85)));
        assert_eq!(s.reason, "+5kg (lower body progression)");
    }

    #[test]
    fn test_flagged_warmups_dropped() {
        let advisor = ProgressionAdvisor::new();
        let mut warmup = set(dec!(70), 3, Some(5.0), day(1));
        warmup.is_warmup = true;
        let sets = vec![warmup, set(dec!(60), 8, Some(7.0), day(1))];

        let working = advisor.working_sets(&sets);

        assert_eq!(working.len(), 1);
        assert_eq!(working[0].weight_kg, dec!(60));
    }

    #[test]
    fn test_no_history_is_new() {
        let advisor = ProgressionAdvisor::new();

        let s = advisor.suggest("Deadlift", ExerciseCategory::Back, &[]);
        assert_eq!(s.status, ProgressionStatus::New);
        assert_eq!(s.suggested_weight_kg, None);
        assert_eq!(s.reason, "No previous data");

        let mut warmup = set(dec!(60), 5, None, day(1));
        warmup.is_warmup = true;
        let s = advisor.suggest_from_sets("Deadlift", ExerciseCategory::Back, &[warmup]);
        assert_eq!(s.status, ProgressionStatus::New);
        assert_eq!(s.reason, "No working sets found");
    }

    #[test]
    fn test_untracked_rpe_defaults_to_seven() {
        let advisor = ProgressionAdvisor::new();
        let sessions = vec![session(1, vec![(dec!(50), 8, None)])];

        let s = advisor.suggest("Overhead Press", ExerciseCategory::Shoulders, &sessions);

        assert_eq!(s.last_rpe, Some(7.0));
        assert_eq!(s.status, ProgressionStatus::Increase);
    }

    #[test]
    fn test_deload_rounds_to_step() {
        let advisor = ProgressionAdvisor::new();
        assert_eq!(advisor.deload_weight(dec!(100)), dec!(90));
        // 67.5 * 0.9 = 60.75 -> 24.3 steps -> 60
        assert_eq!(advisor.deload_weight(dec!(67.5)), dec!(60));
        assert_eq!(advisor.deload_weight(dec!(142.5)), dec!(127.5));
    }

    #[test]
    fn test_batch_matches_individual() {
        let advisor = ProgressionAdvisor::new();
        let histories = vec![
            ExerciseHistory {
                exercise: "Bench Press".to_string(),
                category: ExerciseCategory::Chest,
                sessions: vec![session(2, vec![(dec!(100), 5, Some(7.0))])],
            },
            ExerciseHistory {
                exercise: "Squat".to_string(),
                category: ExerciseCategory::Legs,
                sessions: vec![],
            },
        ];

        let batch = advisor.suggest_batch(&histories);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch["Squat"].status, ProgressionStatus::New);
        assert_eq!(
            batch["Bench Press"],
            advisor.suggest("Bench Press", ExerciseCategory::Chest, &histories[0].sessions)
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ProgressionConfig {
            deload_factor: dec!(1.2),
            ..ProgressionConfig::default()
        };
        assert!(ProgressionAdvisor::with_config(config).is_err());
    }
}
