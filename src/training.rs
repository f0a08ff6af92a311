//! Strength-training analytics
//!
//! Volume trends, per-muscle-group recovery balance, key-lift progress and
//! personal-record detection over logged working sets.

use crate::error::ConfigError;
use crate::models::{
    round_to, window_start, ExerciseCategory, PersonalRecord, RecordType, WorkingSet,
    MAX_WINDOW_DAYS,
};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Compound lifts tracked on the dashboard, in display order
pub const DEFAULT_KEY_LIFTS: [&str; 5] = ["Bench Press", "Squat", "Deadlift", "Overhead Press", "Barbell Row"];

/// Training analytics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Lift names matched by case-insensitive substring
    pub key_lifts: Vec<String>,
    pub max_key_lifts: usize,
    /// Length of each key-lift comparison window
    pub lift_window_days: i64,
    pub top_exercises: usize,
    pub pr_window_days: i64,
    pub max_recent_prs: usize,
    /// Muscle groups trained this recently are still recovering
    pub recovering_days: i64,
    /// Muscle groups untrained for longer than this need attention
    pub needs_attention_days: i64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            key_lifts: DEFAULT_KEY_LIFTS.iter().map(|s| s.to_string()).collect(),
            max_key_lifts: 4,
            lift_window_days: 30,
            top_exercises: 10,
            pr_window_days: 30,
            max_recent_prs: 5,
            recovering_days: 1,
            needs_attention_days: 7,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, days) in [
            ("training.lift_window_days", self.lift_window_days),
            ("training.pr_window_days", self.pr_window_days),
        ] {
            if !(1..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("{} is outside 1..={}", days, MAX_WINDOW_DAYS),
                });
            }
        }
        if self.recovering_days >= self.needs_attention_days {
            return Err(ConfigError::InvalidValue {
                field: "training.recovering_days".to_string(),
                reason: format!(
                    "{} must be below needs_attention_days ({})",
                    self.recovering_days, self.needs_attention_days
                ),
            });
        }
        Ok(())
    }
}

/// Length of a volume comparison period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VolumePeriod {
    #[default]
    Week,
    Month,
}

impl VolumePeriod {
    pub fn days(&self) -> i64 {
        match self {
            VolumePeriod::Week => 7,
            VolumePeriod::Month => 30,
        }
    }
}

impl fmt::Display for VolumePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumePeriod::Week => write!(f, "week"),
            VolumePeriod::Month => write!(f, "month"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseVolume {
    pub exercise: String,
    pub volume: f64,
    pub sets: usize,
}

/// Working-set volume for one period against the period before it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnalytics {
    pub period: VolumePeriod,
    pub total_volume: f64,
    pub previous_volume: f64,
    /// Percent change against the previous period, 0 when it had no volume
    pub trend_pct: f64,
    pub volume_by_category: BTreeMap<ExerciseCategory, f64>,
    /// Highest-volume exercises of the period, largest first
    pub top_exercises: Vec<ExerciseVolume>,
}

/// Recovery state of a muscle group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    Recovered,
    Recovering,
    NeedsAttention,
}

impl fmt::Display for BalanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceStatus::Recovered => write!(f, "recovered"),
            BalanceStatus::Recovering => write!(f, "recovering"),
            BalanceStatus::NeedsAttention => write!(f, "needs_attention"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleGroupStats {
    pub category: ExerciseCategory,
    pub volume_7d: f64,
    pub set_count_7d: usize,
    pub last_trained: Option<DateTime<Utc>>,
    pub days_since_trained: Option<i64>,
    pub status: BalanceStatus,
}

/// Best working weight of a key lift against the previous window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftProgress {
    pub exercise_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_kg: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub change_kg: Decimal,
    pub change_percent: f64,
    pub period_days: i64,
}

/// Epley estimate of a one-rep max
pub fn estimated_one_rep_max(weight_kg: Decimal, reps: u32) -> Decimal {
    if reps <= 1 {
        return weight_kg;
    }
    (weight_kg * (Decimal::ONE + Decimal::from(reps) / Decimal::from(30))).round_dp(1)
}

/// Record a new set would set, if any
///
/// Only sets of 1, 3, 5 or 10 reps are tracked. A record is set when none
/// exists yet for the exercise and rep count, or when the load beats it.
pub fn detect_pr(set: &WorkingSet, existing: &[PersonalRecord]) -> Option<PersonalRecord> {
    if set.is_warmup || set.weight_kg <= Decimal::ZERO {
        return None;
    }
    let record_type = RecordType::from_reps(set.reps)?;

    let current = existing
        .iter()
        .filter(|r| r.record_type == record_type && r.exercise_name.eq_ignore_ascii_case(&set.exercise))
        .map(|r| r.value)
        .max();

    match current {
        Some(best) if set.weight_kg <= best => None,
        previous => Some(PersonalRecord {
            exercise_name: set.exercise.clone(),
            record_type,
            value: set.weight_kg,
            previous_value: previous,
            achieved_at: set.performed_at,
        }),
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn is_working(set: &WorkingSet) -> bool {
    !set.is_warmup
}

/// Training analytics over logged sets
#[derive(Debug, Clone, Default)]
pub struct TrainingAnalyzer {
    config: TrainingConfig,
}

impl TrainingAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TrainingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Volume of the period ending at `now` against the period before it
    pub fn volume_analytics(
        &self,
        sets: &[WorkingSet],
        period: VolumePeriod,
        now: DateTime<Utc>,
    ) -> VolumeAnalytics {
        let start = window_start(now, period.days());
        let previous_start = window_start(start, period.days());

        let mut total = Decimal::ZERO;
        let mut previous = Decimal::ZERO;
        let mut by_category: BTreeMap<ExerciseCategory, Decimal> = BTreeMap::new();
        let mut by_exercise: BTreeMap<&str, (Decimal, usize)> = BTreeMap::new();

        for set in sets.iter().filter(|s| is_working(s)) {
            let volume = set.volume();
            if set.performed_at >= start && set.performed_at < now {
                total += volume;
                *by_category.entry(set.category).or_default() += volume;
                let entry = by_exercise.entry(set.exercise.as_str()).or_default();
                entry.0 += volume;
                entry.1 += 1;
            } else if set.performed_at >= previous_start && set.performed_at < start {
                previous += volume;
            }
        }

        let trend_pct = if previous > Decimal::ZERO {
            round_to(to_f64((total - previous) / previous) * 100.0, 1)
        } else {
            0.0
        };

        let mut top_exercises: Vec<ExerciseVolume> = by_exercise
            .into_iter()
            .map(|(exercise, (volume, sets))| ExerciseVolume {
                exercise: exercise.to_string(),
                volume: round_to(to_f64(volume), 1),
                sets,
            })
            .collect();
        top_exercises.sort_by(|a, b| b.volume.total_cmp(&a.volume));
        top_exercises.truncate(self.config.top_exercises);

        tracing::debug!(
            period = %period,
            total = %total,
            previous = %previous,
            trend_pct,
            "Volume analytics computed"
        );

        VolumeAnalytics {
            period,
            total_volume: round_to(to_f64(total), 1),
            previous_volume: round_to(to_f64(previous), 1),
            trend_pct,
            volume_by_category: by_category
                .into_iter()
                .map(|(category, volume)| (category, round_to(to_f64(volume), 1)))
                .collect(),
            top_exercises,
        }
    }

    pub fn balance_status(&self, days_since_trained: Option<i64>) -> BalanceStatus {
        match days_since_trained {
            Some(days) if days <= self.config.recovering_days => BalanceStatus::Recovering,
            Some(days) if days > self.config.needs_attention_days => BalanceStatus::NeedsAttention,
            _ => BalanceStatus::Recovered,
        }
    }

    /// Per-category stats for every category present in `sets`, highest 7-day volume first
    pub fn muscle_group_stats(&self, sets: &[WorkingSet], now: DateTime<Utc>) -> Vec<MuscleGroupStats> {
        let week_start = window_start(now, 7);
        let mut groups: BTreeMap<ExerciseCategory, (Decimal, usize, Option<DateTime<Utc>>)> =
            BTreeMap::new();

        for set in sets.iter().filter(|s| is_working(s) && s.performed_at <= now) {
            let entry = groups.entry(set.category).or_default();
            if set.performed_at >= week_start {
                entry.0 += set.volume();
                entry.1 += 1;
            }
            entry.2 = entry.2.max(Some(set.performed_at));
        }

        let mut stats: Vec<MuscleGroupStats> = groups
            .into_iter()
            .map(|(category, (volume, set_count, last_trained))| {
                let days_since_trained =
                    last_trained.map(|t| (now.date_naive() - t.date_naive()).num_days());
                MuscleGroupStats {
                    category,
                    volume_7d: round_to(to_f64(volume), 1),
                    set_count_7d: set_count,
                    last_trained,
                    days_since_trained,
                    status: self.balance_status(days_since_trained),
                }
            })
            .collect();

        stats.sort_by(|a, b| b.volume_7d.total_cmp(&a.volume_7d));
        stats
    }

    /// Progress on the configured key lifts that have recent working sets
    pub fn key_lift_progress(&self, sets: &[WorkingSet], now: DateTime<Utc>) -> Vec<LiftProgress> {
        let window = self.config.lift_window_days;
        let current_start = window_start(now, window);
        let previous_start = window_start(current_start, window);

        let best_between = |lift: &str, start: DateTime<Utc>, end: DateTime<Utc>| {
            let needle = lift.to_lowercase();
            sets.iter()
                .filter(|s| is_working(s) && s.performed_at >= start && s.performed_at < end)
                .filter(|s| s.exercise.to_lowercase().contains(&needle))
                .map(|s| s.weight_kg)
                .max()
        };

        self.config
            .key_lifts
            .iter()
            .filter_map(|lift| {
                let current = best_between(lift, current_start, now)?;
                let previous = best_between(lift, previous_start, current_start).unwrap_or(current);
                let change = current - previous;
                let change_percent = if previous > Decimal::ZERO {
                    round_to(to_f64(change / previous) * 100.0, 1)
                } else {
                    0.0
                };

                Some(LiftProgress {
                    exercise_name: lift.clone(),
                    current_kg: current,
                    change_kg: change.round_dp(1),
                    change_percent,
                    period_days: window,
                })
            })
            .take(self.config.max_key_lifts)
            .collect()
    }

    /// Records achieved within the PR window, most recent first
    pub fn recent_prs(&self, records: &[PersonalRecord], now: DateTime<Utc>) -> Vec<PersonalRecord> {
        let cutoff = window_start(now, self.config.pr_window_days);
        let mut recent: Vec<PersonalRecord> = records
            .iter()
            .filter(|r| r.achieved_at >= cutoff && r.achieved_at <= now)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.achieved_at.cmp(&a.achieved_at));
        recent.truncate(self.config.max_recent_prs);
        recent
    }
}
