//! Sleep analytics
//!
//! Nights are assembled from sleep samples grouped by calendar date, scored, and
//! summarized over a window.

use crate::error::ConfigError;
use crate::models::{clamp_score, round_to, MetricSample, MetricType, MAX_WINDOW_DAYS};
use crate::scoring::Trend;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Assumed quality when a night has none recorded
const DEFAULT_QUALITY: f64 = 70.0;
/// Expected deep and REM shares of total sleep
const DEEP_SHARE: f64 = 0.20;
const REM_SHARE: f64 = 0.25;

/// Sleep analytics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    /// Nightly target used for sleep debt
    pub target_hours: f64,
    /// Default analysis window
    pub analysis_days: i64,
    /// Most recent nights compared against earlier ones for the trend
    pub trend_window: usize,
    /// Consistency points lost per hour of duration standard deviation
    pub consistency_penalty: f64,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            target_hours: 8.0,
            analysis_days: 30,
            trend_window: 7,
            consistency_penalty: 20.0,
        }
    }
}

impl SleepConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_hours > 0.0 && self.target_hours <= 24.0) {
            return Err(ConfigError::InvalidValue {
                field: "sleep.target_hours".to_string(),
                reason: format!("{} is outside (0, 24]", self.target_hours),
            });
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.analysis_days) {
            return Err(ConfigError::InvalidValue {
                field: "sleep.analysis_days".to_string(),
                reason: format!("{} is outside 1..={}", self.analysis_days, MAX_WINDOW_DAYS),
            });
        }
        if self.trend_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sleep.trend_window".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// One night of sleep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepNight {
    pub date: NaiveDate,
    pub duration_hours: f64,
    pub quality: Option<f64>,
    pub deep_sleep_hours: Option<f64>,
    pub rem_sleep_hours: Option<f64>,
    pub sleep_score: f64,
}

/// Sleep summary over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepAnalytics {
    pub period_days: i64,
    pub nights_logged: usize,
    pub avg_duration_hours: f64,
    pub avg_quality: f64,
    pub avg_deep_sleep_hours: f64,
    pub avg_rem_sleep_hours: f64,
    pub avg_sleep_score: f64,
    pub total_sleep_debt_hours: f64,
    pub best_night: Option<SleepNight>,
    pub worst_night: Option<SleepNight>,
    pub last_night: Option<SleepNight>,
    pub consistency_score: f64,
    pub trend: Trend,
}

impl SleepAnalytics {
    fn empty(period_days: i64) -> Self {
        Self {
            period_days,
            nights_logged: 0,
            avg_duration_hours: 0.0,
            avg_quality: 0.0,
            avg_deep_sleep_hours: 0.0,
            avg_rem_sleep_hours: 0.0,
            avg_sleep_score: 0.0,
            total_sleep_debt_hours: 0.0,
            best_night: None,
            worst_night: None,
            last_night: None,
            consistency_score: 0.0,
            trend: Trend::Stable,
        }
    }
}

fn mean_or(values: &[f64], fallback: f64) -> f64 {
    if values.is_empty() {
        fallback
    } else {
        values.iter().mean()
    }
}

/// Sleep scoring and summary
#[derive(Debug, Clone, Default)]
pub struct SleepAnalyzer {
    config: SleepConfig,
}

impl SleepAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SleepConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SleepConfig {
        &self.config
    }

    /// Score a single night (0-100)
    ///
    /// Duration and quality carry 35% each, deep and REM sleep 15% each. Deep
    /// and REM earn full marks at 80% of their expected share of the night.
    pub fn night_score(
        &self,
        duration: f64,
        quality: Option<f64>,
        deep: Option<f64>,
        rem: Option<f64>,
    ) -> f64 {
        let duration_score = if (7.0..=9.0).contains(&duration) {
            100.0
        } else if duration < 7.0 {
            (duration / 7.0 * 100.0).max(0.0)
        } else {
            (100.0 - (duration - 9.0) * 20.0).max(0.0)
        };

        let quality_score = quality.unwrap_or(DEFAULT_QUALITY).min(100.0);
        let deep_score = stage_score(deep.unwrap_or(duration * DEEP_SHARE), duration * DEEP_SHARE);
        let rem_score = stage_score(rem.unwrap_or(duration * REM_SHARE), duration * REM_SHARE);

        clamp_score(
            duration_score * 0.35 + quality_score * 0.35 + deep_score * 0.15 + rem_score * 0.15,
        )
    }

    /// Nights found in `samples`, oldest first
    ///
    /// Each calendar date takes the latest value of each sleep metric. Dates
    /// without a positive duration are skipped.
    pub fn nights(&self, samples: &[MetricSample]) -> Vec<SleepNight> {
        let mut by_date: BTreeMap<NaiveDate, Vec<&MetricSample>> = BTreeMap::new();
        for sample in samples.iter().filter(|s| is_sleep_metric(&s.metric_type)) {
            by_date
                .entry(sample.timestamp.date_naive())
                .or_default()
                .push(sample);
        }

        by_date
            .into_iter()
            .filter_map(|(date, day)| {
                let latest = |metric: MetricType| {
                    day.iter()
                        .filter(|s| s.metric_type == metric)
                        .max_by_key(|s| s.timestamp)
                        .map(|s| s.value)
                };

                let duration = latest(MetricType::SleepDuration).filter(|d| *d > 0.0)?;
                let quality = latest(MetricType::SleepQuality);
                let deep = latest(MetricType::DeepSleep);
                let rem = latest(MetricType::RemSleep);

                Some(SleepNight {
                    date,
                    duration_hours: round_to(duration, 2),
                    quality,
                    deep_sleep_hours: deep,
                    rem_sleep_hours: rem,
                    sleep_score: round_to(self.night_score(duration, quality, deep, rem), 1),
                })
            })
            .collect()
    }

    /// Summarize the nights in `samples` over a window of `period_days`
    pub fn analyze(&self, samples: &[MetricSample], period_days: i64) -> SleepAnalytics {
        let nights = self.nights(samples);
        if nights.is_empty() {
            return SleepAnalytics::empty(period_days);
        }

        let durations: Vec<f64> = nights.iter().map(|n| n.duration_hours).collect();
        let qualities: Vec<f64> = nights.iter().filter_map(|n| n.quality).collect();
        let deeps: Vec<f64> = nights.iter().filter_map(|n| n.deep_sleep_hours).collect();
        let rems: Vec<f64> = nights.iter().filter_map(|n| n.rem_sleep_hours).collect();
        let scores: Vec<f64> = nights.iter().map(|n| n.sleep_score).collect();

        let avg_duration = durations.iter().mean();
        let total_debt: f64 = durations
            .iter()
            .map(|d| (self.config.target_hours - d).max(0.0))
            .sum();

        let consistency = if durations.len() >= 2 {
            (100.0 - durations.iter().std_dev() * self.config.consistency_penalty).max(0.0)
        } else {
            100.0
        };

        let best = nights
            .iter()
            .max_by(|a, b| a.sleep_score.total_cmp(&b.sleep_score))
            .cloned();
        let worst = nights
            .iter()
            .min_by(|a, b| a.sleep_score.total_cmp(&b.sleep_score))
            .cloned();

        let trend = self.quality_trend(&nights);

        tracing::debug!(
            nights = nights.len(),
            avg_duration,
            total_debt,
            trend = %trend,
            "Sleep analytics computed"
        );

        SleepAnalytics {
            period_days,
            nights_logged: nights.len(),
            avg_duration_hours: round_to(avg_duration, 1),
            avg_quality: round_to(mean_or(&qualities, DEFAULT_QUALITY), 1),
            avg_deep_sleep_hours: round_to(mean_or(&deeps, avg_duration * DEEP_SHARE), 2),
            avg_rem_sleep_hours: round_to(mean_or(&rems, avg_duration * REM_SHARE), 2),
            avg_sleep_score: round_to(scores.iter().mean(), 1),
            total_sleep_debt_hours: round_to(total_debt, 1),
            best_night: best,
            worst_night: worst,
            last_night: nights.last().cloned(),
            consistency_score: round_to(consistency, 1),
            trend,
        }
    }

    /// Quality of the most recent nights against earlier ones
    ///
    /// With exactly one window of nights the first three stand in as the
    /// earlier sample.
    fn quality_trend(&self, nights: &[SleepNight]) -> Trend {
        let window = self.config.trend_window;
        if nights.len() < window {
            return Trend::Stable;
        }

        let quality = |n: &SleepNight| n.quality.unwrap_or(DEFAULT_QUALITY);
        let (earlier, recent) = nights.split_at(nights.len() - window);
        let earlier = if earlier.is_empty() {
            &nights[..nights.len().min(3)]
        } else {
            earlier
        };

        let recent_avg = recent.iter().map(quality).sum::<f64>() / recent.len() as f64;
        let earlier_avg = earlier.iter().map(quality).sum::<f64>() / earlier.len() as f64;
        Trend::compare(recent_avg, earlier_avg, 5.0)
    }
}

fn stage_score(hours: f64, expected: f64) -> f64 {
    let floor = expected * 0.8;
    if hours >= floor {
        100.0
    } else {
        hours / floor * 100.0
    }
}

fn is_sleep_metric(metric: &MetricType) -> bool {
    matches!(
        metric,
        MetricType::SleepDuration
            | MetricType::SleepQuality
            | MetricType::DeepSleep
            | MetricType::RemSleep
    )
}
