//! Pairwise correlation discovery across metric time series

use crate::error::ConfigError;
use crate::models::{clamp_unit, round_to, MetricSample, MetricType, MAX_WINDOW_DAYS};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Standard deviation at or below which a series is treated as constant
const MIN_STD_DEV: f64 = 1e-12;

/// A linear relationship between two metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationInsight {
    pub factor_a: MetricType,
    pub factor_b: MetricType,
    /// Pearson coefficient in [-1, 1], rounded to 0.001
    pub correlation: f64,
    pub insight: String,
    pub data_points: usize,
    pub confidence: f64,
}

/// Correlation discovery thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Trailing window of samples analyzed
    pub window_days: i64,
    /// Fewer samples than this in total yields no insights
    pub min_total_samples: usize,
    /// Fewer paired values than this skips the pair
    pub min_overlap: usize,
    /// Pairs with |r| at or below this are dropped
    pub min_abs_correlation: f64,
    /// |r| above this is labelled strong
    pub strong_threshold: f64,
    /// Paired values at which confidence stops growing
    pub confidence_saturation: usize,
    pub max_confidence: f64,
    pub max_insights: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            min_total_samples: 10,
            min_overlap: 5,
            min_abs_correlation: 0.3,
            strong_threshold: 0.7,
            confidence_saturation: 30,
            max_confidence: 0.95,
            max_insights: 10,
        }
    }
}

impl CorrelationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.window_days) {
            return Err(ConfigError::InvalidValue {
                field: "correlation.window_days".to_string(),
                reason: format!("{} is outside 1..={}", self.window_days, MAX_WINDOW_DAYS),
            });
        }
        if self.min_overlap < 2 {
            return Err(ConfigError::InvalidValue {
                field: "correlation.min_overlap".to_string(),
                reason: "at least two paired values are needed".to_string(),
            });
        }
        if !(0.0..1.0).contains(&self.min_abs_correlation)
            || !(self.min_abs_correlation..=1.0).contains(&self.strong_threshold)
        {
            return Err(ConfigError::InvalidValue {
                field: "correlation.strong_threshold".to_string(),
                reason: "thresholds must satisfy 0 <= min_abs_correlation <= strong_threshold <= 1"
                    .to_string(),
            });
        }
        if self.confidence_saturation == 0 || !(0.0..=1.0).contains(&self.max_confidence) {
            return Err(ConfigError::InvalidValue {
                field: "correlation.max_confidence".to_string(),
                reason: "confidence settings out of range".to_string(),
            });
        }
        Ok(())
    }
}

/// Pearson correlation of two equal-length series
///
/// Returns `None` when the series are too short or either is constant.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }

    let std_a = a.iter().std_dev();
    let std_b = b.iter().std_dev();
    if !(std_a > MIN_STD_DEV && std_b > MIN_STD_DEV) {
        return None;
    }

    let r = a.iter().covariance(b.iter()) / (std_a * std_b);
    if r.is_nan() {
        None
    } else {
        Some(r.clamp(-1.0, 1.0))
    }
}

/// Discovers relationships between a user's metrics
#[derive(Debug, Clone, Default)]
pub struct CorrelationEngine {
    config: CorrelationConfig,
}

impl CorrelationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CorrelationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    /// Find the strongest metric relationships in `samples`
    ///
    /// Samples are ordered by timestamp and grouped by metric type. Each pair of
    /// series is truncated to the shorter length before correlating.
    pub fn discover(&self, samples: &[MetricSample]) -> Vec<CorrelationInsight> {
        if samples.len() < self.config.min_total_samples {
            tracing::debug!(
                samples = samples.len(),
                required = self.config.min_total_samples,
                "Too few samples for correlation analysis"
            );
            return Vec::new();
        }

        let series = group_series(samples);
        let pairs: Vec<(usize, usize)> = (0..series.len())
            .flat_map(|i| (i + 1..series.len()).map(move |j| (i, j)))
            .collect();

        let mut insights: Vec<CorrelationInsight> = pairs
            .par_iter()
            .filter_map(|&(i, j)| {
                let (type_a, values_a) = &series[i];
                let (type_b, values_b) = &series[j];
                self.correlate(type_a, values_a, type_b, values_b)
            })
            .collect();

        insights.sort_by(|a, b| {
            b.correlation
                .abs()
                .total_cmp(&a.correlation.abs())
                .then_with(|| a.factor_a.cmp(&b.factor_a))
                .then_with(|| a.factor_b.cmp(&b.factor_b))
        });
        insights.truncate(self.config.max_insights);

        tracing::debug!(
            metric_types = series.len(),
            pairs = pairs.len(),
            kept = insights.len(),
            "Correlation analysis complete"
        );

        insights
    }

    fn correlate(
        &self,
        type_a: &MetricType,
        values_a: &[f64],
        type_b: &MetricType,
        values_b: &[f64],
    ) -> Option<CorrelationInsight> {
        let n = values_a.len().min(values_b.len());
        if n < self.config.min_overlap {
            return None;
        }

        let r = pearson(&values_a[..n], &values_b[..n])?;
        if r.abs() <= self.config.min_abs_correlation {
            return None;
        }

        let confidence = (n as f64 / self.config.confidence_saturation as f64)
            .min(self.config.max_confidence);

        Some(CorrelationInsight {
            factor_a: type_a.clone(),
            factor_b: type_b.clone(),
            correlation: round_to(r, 3),
            insight: self.describe(type_a, type_b, r),
            data_points: n,
            confidence: round_to(clamp_unit(confidence), 2),
        })
    }

    fn describe(&self, a: &MetricType, b: &MetricType, r: f64) -> String {
        let strength = if r.abs() > self.config.strong_threshold {
            "strong"
        } else {
            "moderate"
        };

        if r > 0.0 {
            format!(
                "There's a {} positive relationship between your {} and {}. \
                 When one increases, the other tends to increase too.",
                strength,
                a.display_name(),
                b.display_name()
            )
        } else {
            format!(
                "There's a {} negative relationship between your {} and {}. \
                 When one increases, the other tends to decrease.",
                strength,
                a.display_name(),
                b.display_name()
            )
        }
    }
}

/// Value series per metric type, in first-seen order, each ordered by time
fn group_series(samples: &[MetricSample]) -> Vec<(MetricType, Vec<f64>)> {
    let mut ordered: Vec<&MetricSample> = samples.iter().collect();
    ordered.sort_by_key(|s| s.timestamp);

    let mut series: Vec<(MetricType, Vec<f64>)> = Vec::new();
    for sample in ordered {
        match series.iter_mut().find(|(t, _)| *t == sample.metric_type) {
            Some((_, values)) => values.push(sample.value),
            None => series.push((sample.metric_type.clone(), vec![sample.value])),
        }
    }
    series
}
