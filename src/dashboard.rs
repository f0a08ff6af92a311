//! Dashboard aggregation
//!
//! Each dashboard section is produced independently as a `Result`. The
//! aggregator resolves every section through [`OrSectionDefault`], so a failed
//! section degrades to its documented neutral value and the report is always
//! returned. Recommendations are derived from the resolved sections.

use crate::error::ConfigError;
use crate::models::{
    round_to, PersonalRecord, WeightedFactor, WorkingSet, WorkoutRecord, MAX_WINDOW_DAYS,
};
use crate::scoring::{IntensityLevel, ReadinessResult, RecoveryResult, RecoveryStatus};
use crate::training::{
    BalanceStatus, LiftProgress, MuscleGroupStats, TrainingAnalyzer, TrainingConfig, VolumePeriod,
};
use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Dashboard thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Nightly sleep target used for the sleep deficit
    pub sleep_target_hours: f64,
    /// Recovery time is estimated below this score
    pub recovery_estimate_below: f64,
    pub base_recovery_hours: f64,
    /// Extra recovery hours per hour of sleep deficit
    pub hours_per_deficit_hour: f64,
    pub sleep_deficit_alert_hours: f64,
    pub low_recovery_score: f64,
    pub min_rest_days_for_workout: i64,
    pub low_nutrition_adherence_pct: f64,
    pub volume_drop_pct: f64,
    pub pr_celebration_priority: u32,
    pub max_recommendations: usize,
    /// Days covered by the weekly summary
    pub weekly_days: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            sleep_target_hours: 8.0,
            recovery_estimate_below: 70.0,
            base_recovery_hours: 8.0,
            hours_per_deficit_hour: 2.0,
            sleep_deficit_alert_hours: 1.0,
            low_recovery_score: 60.0,
            min_rest_days_for_workout: 3,
            low_nutrition_adherence_pct: 60.0,
            volume_drop_pct: -20.0,
            pr_celebration_priority: 100,
            max_recommendations: 5,
            weekly_days: 7,
        }
    }
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sleep_target_hours <= 0.0 || self.sleep_target_hours > 24.0 {
            return Err(ConfigError::InvalidValue {
                field: "dashboard.sleep_target_hours".to_string(),
                reason: format!("{} is outside (0, 24]", self.sleep_target_hours),
            });
        }
        if self.weekly_days == 0 || i64::from(self.weekly_days) > MAX_WINDOW_DAYS {
            return Err(ConfigError::InvalidValue {
                field: "dashboard.weekly_days".to_string(),
                reason: format!("{} is outside 1..={}", self.weekly_days, MAX_WINDOW_DAYS),
            });
        }
        if self.max_recommendations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dashboard.max_recommendations".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Neutral value substituted for a section that failed to compute
pub trait SectionDefault {
    /// Section name reported in logs and in the degraded-section list
    const SECTION: &'static str;

    fn section_default() -> Self;
}

/// Resolve a section result, falling back to the section default on error
pub trait OrSectionDefault<T> {
    fn or_section_default(self, degraded: &mut Vec<String>) -> T;
}

impl<T, E> OrSectionDefault<T> for Result<T, E>
where
    T: SectionDefault,
    E: fmt::Display,
{
    fn or_section_default(self, degraded: &mut Vec<String>) -> T {
        match self {
            Ok(section) => section,
            Err(e) => {
                tracing::warn!(section = T::SECTION, error = %e, "Dashboard section failed");
                degraded.push(T::SECTION.to_string());
                T::section_default()
            }
        }
    }
}

/// Recovery score with its factors and a headline recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedRecovery {
    pub score: f64,
    pub status: RecoveryStatus,
    /// Factors ordered from weakest to strongest
    pub factors: Vec<WeightedFactor>,
    pub primary_recommendation: String,
    pub sleep_deficit_hours: Option<f64>,
    pub estimated_full_recovery_hours: Option<u32>,
}

impl SectionDefault for EnhancedRecovery {
    const SECTION: &'static str = "enhanced_recovery";

    fn section_default() -> Self {
        Self {
            score: 50.0,
            status: RecoveryStatus::Unknown,
            factors: Vec::new(),
            primary_recommendation: "Unable to calculate recovery right now.".to_string(),
            sleep_deficit_hours: None,
            estimated_full_recovery_hours: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessSummary {
    pub score: f64,
    pub recommended_intensity: IntensityLevel,
    pub suggested_workout_types: Vec<String>,
}

impl From<ReadinessResult> for ReadinessSummary {
    fn from(result: ReadinessResult) -> Self {
        Self {
            score: result.score,
            recommended_intensity: result.recommended_intensity,
            suggested_workout_types: result.suggested_workout_types,
        }
    }
}

impl SectionDefault for ReadinessSummary {
    const SECTION: &'static str = "readiness";

    fn section_default() -> Self {
        Self {
            score: 50.0,
            recommended_intensity: IntensityLevel::Moderate,
            suggested_workout_types: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub key_lifts: Vec<LiftProgress>,
    pub total_volume_week: f64,
    pub volume_trend_pct: f64,
    pub recent_prs: Vec<PersonalRecord>,
    pub muscle_balance: Vec<MuscleGroupStats>,
}

impl SectionDefault for ProgressSummary {
    const SECTION: &'static str = "progress";

    fn section_default() -> Self {
        Self {
            key_lifts: Vec::new(),
            total_volume_week: 0.0,
            volume_trend_pct: 0.0,
            recent_prs: Vec::new(),
            muscle_balance: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub workouts_completed: usize,
    pub workouts_planned: u32,
    pub avg_sleep_score: f64,
    pub nutrition_adherence_pct: f64,
    /// Weekday with the most workouts
    pub best_day: Option<String>,
    pub highlights: Vec<String>,
}

impl SectionDefault for WeeklySummary {
    const SECTION: &'static str = "weekly_summary";

    fn section_default() -> Self {
        Self {
            workouts_completed: 0,
            workouts_planned: 0,
            avg_sleep_score: 0.0,
            nutrition_adherence_pct: 0.0,
            best_day: None,
            highlights: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationCategory {
    Workout,
    Recovery,
    Nutrition,
    Sleep,
}

impl fmt::Display for RecommendationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationCategory::Workout => write!(f, "workout"),
            RecommendationCategory::Recovery => write!(f, "recovery"),
            RecommendationCategory::Nutrition => write!(f, "nutrition"),
            RecommendationCategory::Sleep => write!(f, "sleep"),
        }
    }
}

/// A ranked dashboard recommendation, lower priority values rank first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub category: RecommendationCategory,
    pub priority: u32,
    pub title: String,
    pub message: String,
    /// Client navigation target
    pub action_route: Option<String>,
}

/// Section results handed to the aggregator
pub struct DashboardSections<E> {
    pub recovery: Result<EnhancedRecovery, E>,
    pub readiness: Result<ReadinessSummary, E>,
    pub progress: Result<ProgressSummary, E>,
    pub weekly: Result<WeeklySummary, E>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub generated_at: DateTime<Utc>,
    pub enhanced_recovery: EnhancedRecovery,
    pub readiness: ReadinessSummary,
    pub progress: ProgressSummary,
    pub weekly_summary: WeeklySummary,
    pub recommendations: Vec<Recommendation>,
    /// Sections replaced by their neutral default
    pub degraded_sections: Vec<String>,
}

impl DashboardReport {
    pub fn is_degraded(&self) -> bool {
        !self.degraded_sections.is_empty()
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Builds dashboard sections and merges them into a report
#[derive(Debug, Clone, Default)]
pub struct DashboardAggregator {
    config: DashboardConfig,
    training: TrainingAnalyzer,
}

impl DashboardAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DashboardConfig, training: TrainingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            training: TrainingAnalyzer::with_config(training)?,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn training(&self) -> &TrainingAnalyzer {
        &self.training
    }

    /// Recovery section from a recovery result and last night's sleep
    pub fn enhanced_recovery(
        &self,
        recovery: RecoveryResult,
        last_night_hours: Option<f64>,
    ) -> EnhancedRecovery {
        let deficit = last_night_hours.map(|h| (self.config.sleep_target_hours - h).max(0.0));

        let estimated_full_recovery_hours = (recovery.score < self.config.recovery_estimate_below)
            .then(|| {
                let hours = self.config.base_recovery_hours
                    + deficit.unwrap_or(0.0) * self.config.hours_per_deficit_hour;
                hours as u32
            });

        let factors: Vec<WeightedFactor> = recovery.factors_by_score().into_iter().cloned().collect();
        let primary_recommendation =
            self.primary_recovery_recommendation(recovery.score, factors.first(), deficit);

        EnhancedRecovery {
            score: recovery.score,
            status: recovery.status,
            factors,
            primary_recommendation,
            sleep_deficit_hours: deficit.filter(|d| *d > 0.0).map(|d| round_to(d, 1)),
            estimated_full_recovery_hours,
        }
    }

    fn primary_recovery_recommendation(
        &self,
        score: f64,
        weakest: Option<&WeightedFactor>,
        deficit: Option<f64>,
    ) -> String {
        if score >= 85.0 {
            return "You're well recovered. Great day for an intense workout!".to_string();
        }
        if score >= 70.0 {
            return "Recovery is good. Ready for moderate training.".to_string();
        }
        if score < 50.0 {
            return "Rest day recommended. Focus on sleep and nutrition.".to_string();
        }

        match weakest.map(|f| f.name.as_str()) {
            Some("sleep_hours") => format!(
                "Prioritize sleep tonight - aim for {:.0}+ hours.",
                self.config.sleep_target_hours + deficit.unwrap_or(0.0)
            ),
            Some("training_load") => {
                "Training load is high. Consider active recovery today.".to_string()
            }
            _ => "Consider a lighter workout or active recovery.".to_string(),
        }
    }

    /// Progress section from recent working sets and personal records
    pub fn progress_summary(
        &self,
        sets: &[WorkingSet],
        records: &[PersonalRecord],
        now: DateTime<Utc>,
    ) -> ProgressSummary {
        let volume = self.training.volume_analytics(sets, VolumePeriod::Week, now);

        ProgressSummary {
            key_lifts: self.training.key_lift_progress(sets, now),
            total_volume_week: volume.total_volume,
            volume_trend_pct: volume.trend_pct,
            recent_prs: self.training.recent_prs(records, now),
            muscle_balance: self.training.muscle_group_stats(sets, now),
        }
    }

    /// Weekly section from the week's workouts, plan, sleep and food logging
    pub fn weekly_summary(
        &self,
        workouts: &[WorkoutRecord],
        workouts_planned: u32,
        avg_sleep_score: f64,
        food_log_days: u32,
    ) -> WeeklySummary {
        let workouts_completed = workouts.len();
        let nutrition_adherence =
            (food_log_days.min(self.config.weekly_days) as f64 / self.config.weekly_days as f64) * 100.0;

        let mut highlights = Vec::new();
        if workouts_planned > 0 && workouts_completed >= workouts_planned as usize {
            highlights.push(format!("Completed all {} planned workouts!", workouts_planned));
        } else if workouts_completed > 0 {
            highlights.push(format!("Logged {} workouts this week", workouts_completed));
        }
        if avg_sleep_score >= 80.0 {
            highlights.push("Great sleep quality this week".to_string());
        }
        if nutrition_adherence >= 80.0 {
            highlights.push("Excellent nutrition adherence".to_string());
        }

        WeeklySummary {
            workouts_completed,
            workouts_planned,
            avg_sleep_score: round_to(avg_sleep_score, 1),
            nutrition_adherence_pct: round_to(nutrition_adherence, 1),
            best_day: best_day(workouts),
            highlights,
        }
    }

    /// Resolve all sections and rank recommendations
    pub fn build<E: fmt::Display>(
        &self,
        sections: DashboardSections<E>,
        now: DateTime<Utc>,
    ) -> DashboardReport {
        let mut degraded = Vec::new();
        let enhanced_recovery = sections.recovery.or_section_default(&mut degraded);
        let readiness = sections.readiness.or_section_default(&mut degraded);
        let progress = sections.progress.or_section_default(&mut degraded);
        let weekly_summary = sections.weekly.or_section_default(&mut degraded);

        let recommendations = self.recommendations(&enhanced_recovery, &progress, &weekly_summary);

        tracing::debug!(
            recommendations = recommendations.len(),
            degraded = degraded.len(),
            "Dashboard assembled"
        );

        DashboardReport {
            generated_at: now,
            enhanced_recovery,
            readiness,
            progress,
            weekly_summary,
            recommendations,
            degraded_sections: degraded,
        }
    }

    /// Rule-based recommendations, lowest priority value first
    pub fn recommendations(
        &self,
        recovery: &EnhancedRecovery,
        progress: &ProgressSummary,
        weekly: &WeeklySummary,
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();
        let mut priority = 0;
        let mut push = |category: RecommendationCategory,
                        key: &str,
                        fixed_priority: Option<u32>,
                        title: String,
                        message: String,
                        route: Option<&str>| {
            priority += 1;
            recommendations.push(Recommendation {
                id: format!("{}_{}", key, priority),
                category,
                priority: fixed_priority.unwrap_or(priority),
                title,
                message,
                action_route: route.map(str::to_string),
            });
        };

        if let Some(deficit) = recovery
            .sleep_deficit_hours
            .filter(|d| *d > self.config.sleep_deficit_alert_hours)
        {
            push(
                RecommendationCategory::Sleep,
                "sleep",
                None,
                "Sleep Recovery".to_string(),
                format!(
                    "You're {:.1}h behind on sleep. Consider an earlier bedtime tonight.",
                    deficit
                ),
                Some("sleep"),
            );
        }

        if recovery.score < self.config.low_recovery_score {
            push(
                RecommendationCategory::Recovery,
                "recovery",
                None,
                "Rest Day Recommended".to_string(),
                "Your recovery is low. A light activity day would help you bounce back faster."
                    .to_string(),
                None,
            );
        }

        let mut most_rested: Option<(&MuscleGroupStats, i64)> = None;
        for muscle in progress
            .muscle_balance
            .iter()
            .filter(|m| m.status == BalanceStatus::Recovered)
        {
            let days = muscle.days_since_trained.unwrap_or(0);
            if most_rested.map_or(true, |(_, best)| days > best) {
                most_rested = Some((muscle, days));
            }
        }
        if let Some((muscle, days)) =
            most_rested.filter(|(_, days)| *days >= self.config.min_rest_days_for_workout)
        {
            push(
                RecommendationCategory::Workout,
                "workout",
                None,
                format!("{} Day", title_case(muscle.category.as_str())),
                format!(
                    "Your {} muscles are fully recovered ({} days rest)",
                    muscle.category, days
                ),
                Some("workout"),
            );
        }

        if weekly.nutrition_adherence_pct < self.config.low_nutrition_adherence_pct {
            push(
                RecommendationCategory::Nutrition,
                "nutrition",
                None,
                "Track Your Meals".to_string(),
                "Logging meals helps hit your goals. Try logging at least 2 meals today."
                    .to_string(),
                Some("nutrition"),
            );
        }

        if progress.volume_trend_pct < self.config.volume_drop_pct {
            push(
                RecommendationCategory::Workout,
                "progress",
                None,
                "Volume Drop".to_string(),
                "Your training volume is down. Consider adding an extra set to your key lifts."
                    .to_string(),
                Some("workout"),
            );
        }

        if let Some(pr) = progress.recent_prs.first() {
            push(
                RecommendationCategory::Workout,
                "pr",
                Some(self.config.pr_celebration_priority),
                "New PR!".to_string(),
                format!(
                    "You hit a new {} on {}!",
                    pr.record_type.label(),
                    pr.exercise_name
                ),
                None,
            );
        }

        recommendations.sort_by_key(|r| r.priority);
        recommendations.truncate(self.config.max_recommendations);
        recommendations
    }
}

/// Weekday with the most workouts, earliest weekday on ties
fn best_day(workouts: &[WorkoutRecord]) -> Option<String> {
    let mut counts: BTreeMap<u32, (Weekday, usize)> = BTreeMap::new();
    for workout in workouts {
        let weekday = workout.start_time.weekday();
        counts
            .entry(weekday.num_days_from_monday())
            .or_insert((weekday, 0))
            .1 += 1;
    }

    let mut best: Option<(Weekday, usize)> = None;
    for (weekday, count) in counts.into_values() {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((weekday, count));
        }
    }

    best.map(|(weekday, _)| weekday_name(weekday).to_string())
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalyticsError, StoreError};
    use crate::models::{ExerciseCategory, Impact, RecordType};
    use crate::scoring::{RecoveryInputs, ScoreCalculator};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        // A Sunday
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn recovery_with_score(score: f64) -> RecoveryResult {
        RecoveryResult {
            score,
            confidence: 1.0,
            status: RecoveryStatus::from_score(score),
            contributing_factors: Default::default(),
            recommendations: Vec::new(),
        }
    }

    fn muscle(category: ExerciseCategory, days: i64, status: BalanceStatus) -> MuscleGroupStats {
        MuscleGroupStats {
            category,
            volume_7d: 0.0,
            set_count_7d: 0,
            last_trained: Some(now() - Duration::days(days)),
            days_since_trained: Some(days),
            status,
        }
    }

    fn unavailable() -> AnalyticsError {
        AnalyticsError::Store(StoreError::Unavailable {
            reason: "connection reset".to_string(),
        })
    }

    #[test]
    fn test_enhanced_recovery_deficit_and_estimate() {
        let aggregator = DashboardAggregator::new();
        let enhanced = aggregator.enhanced_recovery(recovery_with_score(62.0), Some(6.5));

        assert_eq!(enhanced.sleep_deficit_hours, Some(1.5));
        assert_eq!(enhanced.estimated_full_recovery_hours, Some(11));

        let rested = aggregator.enhanced_recovery(recovery_with_score(88.0), Some(8.5));
        assert_eq!(rested.sleep_deficit_hours, None);
        assert_eq!(rested.estimated_full_recovery_hours, None);
        assert!(rested.primary_recommendation.contains("intense"));
    }

    #[test]
    fn test_primary_recommendation_names_weakest_factor() {
        let calculator = ScoreCalculator::new();
        let recovery = calculator.calculate_recovery(&RecoveryInputs {
            sleep_hours: Some(4.0),
            sleep_quality: Some(75.0),
            stress_level: 2.0,
            ..RecoveryInputs::default()
        });
        assert!(recovery.score >= 50.0 && recovery.score < 70.0);

        let enhanced = DashboardAggregator::new().enhanced_recovery(recovery, Some(4.0));
        assert_eq!(enhanced.factors[0].name, "sleep_hours");
        assert_eq!(
            enhanced.primary_recommendation,
            "Prioritize sleep tonight - aim for 12+ hours."
        );
    }

    #[test]
    fn test_primary_recommendation_bands() {
        let aggregator = DashboardAggregator::new();
        let load = WeightedFactor::new("training_load", 700.0, 30.0, Impact::Negative);

        assert!(aggregator
            .primary_recovery_recommendation(72.0, None, None)
            .contains("moderate"));
        assert!(aggregator
            .primary_recovery_recommendation(55.0, Some(&load), None)
            .contains("Training load"));
        assert!(aggregator
            .primary_recovery_recommendation(40.0, Some(&load), None)
            .starts_with("Rest day"));
    }

    #[test]
    fn test_weekly_summary() {
        let workouts: Vec<WorkoutRecord> = [1, 2, 8, 15]
            .iter()
            .map(|days| WorkoutRecord {
                start_time: now() - Duration::days(*days),
                training_load: None,
                intensity: None,
                calories_burned: None,
                duration_minutes: None,
            })
            .collect();

        let weekly = DashboardAggregator::new().weekly_summary(&workouts, 4, 82.34, 6);

        assert_eq!(weekly.workouts_completed, 4);
        assert_eq!(weekly.best_day.as_deref(), Some("Saturday"));
        assert_eq!(weekly.nutrition_adherence_pct, 85.7);
        assert_eq!(weekly.avg_sleep_score, 82.3);
        assert_eq!(
            weekly.highlights,
            vec![
                "Completed all 4 planned workouts!".to_string(),
                "Great sleep quality this week".to_string(),
                "Excellent nutrition adherence".to_string(),
            ]
        );
    }

    #[test]
    fn test_recommendations_ranked_and_capped() {
        let aggregator = DashboardAggregator::new();
        let mut recovery = EnhancedRecovery::section_default();
        recovery.score = 45.0;
        recovery.sleep_deficit_hours = Some(2.0);

        let progress = ProgressSummary {
            volume_trend_pct: -35.0,
            recent_prs: vec![PersonalRecord {
                exercise_name: "Deadlift".to_string(),
                record_type: RecordType::ThreeRepMax,
                value: dec!(180),
                previous_value: Some(dec!(175)),
                achieved_at: now(),
            }],
            muscle_balance: vec![
                muscle(ExerciseCategory::Back, 4, BalanceStatus::Recovered),
                muscle(ExerciseCategory::Legs, 5, BalanceStatus::Recovered),
                muscle(ExerciseCategory::Chest, 9, BalanceStatus::NeedsAttention),
            ],
            ..ProgressSummary::section_default()
        };

        let recommendations =
            aggregator.recommendations(&recovery, &progress, &WeeklySummary::section_default());

        let ids: Vec<&str> = recommendations.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["sleep_1", "recovery_2", "workout_3", "nutrition_4", "progress_5"]
        );
        assert_eq!(recommendations[2].title, "Legs Day");
        assert!(recommendations.windows(2).all(|w| w[0].priority <= w[1].priority));
    }

    #[test]
    fn test_pr_celebration_ranks_last() {
        let aggregator = DashboardAggregator::new();
        let mut recovery = EnhancedRecovery::section_default();
        recovery.score = 90.0;

        let progress = ProgressSummary {
            recent_prs: vec![PersonalRecord {
                exercise_name: "Squat".to_string(),
                record_type: RecordType::FiveRepMax,
                value: dec!(150),
                previous_value: None,
                achieved_at: now(),
            }],
            ..ProgressSummary::section_default()
        };
        let weekly = WeeklySummary {
            nutrition_adherence_pct: 10.0,
            ..WeeklySummary::section_default()
        };

        let recommendations = aggregator.recommendations(&recovery, &progress, &weekly);

        assert_eq!(recommendations.len(), 2);
        assert_eq!(recommendations[0].category, RecommendationCategory::Nutrition);
        assert_eq!(recommendations[1].priority, 100);
        assert_eq!(recommendations[1].message, "You hit a new 5rm on Squat!");
    }

    #[test]
    fn test_failed_section_still_yields_report() {
        let aggregator = DashboardAggregator::new();
        let sections = DashboardSections {
            recovery: Ok(aggregator.enhanced_recovery(recovery_with_score(75.0), Some(7.5))),
            readiness: Err(unavailable()),
            progress: Err(unavailable()),
            weekly: Ok(aggregator.weekly_summary(&[], 3, 70.0, 5)),
        };

        let report = aggregator.build(sections, now());

        assert_eq!(report.degraded_sections, vec!["readiness", "progress"]);
        assert!(report.is_degraded());
        assert_eq!(report.enhanced_recovery.score, 75.0);
        assert_eq!(report.weekly_summary.workouts_planned, 3);
        assert_eq!(report.readiness.recommended_intensity, IntensityLevel::Moderate);
        assert_eq!(report.progress, ProgressSummary::section_default());
    }

    #[test]
    fn test_all_sections_failing_uses_defaults() {
        let sections: DashboardSections<AnalyticsError> = DashboardSections {
            recovery: Err(unavailable()),
            readiness: Err(unavailable()),
            progress: Err(unavailable()),
            weekly: Err(unavailable()),
        };

        let report = DashboardAggregator::new().build(sections, now());

        assert_eq!(report.degraded_sections.len(), 4);
        assert_eq!(report.enhanced_recovery.status, RecoveryStatus::Unknown);
        assert_eq!(report.enhanced_recovery.score, 50.0);
        // Default recovery (50) and zero nutrition adherence both trigger rules
        assert_eq!(report.recommendations.len(), 2);
    }

    #[test]
    fn test_progress_summary_from_sets() {
        let sets = vec![WorkingSet {
            exercise: "Squat".to_string(),
            category: ExerciseCategory::Legs,
            weight_kg: dec!(120),
            reps: 5,
            rpe: Some(8.0),
            is_warmup: false,
            performed_at: now() - Duration::days(2),
        }];

        let progress = DashboardAggregator::new().progress_summary(&sets, &[], now());

        assert_eq!(progress.total_volume_week, 600.0);
        assert_eq!(progress.key_lifts.len(), 1);
        assert_eq!(progress.muscle_balance[0].status, BalanceStatus::Recovered);
    }

    #[test]
    fn test_config_validation() {
        let config = DashboardConfig {
            weekly_days: 0,
            ..DashboardConfig::default()
        };
        assert!(DashboardAggregator::with_config(config, TrainingConfig::default()).is_err());
    }
}
