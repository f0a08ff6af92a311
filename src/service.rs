//! Analytics service
//!
//! Composition root tying a [`HealthStore`] to the calculators. Every
//! calculator is built once from a validated [`EngineConfig`] and owned by the
//! service; there is no process-wide state.

use crate::config::EngineConfig;
use crate::correlation::{CorrelationEngine, CorrelationInsight};
use crate::dashboard::{DashboardAggregator, DashboardReport, DashboardSections, EnhancedRecovery};
use crate::dashboard::{ProgressSummary, ReadinessSummary, WeeklySummary};
use crate::error::{AnalyticsError, CalculationError, Result};
use crate::models::{
    latest_value, window_start, ExerciseCategory, MetricType, NutritionIntake, PhysicalProfile,
    UserBaselines, MAX_WINDOW_DAYS,
};
use crate::nutrition::{
    activity_calories_from_workouts, NutritionScore, NutritionTargetCalculator, NutritionTargets,
    TargetOverrides,
};
use crate::progression::{ExerciseHistory, ProgressionAdvisor, ProgressionSuggestion};
use crate::scoring::recovery::training_load_score;
use crate::scoring::{
    DailyMetrics, ReadinessInputs, ReadinessResult, RecoveryInputs, RecoveryResult,
    ScoreCalculator, WellnessInputs, WellnessResult,
};
use crate::sleep::{SleepAnalytics, SleepAnalyzer};
use crate::store::HealthStore;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Trailing window feeding recovery and readiness
const RECENT_DAYS: i64 = 7;
/// Previous wellness scores considered for the trend
const WELLNESS_HISTORY: usize = 7;

/// Health analytics for users of one store
pub struct AnalyticsService<S: HealthStore> {
    store: S,
    config: EngineConfig,
    scores: ScoreCalculator,
    nutrition: NutritionTargetCalculator,
    progression: ProgressionAdvisor,
    correlation: CorrelationEngine,
    sleep: SleepAnalyzer,
    dashboard: DashboardAggregator,
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Reject body measurements the BMR equation cannot use
fn check_profile(profile: &PhysicalProfile) -> std::result::Result<(), CalculationError> {
    let invalid = |parameter: &str, value: String| CalculationError::InvalidInput {
        calculation: "nutrition targets".to_string(),
        parameter: parameter.to_string(),
        value,
    };

    if profile.age == 0 || profile.age > 120 {
        return Err(invalid("age", profile.age.to_string()));
    }
    if !(profile.height_cm.is_finite() && profile.height_cm > 0.0) {
        return Err(invalid("height_cm", profile.height_cm.to_string()));
    }
    if !(profile.weight_kg.is_finite() && profile.weight_kg > 0.0) {
        return Err(invalid("weight_kg", profile.weight_kg.to_string()));
    }
    Ok(())
}

impl<S: HealthStore> AnalyticsService<S> {
    /// Build every calculator from `config`, failing on invalid configuration
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            scores: ScoreCalculator::with_config(config.scoring.clone())?,
            nutrition: NutritionTargetCalculator::with_config(config.nutrition.clone())?,
            progression: ProgressionAdvisor::with_config(config.progression.clone())?,
            correlation: CorrelationEngine::with_config(config.correlation.clone())?,
            sleep: SleepAnalyzer::with_config(config.sleep.clone())?,
            dashboard: DashboardAggregator::with_config(
                config.dashboard.clone(),
                config.training.clone(),
            )?,
            store,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn baselines(&self, user_id: Uuid) -> Result<UserBaselines> {
        Ok(self
            .store
            .fetch_user_baselines(user_id)?
            .unwrap_or(self.config.default_baselines))
    }

    fn recovery_inputs(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<RecoveryInputs> {
        let start = window_start(now, RECENT_DAYS);
        let samples = self.store.fetch_samples(user_id, None, start, now)?;
        let workouts = self.store.fetch_workouts(user_id, start, now)?;
        Ok(RecoveryInputs::from_records(
            &samples,
            self.baselines(user_id)?,
            &workouts,
        ))
    }

    #[tracing::instrument(skip(self))]
    pub fn recovery(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<RecoveryResult> {
        let inputs = self.recovery_inputs(user_id, now)?;
        Ok(self.scores.calculate_recovery(&inputs))
    }

    #[tracing::instrument(skip(self))]
    pub fn readiness(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<ReadinessResult> {
        let recovery = self.recovery(user_id, now)?;

        let start = window_start(now, RECENT_DAYS);
        let samples = self.store.fetch_samples(user_id, None, start, now)?;
        let workouts = self.store.fetch_workouts(user_id, start, now)?;

        let inputs = ReadinessInputs::from_records(recovery.score, &samples, &workouts, now);
        Ok(self.scores.calculate_readiness(&inputs))
    }

    /// Wellness for the day containing `now`
    ///
    /// The nutrition component is scored only when a usable physical profile exists.
    #[tracing::instrument(skip(self))]
    pub fn wellness(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<WellnessResult> {
        let today = self
            .store
            .fetch_samples(user_id, None, start_of_day(now), now)?;
        let components = self
            .scores
            .wellness_components(&DailyMetrics::from_samples(&today));

        let nutrition = match self.nutrition_score(user_id, now.date_naive(), now) {
            Ok(score) => Some(score.overall_score),
            Err(AnalyticsError::Calculation(_)) => None,
            Err(e) => return Err(e),
        };

        let workouts = self
            .store
            .fetch_workouts(user_id, window_start(now, RECENT_DAYS), now)?;
        let load: f64 = workouts.iter().filter_map(|w| w.training_load).sum();
        let training_load = (!workouts.is_empty()).then(|| training_load_score(load));

        let inputs = WellnessInputs {
            components,
            nutrition,
            training_load,
            previous_scores: self.store.fetch_wellness_history(user_id, WELLNESS_HISTORY)?,
        };
        Ok(self.scores.calculate_wellness(&inputs))
    }

    /// Targets for the day containing `now`, adjusted for that day's workouts
    #[tracing::instrument(skip(self, overrides))]
    pub fn nutrition_targets(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        overrides: &TargetOverrides,
    ) -> Result<NutritionTargets> {
        let profile = self.store.fetch_physical_profile(user_id)?.ok_or_else(|| {
            CalculationError::InsufficientData {
                calculation: "nutrition targets".to_string(),
                reason: "no physical profile on record".to_string(),
            }
        })?;
        check_profile(&profile)?;

        let workouts = self.store.fetch_workouts(user_id, start_of_day(now), now)?;
        let adjustment = activity_calories_from_workouts(&workouts);

        Ok(self
            .nutrition
            .calculate_targets(&profile, adjustment, overrides))
    }

    /// Adherence score for `date`, counting logged days in the week ending on it
    #[tracing::instrument(skip(self))]
    pub fn nutrition_score(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<NutritionScore> {
        let targets = self.nutrition_targets(user_id, now, &TargetOverrides::default())?;
        let intake: NutritionIntake = self.store.fetch_daily_intake(user_id, date)?;
        let days_logged = self
            .store
            .fetch_food_log_days(user_id, date - Duration::days(6), date)?;

        Ok(self.nutrition.calculate_score(&intake, &targets, days_logged))
    }

    #[tracing::instrument(skip(self))]
    pub fn correlations(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<CorrelationInsight>> {
        let start = window_start(now, self.config.correlation.window_days);
        let samples = self.store.fetch_samples(user_id, None, start, now)?;
        Ok(self.correlation.discover(&samples))
    }

    /// Next-session suggestions keyed by exercise name
    #[tracing::instrument(skip(self))]
    pub fn progression(
        &self,
        user_id: Uuid,
        exercises: &[String],
    ) -> Result<BTreeMap<String, ProgressionSuggestion>> {
        let histories = exercises
            .iter()
            .map(|exercise| -> Result<ExerciseHistory> {
                let sessions = self.store.fetch_recent_sessions(
                    user_id,
                    exercise,
                    self.config.progression.max_sessions,
                )?;
                let category = match self.store.fetch_exercise_category(exercise)? {
                    Some(category) => category,
                    None => sessions
                        .iter()
                        .flat_map(|s| s.sets.iter())
                        .map(|s| s.category)
                        .next()
                        .unwrap_or(ExerciseCategory::Other),
                };
                Ok(ExerciseHistory {
                    exercise: exercise.clone(),
                    category,
                    sessions,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(self.progression.suggest_batch(&histories))
    }

    #[tracing::instrument(skip(self))]
    pub fn sleep_analytics(
        &self,
        user_id: Uuid,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<SleepAnalytics> {
        if !(1..=MAX_WINDOW_DAYS).contains(&days) {
            return Err(AnalyticsError::Validation(format!(
                "sleep window of {} days is outside 1..={}",
                days, MAX_WINDOW_DAYS
            )));
        }
        let samples = self
            .store
            .fetch_samples(user_id, None, window_start(now, days), now)?;
        Ok(self.sleep.analyze(&samples, days))
    }

    fn enhanced_recovery_section(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<EnhancedRecovery> {
        let recovery = self.recovery(user_id, now)?;
        let last_night = self.store.fetch_samples(
            user_id,
            Some(&MetricType::SleepDuration),
            window_start(now, RECENT_DAYS),
            now,
        )?;
        let hours = latest_value(&last_night, &MetricType::SleepDuration);
        Ok(self.dashboard.enhanced_recovery(recovery, hours))
    }

    fn progress_section(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<ProgressSummary> {
        let lookback = self.config.training.lift_window_days.saturating_mul(2);
        let sets = self
            .store
            .fetch_sets(user_id, None, window_start(now, lookback), now)?;
        let records = self.store.fetch_personal_records(user_id)?;
        Ok(self.dashboard.progress_summary(&sets, &records, now))
    }

    fn weekly_section(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<WeeklySummary> {
        let days = i64::from(self.config.dashboard.weekly_days);
        let workouts = self
            .store
            .fetch_workouts(user_id, window_start(now, days), now)?;
        let planned = self.store.fetch_planned_workout_count(user_id)?;
        let sleep = self.sleep_analytics(user_id, days, now)?;
        let today = now.date_naive();
        let food_days =
            self.store
                .fetch_food_log_days(user_id, today - Duration::days(days - 1), today)?;

        Ok(self
            .dashboard
            .weekly_summary(&workouts, planned, sleep.avg_sleep_score, food_days))
    }

    /// Composite dashboard; failed sections degrade to neutral defaults
    #[tracing::instrument(skip(self))]
    pub fn dashboard(&self, user_id: Uuid, now: DateTime<Utc>) -> DashboardReport {
        let sections = DashboardSections {
            recovery: self.enhanced_recovery_section(user_id, now),
            readiness: self.readiness(user_id, now).map(ReadinessSummary::from),
            progress: self.progress_section(user_id, now),
            weekly: self.weekly_section(user_id, now),
        };
        self.dashboard.build(sections, now)
    }
}
