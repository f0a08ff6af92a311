use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use healthpulse::error::StoreError;
use healthpulse::models::*;
use healthpulse::progression::ProgressionStatus;
use healthpulse::scoring::{IntensityLevel, RecoveryStatus};
use healthpulse::store::{HealthStore, MemoryStore, UserData, WellnessEntry};
use healthpulse::{AnalyticsService, EngineConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Integration tests that run complete analytics workflows against a store

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 20, 0, 0).unwrap()
}

fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

fn bench_set(weight: Decimal, rpe: f64, days: i64) -> WorkingSet {
    WorkingSet {
        exercise: "Bench Press".to_string(),
        category: ExerciseCategory::Chest,
        weight_kg: weight,
        reps: 5,
        rpe: Some(rpe),
        is_warmup: false,
        performed_at: days_ago(days),
    }
}

fn squat_set(weight: Decimal, rpe: f64, days: i64) -> WorkingSet {
    WorkingSet {
        exercise: "Back Squat".to_string(),
        category: ExerciseCategory::Legs,
        weight_kg: weight,
        reps: 5,
        rpe: Some(rpe),
        is_warmup: false,
        performed_at: days_ago(days),
    }
}

/// A month of daily data where sleep and HRV rise together and stress falls
fn populated_user() -> UserData {
    let mut user = UserData {
        baselines: Some(UserBaselines {
            hrv_baseline: 55.0,
            rhr_baseline: 58.0,
        }),
        profile: Some(PhysicalProfile {
            age: 34,
            height_cm: 180.0,
            weight_kg: 82.0,
            gender: Gender::Male,
            activity_level: ActivityLevel::Active,
            nutrition_goal: NutritionGoal::BuildMuscle,
        }),
        planned_workouts: 4,
        ..UserData::default()
    };

    for day in 0..30 {
        let wiggle = (day % 5) as f64;
        let t = days_ago(day) - Duration::hours(12);
        user.samples.push(MetricSample::new(MetricType::SleepDuration, 6.0 + wiggle * 0.5, t));
        user.samples.push(MetricSample::new(MetricType::SleepQuality, 60.0 + wiggle * 8.0, t));
        user.samples.push(MetricSample::new(MetricType::Hrv, 45.0 + wiggle * 4.0, t));
        user.samples.push(MetricSample::new(MetricType::Stress, 8.0 - wiggle, t));
        user.samples.push(MetricSample::new(MetricType::Steps, 8000.0, t));
    }

    for day in [1, 3, 5] {
        user.workouts.push(WorkoutRecord {
            start_time: days_ago(day),
            training_load: Some(110.0),
            intensity: Some(WorkoutIntensity::Hard),
            calories_burned: Some(450.0),
            duration_minutes: Some(60),
        });
    }

    user.sets = vec![
        bench_set(dec!(50), 5.0, 2),
        bench_set(dec!(100), 7.0, 2),
        bench_set(dec!(97.5), 7.5, 40),
        squat_set(dec!(140), 9.5, 1),
        squat_set(dec!(140), 9.0, 4),
        squat_set(dec!(140), 9.5, 8),
    ];

    user.personal_records = vec![PersonalRecord {
        exercise_name: "Bench Press".to_string(),
        record_type: RecordType::FiveRepMax,
        value: dec!(100),
        previous_value: Some(dec!(97.5)),
        achieved_at: days_ago(2),
    }];

    for day in [0, 1, 2, 4, 5] {
        user.daily_intake.insert(
            days_ago(day).date_naive(),
            NutritionIntake {
                calories: 2900.0,
                protein_g: 190.0,
                carbs_g: 320.0,
                fat_g: 85.0,
            },
        );
    }

    user.wellness_history = (1..=6)
        .map(|d| WellnessEntry {
            recorded_at: days_ago(d),
            score: 60.0 + d as f64,
        })
        .collect();

    user
}

fn service() -> (AnalyticsService<MemoryStore>, Uuid) {
    let user_id = Uuid::new_v4();
    let mut store = MemoryStore::new();
    store.insert_user(user_id, populated_user());
    store.add_exercise("Back Squat", ExerciseCategory::Legs);
    (
        AnalyticsService::new(store, EngineConfig::default()).unwrap(),
        user_id,
    )
}

#[test]
fn test_scores_stay_in_bounds() {
    let (service, user_id) = service();

    let recovery = service.recovery(user_id, now()).unwrap();
    assert!((0.0..=100.0).contains(&recovery.score));
    // No resting heart rate on record
    assert_eq!(recovery.confidence, 0.85);
    assert!(!recovery.contributing_factors.contains_key("resting_hr"));
    assert!(recovery.contributing_factors.contains_key("hrv"));

    let readiness = service.readiness(user_id, now()).unwrap();
    assert!((0.0..=100.0).contains(&readiness.score));
    assert_eq!(readiness.confidence, 0.85);
    assert_eq!(readiness.factors["rest_days"].score, 90.0);

    let wellness = service.wellness(user_id, now()).unwrap();
    assert!((0.0..=100.0).contains(&wellness.overall_score));
    assert_eq!(wellness.components.len(), 6);
}

#[test]
fn test_scoring_is_deterministic() {
    let (service, user_id) = service();

    assert_eq!(
        service.recovery(user_id, now()).unwrap(),
        service.recovery(user_id, now()).unwrap()
    );
    assert_eq!(
        service.wellness(user_id, now()).unwrap(),
        service.wellness(user_id, now()).unwrap()
    );
}

#[test]
fn test_correlations_find_linked_metrics() {
    let (service, user_id) = service();
    let insights = service.correlations(user_id, now()).unwrap();

    assert!(!insights.is_empty());
    assert!(insights.len() <= 10);
    assert!(insights
        .windows(2)
        .all(|w| w[0].correlation.abs() >= w[1].correlation.abs()));

    let stress_sleep = insights
        .iter()
        .find(|i| {
            let pair = [&i.factor_a, &i.factor_b];
            pair.contains(&&MetricType::Stress) && pair.contains(&&MetricType::SleepDuration)
        })
        .unwrap();
    assert!(stress_sleep.correlation < -0.99);
    assert!(stress_sleep.insight.contains("strong negative"));
    assert!(stress_sleep.confidence <= 0.95);

    // Steps never vary, so they pair with nothing
    assert!(insights
        .iter()
        .all(|i| i.factor_a != MetricType::Steps && i.factor_b != MetricType::Steps));
}

#[test]
fn test_progression_suggestions() {
    let (service, user_id) = service();
    let suggestions = service
        .progression(
            user_id,
            &[
                "Bench Press".to_string(),
                "Back Squat".to_string(),
                "Overhead Press".to_string(),
            ],
        )
        .unwrap();

    let bench = &suggestions["Bench Press"];
    assert_eq!(bench.status, ProgressionStatus::Increase);
    assert_eq!(bench.last_weight_kg, Some(dec!(100)));
    assert_eq!(bench.suggested_weight_kg, Some(dec!(102.5)));

    let squat = &suggestions["Back Squat"];
    assert_eq!(squat.status, ProgressionStatus::Deload);
    assert_eq!(squat.suggested_weight_kg, Some(dec!(125)));

    assert_eq!(suggestions["Overhead Press"].status, ProgressionStatus::New);
}

#[test]
fn test_nutrition_targets_and_score() {
    let (service, user_id) = service();

    let targets = service
        .nutrition_targets(user_id, now(), &Default::default())
        .unwrap();
    // 10*82 + 6.25*180 - 5*34 + 5
    assert_eq!(targets.bmr, 1780.0);
    assert!(targets.calorie_target > targets.tdee);

    let score = service
        .nutrition_score(user_id, now().date_naive(), now())
        .unwrap();
    assert_eq!(score.days_logged, 5);
    assert!((0.0..=100.0).contains(&score.overall_score));
    assert_eq!(score.breakdown.len(), 4);
}

#[test]
fn test_sleep_analytics() {
    let (service, user_id) = service();
    let sleep = service.sleep_analytics(user_id, 30, now()).unwrap();

    assert_eq!(sleep.nights_logged, 30);
    assert!(sleep.total_sleep_debt_hours > 0.0);
    assert!(sleep.consistency_score < 100.0);
    assert!(sleep.best_night.unwrap().sleep_score >= sleep.worst_night.unwrap().sleep_score);
}

#[test]
fn test_dashboard_report() {
    let (service, user_id) = service();
    let report = service.dashboard(user_id, now());

    assert!(report.degraded_sections.is_empty());
    assert_ne!(report.enhanced_recovery.status, RecoveryStatus::Unknown);
    assert_eq!(report.weekly_summary.workouts_completed, 3);
    assert_eq!(report.weekly_summary.workouts_planned, 4);
    assert_eq!(report.progress.recent_prs.len(), 1);
    assert!(report.recommendations.len() <= 5);
    assert!(report
        .recommendations
        .windows(2)
        .all(|w| w[0].priority <= w[1].priority));
    assert_eq!(
        report.recommendations.last().map(|r| r.priority),
        Some(100)
    );
}

/// Store whose set queries always fail
struct FlakySetStore(MemoryStore);

impl HealthStore for FlakySetStore {
    fn fetch_samples(
        &self,
        user_id: Uuid,
        metric_type: Option<&MetricType>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>, StoreError> {
        self.0.fetch_samples(user_id, metric_type, start, end)
    }

    fn fetch_sets(
        &self,
        _user_id: Uuid,
        _exercise: Option<&str>,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<WorkingSet>, StoreError> {
        Err(StoreError::Unavailable {
            reason: "workout_sets timed out".to_string(),
        })
    }

    fn fetch_user_baselines(&self, user_id: Uuid) -> Result<Option<UserBaselines>, StoreError> {
        self.0.fetch_user_baselines(user_id)
    }

    fn fetch_physical_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PhysicalProfile>, StoreError> {
        self.0.fetch_physical_profile(user_id)
    }

    fn fetch_workouts(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WorkoutRecord>, StoreError> {
        self.0.fetch_workouts(user_id, start, end)
    }

    fn fetch_personal_records(&self, user_id: Uuid) -> Result<Vec<PersonalRecord>, StoreError> {
        self.0.fetch_personal_records(user_id)
    }

    fn fetch_planned_workout_count(&self, user_id: Uuid) -> Result<u32, StoreError> {
        self.0.fetch_planned_workout_count(user_id)
    }

    fn fetch_food_log_days(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u32, StoreError> {
        self.0.fetch_food_log_days(user_id, start, end)
    }

    fn fetch_daily_intake(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<NutritionIntake, StoreError> {
        self.0.fetch_daily_intake(user_id, date)
    }

    fn fetch_wellness_history(&self, user_id: Uuid, limit: usize) -> Result<Vec<f64>, StoreError> {
        self.0.fetch_wellness_history(user_id, limit)
    }

    fn fetch_exercise_category(
        &self,
        exercise: &str,
    ) -> Result<Option<ExerciseCategory>, StoreError> {
        self.0.fetch_exercise_category(exercise)
    }
}

#[test]
fn test_dashboard_survives_failing_progress_section() {
    let user_id = Uuid::new_v4();
    let mut store = MemoryStore::new();
    store.insert_user(user_id, populated_user());
    let service = AnalyticsService::new(FlakySetStore(store), EngineConfig::default()).unwrap();

    let report = service.dashboard(user_id, now());

    assert_eq!(report.degraded_sections, vec!["progress".to_string()]);
    assert_eq!(report.progress.total_volume_week, 0.0);
    assert!(report.progress.key_lifts.is_empty());
    assert_eq!(report.weekly_summary.workouts_completed, 3);
    assert_ne!(report.enhanced_recovery.status, RecoveryStatus::Unknown);
    assert_ne!(report.readiness.recommended_intensity, IntensityLevel::Rest);

    // Progression reads sets too and reports the failure instead of degrading
    assert!(service
        .progression(user_id, &["Bench Press".to_string()])
        .is_err());
}
