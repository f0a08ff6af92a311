use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Score returned whenever a component has nothing to work with
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Health metric types recorded by ingestion
///
/// Unknown metric names are preserved verbatim in [`MetricType::Other`] so that
/// correlation discovery can still pair them and report them by their raw name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MetricType {
    SleepDuration,
    SleepQuality,
    DeepSleep,
    RemSleep,
    Hrv,
    RestingHr,
    Stress,
    EnergyLevel,
    Mood,
    Soreness,
    Steps,
    ActiveCalories,
    CaloriesIn,
    Weight,
    Other(String),
}

impl MetricType {
    /// Storage name of the metric type
    pub fn as_str(&self) -> &str {
        match self {
            MetricType::SleepDuration => "sleep_duration",
            MetricType::SleepQuality => "sleep_quality",
            MetricType::DeepSleep => "deep_sleep",
            MetricType::RemSleep => "rem_sleep",
            MetricType::Hrv => "hrv",
            MetricType::RestingHr => "resting_hr",
            MetricType::Stress => "stress",
            MetricType::EnergyLevel => "energy_level",
            MetricType::Mood => "mood",
            MetricType::Soreness => "soreness",
            MetricType::Steps => "steps",
            MetricType::ActiveCalories => "active_calories",
            MetricType::CaloriesIn => "calories_in",
            MetricType::Weight => "weight",
            MetricType::Other(name) => name,
        }
    }

    /// Human-friendly name used in generated insights
    pub fn display_name(&self) -> &str {
        match self {
            MetricType::SleepDuration => "sleep duration",
            MetricType::SleepQuality => "sleep quality",
            MetricType::DeepSleep => "deep sleep",
            MetricType::RemSleep => "REM sleep",
            MetricType::Hrv => "heart rate variability",
            MetricType::RestingHr => "resting heart rate",
            MetricType::Stress => "stress levels",
            MetricType::EnergyLevel => "energy levels",
            MetricType::Mood => "mood",
            MetricType::Soreness => "muscle soreness",
            MetricType::Steps => "daily steps",
            MetricType::ActiveCalories => "active calories",
            MetricType::CaloriesIn => "calorie intake",
            MetricType::Weight => "body weight",
            MetricType::Other(name) => name,
        }
    }
}

impl From<&str> for MetricType {
    fn from(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "sleep_duration" => MetricType::SleepDuration,
            "sleep_quality" => MetricType::SleepQuality,
            "deep_sleep" => MetricType::DeepSleep,
            "rem_sleep" => MetricType::RemSleep,
            "hrv" => MetricType::Hrv,
            "resting_hr" => MetricType::RestingHr,
            "stress" => MetricType::Stress,
            "energy_level" | "energy" => MetricType::EnergyLevel,
            "mood" => MetricType::Mood,
            "soreness" => MetricType::Soreness,
            "steps" => MetricType::Steps,
            "active_calories" => MetricType::ActiveCalories,
            "calories_in" => MetricType::CaloriesIn,
            "weight" => MetricType::Weight,
            _ => MetricType::Other(name.to_string()),
        }
    }
}

impl From<String> for MetricType {
    fn from(name: String) -> Self {
        MetricType::from(name.as_str())
    }
}

impl From<MetricType> for String {
    fn from(metric: MetricType) -> Self {
        metric.as_str().to_string()
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single time-stamped health measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub metric_type: MetricType,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    /// Device or app that produced the sample ("manual", "apple_health", ...)
    #[serde(default)]
    pub source: Option<String>,
}

impl MetricSample {
    pub fn new(metric_type: MetricType, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            metric_type,
            value,
            timestamp,
            source: None,
        }
    }
}

/// Most recent sample value of a metric type, if any
pub fn latest_value(samples: &[MetricSample], metric: &MetricType) -> Option<f64> {
    samples
        .iter()
        .filter(|s| &s.metric_type == metric)
        .max_by_key(|s| s.timestamp)
        .map(|s| s.value)
}

/// Direction a factor pushes a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Impact::Positive => write!(f, "positive"),
            Impact::Negative => write!(f, "negative"),
            Impact::Neutral => write!(f, "neutral"),
        }
    }
}

/// One scored input to a composite score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedFactor {
    pub name: String,
    /// Raw input value in its natural unit
    pub value: f64,
    /// Normalized factor score (0-100)
    pub score: f64,
    pub impact: Impact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl WeightedFactor {
    pub fn new(name: impl Into<String>, value: f64, score: f64, impact: Impact) -> Self {
        Self {
            name: name.into(),
            value,
            score: clamp_score(score),
            impact,
            baseline: None,
            recommendation: None,
        }
    }

    pub fn with_baseline(mut self, baseline: f64) -> Self {
        self.baseline = Some(baseline);
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }
}

/// Factor lookup keyed by factor name
pub type FactorMap = BTreeMap<String, WeightedFactor>;

/// Exercise muscle-group categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    Chest,
    Back,
    Shoulders,
    Arms,
    Legs,
    Core,
    Cardio,
    #[default]
    #[serde(other)]
    Other,
}

impl ExerciseCategory {
    /// Parse a category name, falling back to `Other`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "chest" => ExerciseCategory::Chest,
            "back" => ExerciseCategory::Back,
            "shoulders" => ExerciseCategory::Shoulders,
            "arms" => ExerciseCategory::Arms,
            "legs" => ExerciseCategory::Legs,
            "core" => ExerciseCategory::Core,
            "cardio" => ExerciseCategory::Cardio,
            _ => ExerciseCategory::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseCategory::Chest => "chest",
            ExerciseCategory::Back => "back",
            ExerciseCategory::Shoulders => "shoulders",
            ExerciseCategory::Arms => "arms",
            ExerciseCategory::Legs => "legs",
            ExerciseCategory::Core => "core",
            ExerciseCategory::Cardio => "cardio",
            ExerciseCategory::Other => "other",
        }
    }

    /// Lower-body categories progress in larger increments
    pub fn is_lower_body(&self) -> bool {
        matches!(self, ExerciseCategory::Legs)
    }
}

impl fmt::Display for ExerciseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A logged strength-training set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingSet {
    pub exercise: String,
    #[serde(default)]
    pub category: ExerciseCategory,
    /// Load in kilograms
    #[serde(with = "rust_decimal::serde::float")]
    pub weight_kg: Decimal,
    pub reps: u32,
    /// Rate of perceived exertion (1-10)
    #[serde(default)]
    pub rpe: Option<f64>,
    #[serde(default)]
    pub is_warmup: bool,
    pub performed_at: DateTime<Utc>,
}

impl WorkingSet {
    /// Volume load (weight × reps)
    pub fn volume(&self) -> Decimal {
        self.weight_kg * Decimal::from(self.reps)
    }
}

/// All sets of one exercise performed in one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSession {
    pub performed_at: DateTime<Utc>,
    pub sets: Vec<WorkingSet>,
}

impl ExerciseSession {
    /// Heaviest load in the session, zero when empty
    pub fn max_weight(&self) -> Decimal {
        self.sets
            .iter()
            .map(|s| s.weight_kg)
            .max()
            .unwrap_or(Decimal::ZERO)
    }
}

/// Group sets into sessions by calendar day, most recent session first
pub fn group_into_sessions(sets: &[WorkingSet]) -> Vec<ExerciseSession> {
    let mut by_day: BTreeMap<NaiveDate, Vec<WorkingSet>> = BTreeMap::new();
    for set in sets {
        by_day
            .entry(set.performed_at.date_naive())
            .or_default()
            .push(set.clone());
    }

    by_day
        .into_values()
        .rev()
        .filter_map(|mut day_sets| {
            day_sets.sort_by_key(|s| s.performed_at);
            let performed_at = day_sets.last()?.performed_at;
            Some(ExerciseSession {
                performed_at,
                sets: day_sets,
            })
        })
        .collect()
}

/// Perceived intensity of a logged workout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutIntensity {
    Easy,
    Moderate,
    Hard,
    VeryHard,
}

impl WorkoutIntensity {
    pub fn is_hard(&self) -> bool {
        matches!(self, WorkoutIntensity::Hard | WorkoutIntensity::VeryHard)
    }
}

/// A completed workout as stored by the workout log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub start_time: DateTime<Utc>,
    /// Duration × intensity proxy (arbitrary units)
    #[serde(default)]
    pub training_load: Option<f64>,
    #[serde(default)]
    pub intensity: Option<WorkoutIntensity>,
    #[serde(default)]
    pub calories_burned: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

/// Personal record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    #[serde(rename = "1rm")]
    OneRepMax,
    #[serde(rename = "3rm")]
    ThreeRepMax,
    #[serde(rename = "5rm")]
    FiveRepMax,
    #[serde(rename = "10rm")]
    TenRepMax,
}

impl RecordType {
    /// Record type tracked for a given rep count
    pub fn from_reps(reps: u32) -> Option<Self> {
        match reps {
            1 => Some(RecordType::OneRepMax),
            3 => Some(RecordType::ThreeRepMax),
            5 => Some(RecordType::FiveRepMax),
            10 => Some(RecordType::TenRepMax),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordType::OneRepMax => "1rm",
            RecordType::ThreeRepMax => "3rm",
            RecordType::FiveRepMax => "5rm",
            RecordType::TenRepMax => "10rm",
        }
    }
}

/// Best-ever load for an exercise at a fixed rep count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecord {
    pub exercise_name: String,
    pub record_type: RecordType,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub previous_value: Option<Decimal>,
    pub achieved_at: DateTime<Utc>,
}

/// Per-user physiological baselines
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserBaselines {
    /// Baseline HRV (RMSSD, ms)
    pub hrv_baseline: f64,
    /// Baseline resting heart rate (bpm)
    pub rhr_baseline: f64,
}

impl Default for UserBaselines {
    fn default() -> Self {
        Self {
            hrv_baseline: 50.0,
            rhr_baseline: 60.0,
        }
    }
}

/// Biological sex used by the Mifflin-St Jeor equation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    #[serde(other)]
    Other,
}

impl Gender {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "male" | "m" => Gender::Male,
            "female" | "f" => Gender::Female,
            _ => Gender::Other,
        }
    }
}

/// Habitual activity level for TDEE estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Active,
    VeryActive,
    #[default]
    #[serde(other)]
    Moderate,
}

impl ActivityLevel {
    /// Parse an activity level, unknown levels default to moderate
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "sedentary" => ActivityLevel::Sedentary,
            "light" => ActivityLevel::Light,
            "active" => ActivityLevel::Active,
            "very_active" => ActivityLevel::VeryActive,
            _ => ActivityLevel::Moderate,
        }
    }

    /// TDEE multiplier applied to BMR
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }
}

/// Nutrition goal driving calorie adjustment and macro split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NutritionGoal {
    LoseWeight,
    BuildMuscle,
    Maintain,
    #[default]
    #[serde(other)]
    GeneralHealth,
}

impl NutritionGoal {
    /// Parse a goal name, unknown goals map to general health
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "lose_weight" => NutritionGoal::LoseWeight,
            "build_muscle" => NutritionGoal::BuildMuscle,
            "maintain" => NutritionGoal::Maintain,
            _ => NutritionGoal::GeneralHealth,
        }
    }
}

/// Body measurements and lifestyle settings from the user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalProfile {
    pub age: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub activity_level: ActivityLevel,
    #[serde(default)]
    pub nutrition_goal: NutritionGoal,
}

/// Food consumed over one day
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutritionIntake {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// Clamp a score into [0, 100], mapping NaN to the neutral score
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        NEUTRAL_SCORE
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Clamp a confidence into [0, 1]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Round half away from zero to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Longest accepted analysis window, in days
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// Start of a trailing window of `days` ending at `now`
///
/// Saturates at the earliest representable instant instead of overflowing.
pub fn window_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
