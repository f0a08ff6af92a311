//! Health data access
//!
//! The analytics engine reads everything through [`HealthStore`]. Persistence
//! belongs to the caller; [`MemoryStore`] is an in-memory implementation backed
//! by a JSON snapshot, with CSV import for metric samples.

use crate::error::{AnalyticsError, StoreError};
use crate::models::{
    group_into_sessions, ExerciseCategory, ExerciseSession, MetricSample, MetricType,
    NutritionIntake, PersonalRecord, PhysicalProfile, UserBaselines, WorkingSet, WorkoutRecord,
};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Read access to a user's health records
///
/// Time ranges are half-open: `start <= t < end`.
pub trait HealthStore: Send + Sync {
    fn fetch_samples(
        &self,
        user_id: Uuid,
        metric_type: Option<&MetricType>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>, StoreError>;

    /// Logged sets, optionally limited to one exercise (case-insensitive)
    fn fetch_sets(
        &self,
        user_id: Uuid,
        exercise: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WorkingSet>, StoreError>;

    /// Up to `limit` most recent sessions of one exercise, most recent first
    fn fetch_recent_sessions(
        &self,
        user_id: Uuid,
        exercise: &str,
        limit: usize,
    ) -> Result<Vec<ExerciseSession>, StoreError> {
        let sets = self.fetch_sets(
            user_id,
            Some(exercise),
            DateTime::<Utc>::MIN_UTC,
            DateTime::<Utc>::MAX_UTC,
        )?;
        let mut sessions = group_into_sessions(&sets);
        sessions.truncate(limit);
        Ok(sessions)
    }

    fn fetch_user_baselines(&self, user_id: Uuid) -> Result<Option<UserBaselines>, StoreError>;

    fn fetch_physical_profile(&self, user_id: Uuid)
        -> Result<Option<PhysicalProfile>, StoreError>;

    fn fetch_workouts(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WorkoutRecord>, StoreError>;

    fn fetch_personal_records(&self, user_id: Uuid) -> Result<Vec<PersonalRecord>, StoreError>;

    /// Workouts scheduled this week by the user's active training plan
    fn fetch_planned_workout_count(&self, user_id: Uuid) -> Result<u32, StoreError>;

    /// Days in `[start, end]` with at least one food entry
    fn fetch_food_log_days(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u32, StoreError>;

    /// Food consumed on `date`, zero when nothing was logged
    fn fetch_daily_intake(&self, user_id: Uuid, date: NaiveDate)
        -> Result<NutritionIntake, StoreError>;

    /// Up to `limit` previous wellness scores, most recent first
    fn fetch_wellness_history(&self, user_id: Uuid, limit: usize) -> Result<Vec<f64>, StoreError>;

    fn fetch_exercise_category(&self, exercise: &str) -> Result<Option<ExerciseCategory>, StoreError>;
}

/// A stored wellness score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessEntry {
    pub recorded_at: DateTime<Utc>,
    pub score: f64,
}

/// Every record held for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserData {
    pub baselines: Option<UserBaselines>,
    pub profile: Option<PhysicalProfile>,
    pub samples: Vec<MetricSample>,
    pub sets: Vec<WorkingSet>,
    pub workouts: Vec<WorkoutRecord>,
    pub personal_records: Vec<PersonalRecord>,
    pub planned_workouts: u32,
    pub daily_intake: BTreeMap<NaiveDate, NutritionIntake>,
    pub wellness_history: Vec<WellnessEntry>,
}

/// CSV row layout accepted by [`MemoryStore::import_samples_csv`]
#[derive(Debug, Deserialize)]
struct SampleRow {
    metric_type: String,
    value: f64,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    source: Option<String>,
}

/// In-memory store keyed by user id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStore {
    pub users: HashMap<Uuid, UserData>,
    /// Exercise catalog: exercise name to category
    pub exercise_categories: BTreeMap<String, ExerciseCategory>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&mut self, user_id: Uuid, data: UserData) {
        self.users.insert(user_id, data);
    }

    pub fn user_mut(&mut self, user_id: Uuid) -> &mut UserData {
        self.users.entry(user_id).or_default()
    }

    pub fn add_exercise(&mut self, name: impl Into<String>, category: ExerciseCategory) {
        self.exercise_categories.insert(name.into(), category);
    }

    fn user(&self, user_id: Uuid) -> Result<&UserData, StoreError> {
        self.users
            .get(&user_id)
            .ok_or(StoreError::UserNotFound { user_id })
    }

    /// Load a JSON snapshot
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).with_context(|| {
            format!("Failed to read data snapshot: {}", path.as_ref().display())
        })?;

        let store: MemoryStore = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse data snapshot: {}", path.as_ref().display()))?;

        tracing::info!(
            path = %path.as_ref().display(),
            users = store.users.len(),
            "Loaded data snapshot"
        );
        Ok(store)
    }

    /// Write a JSON snapshot
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .with_context(|| "Failed to serialize data snapshot")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write data snapshot: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Append samples from a CSV file with `metric_type,value,timestamp[,source]` columns
    ///
    /// Returns the number of samples imported. Rows with a non-finite value
    /// are skipped.
    pub fn import_samples_csv<P: AsRef<Path>>(&mut self, user_id: Uuid, path: P) -> Result<usize> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&path)
            .with_context(|| format!("Failed to open CSV file: {}", path.as_ref().display()))?;

        let mut imported = Vec::new();
        for (line, row) in reader.deserialize::<SampleRow>().enumerate() {
            let row = row.map_err(|e| {
                AnalyticsError::Store(StoreError::MalformedRecord {
                    collection: "samples".to_string(),
                    reason: format!("data row {}: {}", line + 1, e),
                })
            })?;
            if !row.value.is_finite() {
                tracing::warn!(row = line + 1, "Skipping sample with non-finite value");
                continue;
            }
            imported.push(MetricSample {
                metric_type: MetricType::from(row.metric_type),
                value: row.value,
                timestamp: row.timestamp,
                source: row.source.filter(|s| !s.is_empty()),
            });
        }

        let count = imported.len();
        self.user_mut(user_id).samples.extend(imported);

        tracing::info!(%user_id, count, "Imported samples from CSV");
        Ok(count)
    }
}

fn in_range(t: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    t >= start && t < end
}

impl HealthStore for MemoryStore {
    fn fetch_samples(
        &self,
        user_id: Uuid,
        metric_type: Option<&MetricType>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>, StoreError> {
        Ok(self
            .user(user_id)?
            .samples
            .iter()
            .filter(|s| metric_type.map_or(true, |m| &s.metric_type == m))
            .filter(|s| in_range(s.timestamp, start, end))
            .cloned()
            .collect())
    }

    fn fetch_sets(
        &self,
        user_id: Uuid,
        exercise: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WorkingSet>, StoreError> {
        Ok(self
            .user(user_id)?
            .sets
            .iter()
            .filter(|s| exercise.map_or(true, |e| s.exercise.eq_ignore_ascii_case(e)))
            .filter(|s| in_range(s.performed_at, start, end))
            .cloned()
            .collect())
    }

    fn fetch_user_baselines(&self, user_id: Uuid) -> Result<Option<UserBaselines>, StoreError> {
        Ok(self.user(user_id)?.baselines)
    }

    fn fetch_physical_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PhysicalProfile>, StoreError> {
        Ok(self.user(user_id)?.profile.clone())
    }

    fn fetch_workouts(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<WorkoutRecord>, StoreError> {
        Ok(self
            .user(user_id)?
            .workouts
            .iter()
            .filter(|w| in_range(w.start_time, start, end))
            .cloned()
            .collect())
    }

    fn fetch_personal_records(&self, user_id: Uuid) -> Result<Vec<PersonalRecord>, StoreError> {
        Ok(self.user(user_id)?.personal_records.clone())
    }

    fn fetch_planned_workout_count(&self, user_id: Uuid) -> Result<u32, StoreError> {
        Ok(self.user(user_id)?.planned_workouts)
    }

    fn fetch_food_log_days(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u32, StoreError> {
        if start > end {
            return Ok(0);
        }
        let days = self.user(user_id)?.daily_intake.range(start..=end).count();
        Ok(days as u32)
    }

    fn fetch_daily_intake(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<NutritionIntake, StoreError> {
        Ok(self
            .user(user_id)?
            .daily_intake
            .get(&date)
            .copied()
            .unwrap_or_default())
    }

    fn fetch_wellness_history(&self, user_id: Uuid, limit: usize) -> Result<Vec<f64>, StoreError> {
        let mut history: Vec<&WellnessEntry> = self.user(user_id)?.wellness_history.iter().collect();
        history.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(history.into_iter().take(limit).map(|e| e.score).collect())
    }

    fn fetch_exercise_category(&self, exercise: &str) -> Result<Option<ExerciseCategory>, StoreError> {
        Ok(self
            .exercise_categories
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(exercise))
            .map(|(_, category)| *category))
    }
}
