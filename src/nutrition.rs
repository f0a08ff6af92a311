//! Nutrition targets and adherence scoring
//!
//! Targets come from the Mifflin-St Jeor BMR, an activity multiplier and a
//! goal-specific calorie adjustment and macro split. Adherence compares what
//! was eaten against those targets with a piecewise-linear decay.

use crate::config::validate_weights;
use crate::error::ConfigError;
use crate::models::{
    round_to, ActivityLevel, Gender, Impact, NutritionGoal, NutritionIntake, PhysicalProfile,
    WorkoutRecord, NEUTRAL_SCORE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Energy per gram of each macronutrient (kcal)
pub const PROTEIN_KCAL_PER_G: f64 = 4.0;
pub const CARBS_KCAL_PER_G: f64 = 4.0;
pub const FAT_KCAL_PER_G: f64 = 9.0;

/// Share of calories from each macronutrient (fractions summing to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroSplit {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroSplit {
    pub fn for_goal(goal: NutritionGoal) -> Self {
        let (protein, carbs, fat) = match goal {
            NutritionGoal::LoseWeight => (0.40, 0.30, 0.30),
            NutritionGoal::BuildMuscle => (0.30, 0.45, 0.25),
            NutritionGoal::Maintain => (0.25, 0.45, 0.30),
            NutritionGoal::GeneralHealth => (0.20, 0.50, 0.30),
        };
        MacroSplit {
            protein,
            carbs,
            fat,
        }
    }
}

/// Daily calorie adjustment applied on top of TDEE for a goal
pub fn calorie_adjustment(goal: NutritionGoal) -> f64 {
    match goal {
        NutritionGoal::LoseWeight => -500.0,
        NutritionGoal::BuildMuscle => 300.0,
        NutritionGoal::Maintain | NutritionGoal::GeneralHealth => 0.0,
    }
}

/// Per-user overrides of computed targets
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetOverrides {
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
}

/// Daily nutrition targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionTargets {
    pub bmr: f64,
    pub tdee: f64,
    pub calorie_target: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    /// Percentage split used to derive the default macro grams
    pub protein_pct: f64,
    pub carbs_pct: f64,
    pub fat_pct: f64,
}

/// Adherence of one nutrient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientAdherence {
    pub consumed: f64,
    pub target: f64,
    /// consumed / target, 0 when the target is not positive
    pub ratio: f64,
    pub score: f64,
    pub impact: Impact,
}

/// Nutrition adherence score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionScore {
    pub overall_score: f64,
    pub calorie_adherence_score: f64,
    pub macro_balance_score: f64,
    pub consistency_score: f64,
    pub days_logged: u32,
    /// Keyed by nutrient: calories, protein, carbs, fat
    pub breakdown: BTreeMap<String, NutrientAdherence>,
}

/// Weights of the three nutrition score components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionScoreWeights {
    pub calories: f64,
    pub macros: f64,
    pub consistency: f64,
}

impl Default for NutritionScoreWeights {
    fn default() -> Self {
        Self {
            calories: 0.40,
            macros: 0.40,
            consistency: 0.20,
        }
    }
}

/// Nutrition scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionConfig {
    pub score_weights: NutritionScoreWeights,
    /// Nutrient scores at or above this count as a positive impact
    pub positive_impact_threshold: f64,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            score_weights: NutritionScoreWeights::default(),
            positive_impact_threshold: 70.0,
        }
    }
}

impl NutritionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.score_weights;
        validate_weights(
            "nutrition",
            &[
                ("calories", w.calories),
                ("macros", w.macros),
                ("consistency", w.consistency),
            ],
        )?;
        if !(0.0..=100.0).contains(&self.positive_impact_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "nutrition.positive_impact_threshold".to_string(),
                reason: format!("{} is outside [0, 100]", self.positive_impact_threshold),
            });
        }
        Ok(())
    }
}

/// Adherence score of a single nutrient (0-100)
///
/// A non-positive target scores neutral.
pub fn adherence_score(consumed: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return NEUTRAL_SCORE;
    }

    let deviation = (1.0 - consumed / target).abs();
    if deviation <= 0.10 {
        100.0 - deviation * 100.0
    } else if deviation <= 0.20 {
        80.0 - (deviation - 0.10) * 100.0
    } else if deviation <= 0.50 {
        60.0 - (deviation - 0.20) * 100.0
    } else {
        (30.0 - (deviation - 0.50) * 60.0).max(0.0)
    }
}

/// Calories burned by logged workouts, used as the TDEE activity adjustment
pub fn activity_calories_from_workouts(workouts: &[WorkoutRecord]) -> f64 {
    workouts
        .iter()
        .filter_map(|w| w.calories_burned)
        .filter(|kcal| *kcal > 0.0)
        .sum()
}

/// BMR, TDEE and macro target calculator
#[derive(Debug, Clone, Default)]
pub struct NutritionTargetCalculator {
    config: NutritionConfig,
}

impl NutritionTargetCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NutritionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Basal metabolic rate (Mifflin-St Jeor), kcal/day
    pub fn calculate_bmr(&self, weight_kg: f64, height_cm: f64, age: u32, gender: Gender) -> f64 {
        let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
        match gender {
            Gender::Male => base + 5.0,
            Gender::Female | Gender::Other => base - 161.0,
        }
    }

    /// Total daily energy expenditure, kcal/day
    pub fn calculate_tdee(&self, bmr: f64, level: ActivityLevel, activity_adjustment: f64) -> f64 {
        bmr * level.multiplier() + activity_adjustment
    }

    /// Macro grams (protein, carbs, fat) for a calorie target
    pub fn macro_grams(&self, calorie_target: f64, split: MacroSplit) -> (f64, f64, f64) {
        (
            calorie_target * split.protein / PROTEIN_KCAL_PER_G,
            calorie_target * split.carbs / CARBS_KCAL_PER_G,
            calorie_target * split.fat / FAT_KCAL_PER_G,
        )
    }

    /// Daily targets for a profile
    ///
    /// `activity_adjustment` is extra expenditure from logged workouts. Overrides
    /// replace individual computed values.
    pub fn calculate_targets(
        &self,
        profile: &PhysicalProfile,
        activity_adjustment: f64,
        overrides: &TargetOverrides,
    ) -> NutritionTargets {
        let bmr = self.calculate_bmr(
            profile.weight_kg,
            profile.height_cm,
            profile.age,
            profile.gender,
        );
        let tdee = self.calculate_tdee(bmr, profile.activity_level, activity_adjustment);

        let goal = profile.nutrition_goal;
        let calorie_target = overrides
            .calories
            .unwrap_or_else(|| tdee + calorie_adjustment(goal));

        let split = MacroSplit::for_goal(goal);
        let (protein_g, carbs_g, fat_g) = self.macro_grams(calorie_target, split);

        let targets = NutritionTargets {
            bmr: round_to(bmr, 1),
            tdee: round_to(tdee, 1),
            calorie_target: round_to(calorie_target, 1),
            protein_g: round_to(overrides.protein_g.unwrap_or(protein_g), 1),
            carbs_g: round_to(overrides.carbs_g.unwrap_or(carbs_g), 1),
            fat_g: round_to(overrides.fat_g.unwrap_or(fat_g), 1),
            protein_pct: round_to(split.protein * 100.0, 1),
            carbs_pct: round_to(split.carbs * 100.0, 1),
            fat_pct: round_to(split.fat * 100.0, 1),
        };

        tracing::debug!(
            bmr = targets.bmr,
            tdee = targets.tdee,
            calorie_target = targets.calorie_target,
            "Nutrition targets calculated"
        );

        targets
    }

    /// Adherence score for one day of intake
    pub fn calculate_score(
        &self,
        intake: &NutritionIntake,
        targets: &NutritionTargets,
        days_logged_this_week: u32,
    ) -> NutritionScore {
        let mut breakdown = BTreeMap::new();

        let calorie_score = self.nutrient(
            &mut breakdown,
            "calories",
            intake.calories,
            targets.calorie_target,
        );
        let macro_scores = [
            self.nutrient(&mut breakdown, "protein", intake.protein_g, targets.protein_g),
            self.nutrient(&mut breakdown, "carbs", intake.carbs_g, targets.carbs_g),
            self.nutrient(&mut breakdown, "fat", intake.fat_g, targets.fat_g),
        ];
        let macro_balance = macro_scores.iter().sum::<f64>() / macro_scores.len() as f64;
        let consistency = (f64::from(days_logged_this_week) / 7.0 * 100.0).min(100.0);

        let w = &self.config.score_weights;
        let overall =
            calorie_score * w.calories + macro_balance * w.macros + consistency * w.consistency;

        NutritionScore {
            overall_score: round_to(overall, 1),
            calorie_adherence_score: round_to(calorie_score, 1),
            macro_balance_score: round_to(macro_balance, 1),
            consistency_score: round_to(consistency, 1),
            days_logged: days_logged_this_week,
            breakdown,
        }
    }

    fn nutrient(
        &self,
        breakdown: &mut BTreeMap<String, NutrientAdherence>,
        name: &str,
        consumed: f64,
        target: f64,
    ) -> f64 {
        let score = adherence_score(consumed, target);
        let ratio = if target > 0.0 {
            round_to(consumed / target, 2)
        } else {
            0.0
        };
        let impact = if score >= self.config.positive_impact_threshold {
            Impact::Positive
        } else {
            Impact::Negative
        };

        breakdown.insert(
            name.to_string(),
            NutrientAdherence {
                consumed: round_to(consumed, 1),
                target: round_to(target, 1),
                ratio,
                score: round_to(score, 1),
                impact,
            },
        );
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn profile(goal: NutritionGoal) -> PhysicalProfile {
        PhysicalProfile {
            age: 30,
            height_cm: 175.0,
            weight_kg: 70.0,
            gender: Gender::Male,
            activity_level: ActivityLevel::Moderate,
            nutrition_goal: goal,
        }
    }

    #[test]
    fn test_bmr_mifflin_st_jeor() {
        let calc = NutritionTargetCalculator::new();

        // 700 + 1093.75 - 150 + 5
        assert_eq!(calc.calculate_bmr(70.0, 175.0, 30, Gender::Male), 1648.75);
        assert_eq!(calc.calculate_bmr(70.0, 175.0, 30, Gender::Female), 1482.75);
        assert_eq!(
            calc.calculate_bmr(70.0, 175.0, 30, Gender::Other),
            calc.calculate_bmr(70.0, 175.0, 30, Gender::Female)
        );
    }

    #[test]
    fn test_adherence_brackets() {
        assert_eq!(adherence_score(2000.0, 2000.0), 100.0);
        assert!((adherence_score(2500.0, 2000.0) - 55.0).abs() < 1e-9);
        assert!((adherence_score(1700.0, 2000.0) - 75.0).abs() < 1e-9);
        assert!((adherence_score(1900.0, 2000.0) - 95.0).abs() < 1e-9);
        assert_eq!(adherence_score(0.0, 2000.0), 0.0);
        assert_eq!(adherence_score(500.0, 0.0), NEUTRAL_SCORE);
        assert_eq!(adherence_score(500.0, -10.0), NEUTRAL_SCORE);
    }

    #[test]
    fn test_targets_for_weight_loss() {
        let calc = NutritionTargetCalculator::new();
        let targets = calc.calculate_targets(
            &profile(NutritionGoal::LoseWeight),
            0.0,
            &TargetOverrides::default(),
        );

        // 1648.75 * 1.55 = 2555.5625
        assert_eq!(targets.bmr, 1648.8);
        assert_eq!(targets.tdee, 2555.6);
        assert_eq!(targets.calorie_target, 2055.6);
        assert_eq!(targets.protein_g, 205.6);
        assert_eq!(targets.fat_g, 68.5);
        assert_eq!(targets.protein_pct, 40.0);
    }

    #[test]
    fn test_overrides_replace_computed_values() {
        let calc = NutritionTargetCalculator::new();
        let overrides = TargetOverrides {
            calories: Some(2000.0),
            protein_g: Some(180.0),
            ..TargetOverrides::default()
        };

        let targets = calc.calculate_targets(&profile(NutritionGoal::Maintain), 250.0, &overrides);

        assert_eq!(targets.calorie_target, 2000.0);
        assert_eq!(targets.protein_g, 180.0);
        assert_eq!(targets.carbs_g, 225.0);
        assert_eq!(targets.tdee, 2805.6);
    }

    #[test]
    fn test_score_breakdown() {
        let calc = NutritionTargetCalculator::new();
        let targets = NutritionTargets {
            bmr: 1600.0,
            tdee: 2400.0,
            calorie_target: 2000.0,
            protein_g: 150.0,
            carbs_g: 200.0,
            fat_g: 70.0,
            protein_pct: 30.0,
            carbs_pct: 40.0,
            fat_pct: 30.0,
        };
        let intake = NutritionIntake {
            calories: 2000.0,
            protein_g: 150.0,
            carbs_g: 100.0,
            fat_g: 70.0,
        };

        let score = calc.calculate_score(&intake, &targets, 7);

        assert_eq!(score.calorie_adherence_score, 100.0);
        // carbs: deviation 0.5 -> 60 - 30 = 30
        assert_eq!(score.breakdown["carbs"].score, 30.0);
        assert_eq!(score.breakdown["carbs"].ratio, 0.5);
        assert_eq!(score.breakdown["carbs"].impact, Impact::Negative);
        assert_eq!(score.breakdown["protein"].impact, Impact::Positive);
        assert!((score.macro_balance_score - 76.7).abs() < 1e-9);
        assert_eq!(score.consistency_score, 100.0);
        // 100*.4 + 76.67*.4 + 100*.2
        assert_eq!(score.overall_score, 90.7);
    }

    #[test]
    fn test_activity_calories_ignore_missing() {
        let now = Utc::now();
        let workouts = vec![
            WorkoutRecord {
                start_time: now,
                training_load: None,
                intensity: None,
                calories_burned: Some(320.0),
                duration_minutes: None,
            },
            WorkoutRecord {
                start_time: now,
                training_load: None,
                intensity: None,
                calories_burned: None,
                duration_minutes: None,
            },
        ];

        assert_eq!(activity_calories_from_workouts(&workouts), 320.0);
    }

    #[test]
    fn test_invalid_score_weights() {
        let config = NutritionConfig {
            score_weights: NutritionScoreWeights {
                calories: 0.5,
                macros: 0.5,
                consistency: 0.2,
            },
            ..NutritionConfig::default()
        };
        assert!(NutritionTargetCalculator::with_config(config).is_err());
    }

    proptest! {
        #[test]
        fn test_adherence_bounds(consumed in 0.0f64..10_000.0, target in -100.0f64..5_000.0) {
            let score = adherence_score(consumed, target);
            prop_assert!((0.0..=100.0).contains(&score));
            prop_assert_eq!(adherence_score(consumed, target), score);
        }
    }
}
