use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::correlation::CorrelationConfig;
use crate::dashboard::DashboardConfig;
use crate::error::ConfigError;
use crate::logging::LogConfig;
use crate::models::UserBaselines;
use crate::nutrition::NutritionConfig;
use crate::progression::ProgressionConfig;
use crate::scoring::ScoringConfig;
use crate::sleep::SleepConfig;
use crate::training::TrainingConfig;

/// Allowed distance of a weight table's sum from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Engine configuration
///
/// Every tunable of the analytics engine lives here. Sections missing from a
/// TOML file fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Baselines used when the store has none for a user
    pub default_baselines: UserBaselines,

    /// Recovery, readiness and wellness weight tables
    pub scoring: ScoringConfig,

    /// Nutrition adherence scoring
    pub nutrition: NutritionConfig,

    /// Progressive overload rules
    pub progression: ProgressionConfig,

    /// Correlation discovery thresholds
    pub correlation: CorrelationConfig,

    /// Sleep analytics
    pub sleep: SleepConfig,

    /// Volume, muscle balance and key-lift analytics
    pub training: TrainingConfig,

    /// Dashboard thresholds
    pub dashboard: DashboardConfig,

    pub logging: LogConfig,
}

/// Check that a weight table holds no negative weight and sums to 1.0
pub fn validate_weights(table: &str, weights: &[(&str, f64)]) -> Result<(), ConfigError> {
    if let Some((factor, weight)) = weights.iter().find(|(_, w)| *w < 0.0 || w.is_nan()) {
        return Err(ConfigError::NegativeWeight {
            table: table.to_string(),
            factor: factor.to_string(),
            weight: *weight,
        });
    }

    let sum: f64 = weights.iter().map(|(_, w)| w).sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ConfigError::WeightSum {
            table: table.to_string(),
            sum,
        });
    }

    Ok(())
}

impl EngineConfig {
    /// Validate every section, failing on the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_baselines.hrv_baseline <= 0.0 || self.default_baselines.rhr_baseline <= 0.0
        {
            return Err(ConfigError::InvalidValue {
                field: "default_baselines".to_string(),
                reason: "baselines must be positive".to_string(),
            });
        }

        self.scoring.validate()?;
        self.nutrition.validate()?;
        self.progression.validate()?;
        self.correlation.validate()?;
        self.sleep.validate()?;
        self.training.validate()?;
        self.dashboard.validate()?;

        tracing::debug!("Engine configuration validated");
        Ok(())
    }

    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: EngineConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".healthpulse")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    ///
    /// A missing file silently yields defaults. A file that exists but fails to
    /// parse or validate is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            tracing::info!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load_from_file(&config_path)
    }
}
