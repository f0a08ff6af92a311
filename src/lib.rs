// Library interface for HealthPulse
// The CLI and integration tests both go through these modules

pub mod config;
pub mod correlation;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod models;
pub mod nutrition;
pub mod progression;
pub mod scoring;
pub mod service;
pub mod sleep;
pub mod store;
pub mod training;

// Re-export commonly used types for convenience
pub use config::EngineConfig;
pub use correlation::{CorrelationEngine, CorrelationInsight};
pub use dashboard::{DashboardAggregator, DashboardReport};
pub use error::{AnalyticsError, Result};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use models::*;
pub use nutrition::{NutritionScore, NutritionTargetCalculator, NutritionTargets};
pub use progression::{ProgressionAdvisor, ProgressionStatus, ProgressionSuggestion};
pub use scoring::{ReadinessResult, RecoveryResult, ScoreCalculator, WellnessResult};
pub use service::AnalyticsService;
pub use sleep::{SleepAnalytics, SleepAnalyzer};
pub use store::{HealthStore, MemoryStore};
pub use training::TrainingAnalyzer;
