//! Unified error hierarchy for HealthPulse
//!
//! Calculators never fail on sparse or degenerate data; they fall back to neutral
//! values instead. Errors are reserved for the storage boundary, configuration
//! validation at startup, and genuinely invalid caller input.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for all HealthPulse operations
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Errors raised by the caller-provided health data store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Engine configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Calculation errors
    #[error("Calculation error: {0}")]
    Calculation(#[from] CalculationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by a [`crate::store::HealthStore`] implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// No records exist for the requested user
    #[error("User not found: {user_id}")]
    UserNotFound { user_id: Uuid },

    /// Backing store could not be reached
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    /// A stored row could not be decoded
    #[error("Malformed record in {collection}: {reason}")]
    MalformedRecord { collection: String, reason: String },
}

/// Engine configuration errors, raised at construction time only
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A weight table does not sum to 1.0
    #[error("Weights of table '{table}' sum to {sum:.6}, expected 1.0")]
    WeightSum { table: String, sum: f64 },

    /// A weight table holds a negative weight
    #[error("Negative weight for '{factor}' in table '{table}': {weight}")]
    NegativeWeight {
        table: String,
        factor: String,
        weight: f64,
    },

    /// A scalar setting is out of range
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Calculation errors
#[derive(Debug, Error)]
pub enum CalculationError {
    /// Insufficient data for calculation
    #[error("Insufficient data for {calculation}: {reason}")]
    InsufficientData { calculation: String, reason: String },

    /// Invalid input value
    #[error("Invalid input for {calculation}: {parameter}={value}")]
    InvalidInput {
        calculation: String,
        parameter: String,
        value: String,
    },
}

/// Result type alias for HealthPulse operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;

impl AnalyticsError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalyticsError::Store(StoreError::Unavailable { .. }) | AnalyticsError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AnalyticsError::Store(StoreError::UserNotFound { .. }) => ErrorSeverity::Warning,
            AnalyticsError::Validation(_) => ErrorSeverity::Warning,
            AnalyticsError::Calculation(CalculationError::InsufficientData { .. }) => {
                ErrorSeverity::Info
            }
            AnalyticsError::Store(_) => ErrorSeverity::Error,
            AnalyticsError::Config(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AnalyticsError::Store(StoreError::UserNotFound { .. }) => {
                "No health data found for this account yet.".to_string()
            }
            AnalyticsError::Store(StoreError::Unavailable { .. }) => {
                "Health data is temporarily unavailable. Please try again shortly.".to_string()
            }
            AnalyticsError::Calculation(CalculationError::InsufficientData {
                calculation, ..
            }) => {
                format!(
                    "Not enough data to calculate {}. Keep logging and check back soon.",
                    calculation
                )
            }
            AnalyticsError::Calculation(CalculationError::InvalidInput {
                calculation,
                parameter,
                ..
            }) => {
                format!("Cannot calculate {}: check the {} in your profile.", calculation, parameter)
            }
            AnalyticsError::Store(StoreError::MalformedRecord { collection, reason }) => {
                format!("Some {} data could not be read ({}).", collection, reason)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical error requiring immediate attention
    Critical,
    /// Error that prevents the operation but the system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
