//! Error types for risk analytics

use thiserror::Error;

/// Errors that can occur in risk, stress and advisory calculations
///
/// Degenerate inputs such as a zero-variance series are not errors; the
/// affected estimators resolve them to a documented zero instead.
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Length mismatch: {left} vs {right} observations")]
    LengthMismatch { left: usize, right: usize },

    #[error("Invalid probability: {0} (must be strictly between 0 and 1)")]
    InvalidProbability(f64),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid holding {symbol}: {reason}")]
    InvalidHolding { symbol: String, reason: String },

    #[error("Duplicate symbol in portfolio: {0}")]
    DuplicateSymbol(String),

    #[error("Portfolio has no holdings")]
    EmptyPortfolio,

    #[error("Portfolio has no positive current value")]
    ZeroPortfolioValue,

    #[error("No return history for {0}")]
    MissingHistory(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RiskError>;
