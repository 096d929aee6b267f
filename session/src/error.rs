use rd_risk::RiskError;
use thiserror::Error;
use uuid::Uuid;

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No portfolio loaded")]
    NoPortfolio,

    #[error("Risk calculation failed: {0}")]
    Risk(#[from] RiskError),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(Uuid),

    #[error("Alert not found: {0}")]
    AlertNotFound(Uuid),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tokio::task::JoinError> for SessionError {
    fn from(err: tokio::task::JoinError) -> Self {
        SessionError::TaskFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
