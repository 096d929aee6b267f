//! Session configuration

use crate::error::{Result, SessionError};
use rd_risk::{AdvisoryConfig, RiskConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Risk session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Auto-refresh period in seconds
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Whether the auto-refresh timer starts enabled
    #[serde(default = "default_auto_refresh")]
    pub auto_refresh: bool,

    /// Seed for the session's master generator (None = entropy)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Analytics parameters
    #[serde(default)]
    pub risk: RiskConfig,

    /// Advisory rules
    #[serde(default)]
    pub advisory: AdvisoryConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            auto_refresh: default_auto_refresh(),
            seed: None,
            risk: RiskConfig::default(),
            advisory: AdvisoryConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: SessionConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            return Err(SessionError::Config(
                "refresh_interval_secs must be positive".to_string(),
            ));
        }
        self.risk.validate()?;
        Ok(())
    }

    /// Get refresh interval as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_auto_refresh() -> bool {
    true
}
