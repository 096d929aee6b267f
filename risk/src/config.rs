//! Analytics configuration
//!
//! Parameters for a risk calculation pass. Every field has a default, so a
//! partial YAML/JSON document only needs to name the values it overrides.

use crate::analytics::var::VarMethod;
use crate::error::{Result, RiskError};
use crate::returns::TRADING_DAYS;
use serde::{Deserialize, Serialize};

/// Risk calculator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Annual risk-free rate used by Sharpe and Sortino
    pub risk_free_rate: f64,

    /// Number of daily observations per return series
    pub horizon_days: usize,

    /// Estimator for var95/var99
    pub var_method: VarMethod,

    /// Draws per Monte Carlo VaR estimate
    pub monte_carlo_simulations: usize,

    /// Starting level of the price path used for drawdown
    pub start_price: f64,

    /// EWMA decay factor
    pub ewma_lambda: f64,

    /// Observations fed to the EWMA forecast
    pub ewma_window: usize,

    /// Forecast reported when the series is too short for EWMA
    pub default_volatility: f64,

    /// Market move used for portfolio delta (0.01 = 1%)
    pub delta_market_move: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            horizon_days: TRADING_DAYS,
            var_method: VarMethod::Historical,
            monte_carlo_simulations: 10_000,
            start_price: 100.0,
            ewma_lambda: 0.94,
            ewma_window: 30,
            default_volatility: 0.20,
            delta_market_move: 0.01,
        }
    }
}

impl RiskConfig {
    /// Load configuration from a YAML string
    ///
    /// # Example
    ///
    /// ```
    /// use rd_risk::{RiskConfig, VarMethod};
    ///
    /// let config = RiskConfig::from_yaml("var_method: parametric\nrisk_free_rate: 0.03").unwrap();
    /// assert_eq!(config.var_method, VarMethod::Parametric);
    /// assert_eq!(config.horizon_days, 252);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: RiskConfig = serde_yaml::from_str(yaml)
            .map_err(|e| RiskError::Config(format!("Failed to parse YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RiskConfig = serde_json::from_str(json)
            .map_err(|e| RiskError::Config(format!("Failed to parse JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations no calculation can use
    pub fn validate(&self) -> Result<()> {
        if self.horizon_days < 2 {
            return Err(RiskError::Config(format!(
                "horizon_days must be at least 2, got {}",
                self.horizon_days
            )));
        }
        if self.monte_carlo_simulations < 2 {
            return Err(RiskError::Config(
                "monte_carlo_simulations must be at least 2".to_string(),
            ));
        }
        if !(self.start_price > 0.0) {
            return Err(RiskError::Config("start_price must be positive".to_string()));
        }
        if !(self.ewma_lambda > 0.0 && self.ewma_lambda < 1.0) {
            return Err(RiskError::Config(format!(
                "ewma_lambda must be in (0, 1), got {}",
                self.ewma_lambda
            )));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(RiskError::Config("risk_free_rate must be finite".to_string()));
        }
        Ok(())
    }
}
