//! Advisory rule definitions and configuration
//!
//! Rules are plain data. [`AdvisoryConfig::default`] reproduces the stock
//! thresholds; a YAML or JSON document can replace or tune them.

use crate::error::{Result, RiskError};
use crate::portfolio::Sector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete advisory configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    /// Insight rules, evaluated in order
    #[serde(default)]
    pub rules: Vec<AdvisoryRule>,

    /// Hard-threshold rules that raise alerts
    #[serde(default)]
    pub alerts: Vec<AlertRule>,
}

/// Insight rule types
///
/// All thresholds are fractions (0.05 = 5%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AdvisoryRule {
    /// |var95| above `high` warns; below `low` notes a conservative profile
    VarMagnitude { high: f64, low: f64 },

    /// Sharpe below `low` warns; above `high` reports success
    SharpeRatio { low: f64, high: f64 },

    /// Max drawdown above `max` is an error
    MaxDrawdown { max: f64 },

    /// Largest single holding above `max_weight`
    PositionConcentration { max_weight: f64 },

    /// Any sector above `max_weight`
    SectorConcentration { max_weight: f64 },

    /// Sector weight deviating from target by more than `max_deviation`
    SectorDeviation {
        max_deviation: f64,
        #[serde(default = "ideal_sector_targets")]
        targets: BTreeMap<Sector, f64>,
    },

    /// Aggregate P&L below `loss` or above `gain`
    PnL { loss: f64, gain: f64 },

    /// Holdings drifting from risk-scaled targets by more than `threshold`
    Rebalancing { threshold: f64 },

    /// Sharpe compared with a fixed benchmark Sharpe
    BenchmarkSharpe {
        benchmark: String,
        benchmark_sharpe: f64,
        margin: f64,
    },

    /// EWMA volatility forecast above `max`
    VolatilityForecast { max: f64 },
}

impl AdvisoryRule {
    /// Get a human-readable name for this rule type
    pub fn name(&self) -> &'static str {
        match self {
            AdvisoryRule::VarMagnitude { .. } => "VarMagnitude",
            AdvisoryRule::SharpeRatio { .. } => "SharpeRatio",
            AdvisoryRule::MaxDrawdown { .. } => "MaxDrawdown",
            AdvisoryRule::PositionConcentration { .. } => "PositionConcentration",
            AdvisoryRule::SectorConcentration { .. } => "SectorConcentration",
            AdvisoryRule::SectorDeviation { .. } => "SectorDeviation",
            AdvisoryRule::PnL { .. } => "PnL",
            AdvisoryRule::Rebalancing { .. } => "Rebalancing",
            AdvisoryRule::BenchmarkSharpe { .. } => "BenchmarkSharpe",
            AdvisoryRule::VolatilityForecast { .. } => "VolatilityForecast",
        }
    }
}

/// Alert rule types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AlertRule {
    /// |var95| above `max`
    VarThreshold { max: f64 },

    /// Largest single holding above `max_weight`
    Concentration { max_weight: f64 },

    /// Max drawdown above `max`
    Drawdown { max: f64 },
}

/// Stock sector allocation targets
pub fn ideal_sector_targets() -> BTreeMap<Sector, f64> {
    BTreeMap::from([
        (Sector::Technology, 0.25),
        (Sector::Healthcare, 0.15),
        (Sector::Financials, 0.15),
        (Sector::ConsumerDiscretionary, 0.12),
        (Sector::ConsumerStaples, 0.08),
        (Sector::Industrials, 0.10),
        (Sector::Energy, 0.05),
        (Sector::Materials, 0.05),
        (Sector::Utilities, 0.03),
        (Sector::RealEstate, 0.02),
    ])
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                AdvisoryRule::VarMagnitude {
                    high: 0.05,
                    low: 0.02,
                },
                AdvisoryRule::SharpeRatio {
                    low: 0.5,
                    high: 1.5,
                },
                AdvisoryRule::MaxDrawdown { max: 0.20 },
                AdvisoryRule::PositionConcentration { max_weight: 0.15 },
                AdvisoryRule::SectorConcentration { max_weight: 0.40 },
                AdvisoryRule::PnL {
                    loss: -0.10,
                    gain: 0.20,
                },
                AdvisoryRule::SectorDeviation {
                    max_deviation: 0.10,
                    targets: ideal_sector_targets(),
                },
                AdvisoryRule::Rebalancing { threshold: 0.05 },
                AdvisoryRule::BenchmarkSharpe {
                    benchmark: "S&P 500".to_string(),
                    benchmark_sharpe: 0.8,
                    margin: 0.2,
                },
                AdvisoryRule::VolatilityForecast { max: 0.30 },
            ],
            alerts: vec![
                AlertRule::VarThreshold { max: 0.05 },
                AlertRule::Concentration { max_weight: 0.20 },
                AlertRule::Drawdown { max: 0.15 },
            ],
        }
    }
}

impl AdvisoryConfig {
    /// Load rules from YAML string
    ///
    /// # Example
    ///
    /// ```
    /// use rd_risk::AdvisoryConfig;
    ///
    /// let yaml = r#"
    /// rules:
    ///   - type: MaxDrawdown
    ///     max: 0.25
    /// alerts:
    ///   - type: VarThreshold
    ///     max: 0.04
    /// "#;
    ///
    /// let config = AdvisoryConfig::from_yaml(yaml).unwrap();
    /// assert_eq!(config.rules.len(), 1);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| RiskError::Config(format!("Failed to parse YAML: {}", e)))
    }

    /// Load rules from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| RiskError::Config(format!("Failed to parse JSON: {}", e)))
    }
}
