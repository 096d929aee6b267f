//! Scenario descriptors
//!
//! A [`Scenario`] names a shock model. The model itself is a
//! [`ScenarioKind`] variant carrying only the parameters that kind uses;
//! shocks are fractional price changes (-0.30 = 30% drop).

use crate::portfolio::Sector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named stress or analysis scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(flatten)]
    pub kind: ScenarioKind,
}

/// Shock model with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Uniform shock to every holding
    Market { market_shock: f64 },

    /// Shocks to selected sectors
    Sector { sector_shocks: BTreeMap<Sector, f64> },

    /// Random per-holding shock drawn from N(0, volatility_shock)
    Volatility { volatility_shock: f64 },

    /// Rate move applied through sector rate sensitivities
    InterestRate { rate_delta: f64 },

    /// Inflation rate applied through sector inflation sensitivities
    Inflation { inflation_rate: f64 },

    /// Base decline scaled by sector cyclicality
    Recession {
        #[serde(default = "default_recession_severity")]
        severity: f64,
    },

    /// User-defined combination of shocks
    Custom {
        #[serde(default)]
        symbol_shocks: BTreeMap<String, f64>,
        #[serde(default)]
        sector_shocks: BTreeMap<Sector, f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        market_shock: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        volatility_shock: Option<f64>,
    },
}

fn default_recession_severity() -> f64 {
    0.3
}

impl ScenarioKind {
    /// Short kind label
    pub fn label(&self) -> &'static str {
        match self {
            ScenarioKind::Market { .. } => "market",
            ScenarioKind::Sector { .. } => "sector",
            ScenarioKind::Volatility { .. } => "volatility",
            ScenarioKind::InterestRate { .. } => "interest_rate",
            ScenarioKind::Inflation { .. } => "inflation",
            ScenarioKind::Recession { .. } => "recession",
            ScenarioKind::Custom { .. } => "custom",
        }
    }
}

impl Scenario {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: ScenarioKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
        }
    }

    /// Sector-specific shock for `sector`, if the scenario defines one
    pub fn sector_shock(&self, sector: &Sector) -> Option<f64> {
        match &self.kind {
            ScenarioKind::Sector { sector_shocks } | ScenarioKind::Custom { sector_shocks, .. } => {
                sector_shocks.get(sector).copied()
            }
            _ => None,
        }
    }

    /// Symbol-specific shock (custom scenarios only)
    pub fn symbol_shock(&self, symbol: &str) -> Option<f64> {
        match &self.kind {
            ScenarioKind::Custom { symbol_shocks, .. } => symbol_shocks.get(symbol).copied(),
            _ => None,
        }
    }

    /// Market-wide shock
    pub fn market_shock(&self) -> Option<f64> {
        match &self.kind {
            ScenarioKind::Market { market_shock } => Some(*market_shock),
            ScenarioKind::Custom { market_shock, .. } => *market_shock,
            _ => None,
        }
    }

    /// Standard deviation of the random volatility shock
    pub fn volatility_shock(&self) -> Option<f64> {
        match &self.kind {
            ScenarioKind::Volatility { volatility_shock } => Some(*volatility_shock),
            ScenarioKind::Custom {
                volatility_shock, ..
            } => *volatility_shock,
            _ => None,
        }
    }
}

/// The six built-in scenarios, in display order
pub fn predefined_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new(
            "Market Crash (-30%)",
            "Broad market decline of 30%",
            ScenarioKind::Market { market_shock: -0.30 },
        ),
        Scenario::new(
            "Interest Rate Shock (+200bp)",
            "Interest rates rise by 200 basis points",
            ScenarioKind::InterestRate { rate_delta: 0.02 },
        ),
        Scenario::new(
            "Tech Sector Crash (-40%)",
            "Technology sector declines 40%",
            ScenarioKind::Sector {
                sector_shocks: BTreeMap::from([(Sector::Technology, -0.40)]),
            },
        ),
        Scenario::new(
            "Inflation Spike (5%)",
            "Inflation rises to 5%",
            ScenarioKind::Inflation {
                inflation_rate: 0.05,
            },
        ),
        Scenario::new(
            "Recession Scenario",
            "Economic recession with 25% severity",
            ScenarioKind::Recession { severity: 0.25 },
        ),
        Scenario::new(
            "Volatility Spike",
            "Market volatility increases significantly",
            ScenarioKind::Volatility {
                volatility_shock: 0.5,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_scenarios() {
        let scenarios = predefined_scenarios();
        assert_eq!(scenarios.len(), 6);
        assert_eq!(scenarios[0].name, "Market Crash (-30%)");
        assert_eq!(scenarios[0].market_shock(), Some(-0.30));
        assert_eq!(scenarios[2].sector_shock(&Sector::Technology), Some(-0.40));
        assert_eq!(scenarios[2].sector_shock(&Sector::Energy), None);
        assert_eq!(scenarios[5].volatility_shock(), Some(0.5));
        assert_eq!(scenarios[1].market_shock(), None);
    }

    #[test]
    fn test_custom_scenario_from_yaml() {
        let yaml = r#"
name: Oil Shock
description: Crude doubles
type: custom
symbol_shocks:
  XOM: 0.15
sector_shocks:
  Energy: 0.10
  Consumer Discretionary: -0.12
market_shock: -0.05
"#;
        let scenario: Scenario = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(scenario.kind.label(), "custom");
        assert_eq!(scenario.symbol_shock("XOM"), Some(0.15));
        assert_eq!(scenario.sector_shock(&Sector::ConsumerDiscretionary), Some(-0.12));
        assert_eq!(scenario.market_shock(), Some(-0.05));
        assert_eq!(scenario.volatility_shock(), None);
    }

    #[test]
    fn test_recession_severity_default() {
        let scenario: Scenario =
            serde_json::from_str(r#"{"name": "R", "type": "recession"}"#).unwrap();
        assert_eq!(scenario.kind, ScenarioKind::Recession { severity: 0.3 });
    }

    #[test]
    fn test_scenario_json_shape() {
        let json = serde_json::to_value(&predefined_scenarios()[1]).unwrap();
        assert_eq!(json["type"], "interest_rate");
        assert_eq!(json["rate_delta"], 0.02);
    }
}
