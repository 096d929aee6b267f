//! Rebalancing heuristic
//!
//! Target weights are equal weights scaled by the inverse of each
//! holding's sector risk multiplier, then normalized. This is a heuristic
//! for flagging drift, not a portfolio optimizer.

use crate::error::Result;
use crate::portfolio::Portfolio;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Difference between a holding's current and target weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightDrift {
    pub symbol: String,
    pub current_weight: f64,
    pub target_weight: f64,
    /// current_weight - target_weight
    pub deviation: f64,
}

impl fmt::Display for WeightDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.deviation > 0.0 { "Reduce" } else { "Increase" };
        write!(
            f,
            "{} {} by {:.1}%",
            verb,
            self.symbol,
            self.deviation.abs() * 100.0
        )
    }
}

/// Risk-scaled equal-weight targets, in holding order
pub fn target_weights(portfolio: &Portfolio) -> Vec<(String, f64)> {
    let n = portfolio.len();
    if n == 0 {
        return Vec::new();
    }

    let base = 1.0 / n as f64;
    let raw: Vec<f64> = portfolio
        .holdings()
        .iter()
        .map(|h| base / h.sector.risk_multiplier())
        .collect();
    let total: f64 = raw.iter().sum();

    portfolio
        .holdings()
        .iter()
        .zip(raw)
        .map(|(h, w)| (h.symbol.clone(), w / total))
        .collect()
}

/// Holdings whose current weight differs from target by more than `threshold`
pub fn weight_drift(portfolio: &Portfolio, threshold: f64) -> Result<Vec<WeightDrift>> {
    let current = portfolio.weights()?;
    let targets = target_weights(portfolio);

    Ok(targets
        .into_iter()
        .zip(current)
        .map(|((symbol, target_weight), current_weight)| WeightDrift {
            symbol,
            current_weight,
            target_weight,
            deviation: current_weight - target_weight,
        })
        .filter(|d| d.deviation.abs() > threshold)
        .collect())
}
