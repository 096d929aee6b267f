//! Daily return series and where they come from
//!
//! The calculator never invents history on its own: callers pick a
//! [`ReturnSource`] up front. [`HistoricalReturns`] serves supplied
//! observations and fails on a missing symbol; [`SyntheticReturns`]
//! regenerates a series from an annual volatility parameter.

use crate::error::{Result, RiskError};
use crate::portfolio::Holding;
use crate::stats::normal_random;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trading days per year
pub const TRADING_DAYS: usize = 252;

/// Annual volatility used for symbols without an explicit entry
pub const DEFAULT_ANNUAL_VOLATILITY: f64 = 0.25;

/// Finite sequence of daily fractional returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    returns: Vec<f64>,
}

impl ReturnSeries {
    pub fn new(returns: Vec<f64>) -> Self {
        Self { returns }
    }

    /// Regenerate a series of `horizon` draws from N(0, annual_vol/√252)
    pub fn synthetic(annual_volatility: f64, horizon: usize, rng: &mut dyn RngCore) -> Self {
        let daily = annual_volatility / (TRADING_DAYS as f64).sqrt();
        let returns = (0..horizon).map(|_| normal_random(&mut *rng, 0.0, daily)).collect();
        Self { returns }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.returns
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Last `horizon` observations (or all of them if fewer exist)
    pub fn tail(&self, horizon: usize) -> Self {
        let start = self.returns.len().saturating_sub(horizon);
        Self::new(self.returns[start..].to_vec())
    }

    /// Compound the series into a price path that starts at `start`
    ///
    /// The path has one more point than the series.
    pub fn price_path(&self, start: f64) -> Vec<f64> {
        let mut path = Vec::with_capacity(self.returns.len() + 1);
        let mut price = start;
        path.push(price);
        for r in &self.returns {
            price *= 1.0 + r;
            path.push(price);
        }
        path
    }

    /// Weighted sum of aligned asset series
    ///
    /// All series must share one length; `weights` pairs with `series` by
    /// position.
    pub fn weighted(series: &[ReturnSeries], weights: &[f64]) -> Result<Self> {
        if series.len() != weights.len() {
            return Err(RiskError::LengthMismatch {
                left: series.len(),
                right: weights.len(),
            });
        }
        let first = series.first().ok_or_else(|| {
            RiskError::InsufficientData("No asset return series provided".to_string())
        })?;

        let len = first.len();
        if let Some(bad) = series.iter().find(|s| s.len() != len) {
            return Err(RiskError::LengthMismatch {
                left: len,
                right: bad.len(),
            });
        }

        let returns = (0..len)
            .map(|t| {
                series
                    .iter()
                    .zip(weights)
                    .map(|(s, w)| w * s.returns[t])
                    .sum()
            })
            .collect();

        Ok(Self { returns })
    }
}

impl From<Vec<f64>> for ReturnSeries {
    fn from(returns: Vec<f64>) -> Self {
        Self::new(returns)
    }
}

/// Provider of per-holding daily return series
///
/// Implementations are handed to the risk calculator; they must be
/// shareable across worker threads.
pub trait ReturnSource: Send + Sync {
    /// Return series of exactly `horizon` observations for a holding
    fn returns_for(
        &self,
        holding: &Holding,
        horizon: usize,
        rng: &mut dyn RngCore,
    ) -> Result<ReturnSeries>;
}

/// Volatility-parameterized generator
///
/// Each call draws a fresh series, so repeated passes differ unless the
/// generator is seeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticReturns {
    /// Annual volatility by symbol
    #[serde(default)]
    pub volatilities: HashMap<String, f64>,

    /// Annual volatility for symbols not listed
    #[serde(default = "default_volatility")]
    pub default_volatility: f64,
}

fn default_volatility() -> f64 {
    DEFAULT_ANNUAL_VOLATILITY
}

impl Default for SyntheticReturns {
    fn default() -> Self {
        let volatilities = [
            ("AAPL", 0.25),
            ("GOOGL", 0.28),
            ("MSFT", 0.22),
            ("AMZN", 0.32),
            ("TSLA", 0.45),
            ("JPM", 0.28),
            ("JNJ", 0.18),
            ("PG", 0.16),
        ]
        .into_iter()
        .map(|(symbol, vol)| (symbol.to_string(), vol))
        .collect();

        Self {
            volatilities,
            default_volatility: DEFAULT_ANNUAL_VOLATILITY,
        }
    }
}

impl SyntheticReturns {
    /// Annual volatility assumed for a symbol
    pub fn volatility(&self, symbol: &str) -> f64 {
        self.volatilities
            .get(symbol)
            .copied()
            .unwrap_or(self.default_volatility)
    }
}

impl ReturnSource for SyntheticReturns {
    fn returns_for(
        &self,
        holding: &Holding,
        horizon: usize,
        rng: &mut dyn RngCore,
    ) -> Result<ReturnSeries> {
        let vol = self.volatility(&holding.symbol);
        if !vol.is_finite() || vol < 0.0 {
            return Err(RiskError::InvalidParameter(format!(
                "Volatility for {} must be finite and non-negative, got {}",
                holding.symbol, vol
            )));
        }
        Ok(ReturnSeries::synthetic(vol, horizon, rng))
    }
}

/// Caller-supplied return history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalReturns {
    series: HashMap<String, ReturnSeries>,
}

impl HistoricalReturns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the history for a symbol
    pub fn insert(&mut self, symbol: impl Into<String>, returns: impl Into<ReturnSeries>) {
        self.series.insert(symbol.into(), returns.into());
    }

    pub fn with(mut self, symbol: impl Into<String>, returns: impl Into<ReturnSeries>) -> Self {
        self.insert(symbol, returns);
        self
    }
}

impl ReturnSource for HistoricalReturns {
    fn returns_for(
        &self,
        holding: &Holding,
        horizon: usize,
        _rng: &mut dyn RngCore,
    ) -> Result<ReturnSeries> {
        let series = self
            .series
            .get(&holding.symbol)
            .ok_or_else(|| RiskError::MissingHistory(holding.symbol.clone()))?;

        if series.len() < horizon {
            return Err(RiskError::InsufficientData(format!(
                "{} has {} observations, horizon is {}",
                holding.symbol,
                series.len(),
                horizon
            )));
        }

        Ok(series.tail(horizon))
    }
}
