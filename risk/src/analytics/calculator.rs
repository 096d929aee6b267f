//! Full risk calculation pass
//!
//! [`RiskCalculator::calculate`] turns a valued portfolio plus a return
//! source into one immutable [`RiskMetrics`] snapshot and the matching
//! [`CorrelationMatrix`]. Nothing is returned unless every step succeeds.

use super::correlation::CorrelationMatrix;
use super::metrics::{self, Drawdown};
use super::var;
use crate::config::RiskConfig;
use crate::error::{Result, RiskError};
use crate::portfolio::{Portfolio, Sector};
use crate::returns::{ReturnSeries, ReturnSource};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Risk metrics snapshot for one portfolio valuation
///
/// VaR and CVaR are signed daily returns (negative means loss). Weights and
/// percentages are fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub total_value: f64,
    pub current_value: f64,
    pub total_pnl: f64,
    pub total_pnl_percent: f64,
    pub var95: f64,
    pub var99: f64,
    pub cvar95: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub beta: f64,
    pub delta: f64,
    pub max_drawdown: Drawdown,
    pub max_concentration: f64,
    /// Annualized sample volatility of the portfolio return series
    pub volatility: f64,
    /// Annualized EWMA forecast
    pub forecast_volatility: f64,
    pub sector_allocation: BTreeMap<Sector, f64>,
    pub holding_count: usize,
    pub computed_at: DateTime<Utc>,
}

/// Output of a calculation pass
#[derive(Debug, Clone)]
pub struct RiskReport {
    pub metrics: RiskMetrics,
    pub correlation: CorrelationMatrix,
    /// Current-value-weighted daily portfolio returns the metrics came from
    pub portfolio_returns: ReturnSeries,
}

/// Stateless risk calculator
#[derive(Debug, Clone, Default)]
pub struct RiskCalculator {
    config: RiskConfig,
}

impl RiskCalculator {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Run a full pass over a portfolio already repriced at live prices
    pub fn calculate(
        &self,
        portfolio: &Portfolio,
        source: &dyn ReturnSource,
        rng: &mut dyn RngCore,
    ) -> Result<RiskReport> {
        if portfolio.is_empty() {
            return Err(RiskError::EmptyPortfolio);
        }
        let weights = portfolio.weights()?;
        let horizon = self.config.horizon_days;

        let series = portfolio
            .holdings()
            .iter()
            .map(|holding| {
                let s = source.returns_for(holding, horizon, &mut *rng)?;
                if s.len() != horizon {
                    return Err(RiskError::LengthMismatch {
                        left: s.len(),
                        right: horizon,
                    });
                }
                Ok(s)
            })
            .collect::<Result<Vec<_>>>()?;

        let portfolio_returns = ReturnSeries::weighted(&series, &weights)?;
        let returns = portfolio_returns.as_slice();
        debug!(
            holdings = portfolio.len(),
            observations = returns.len(),
            "Built portfolio return series"
        );

        let method = self.config.var_method;
        let simulations = self.config.monte_carlo_simulations;
        let var95 = var::value_at_risk_with(returns, 0.05, method, simulations, &mut *rng)?;
        let var99 = var::value_at_risk_with(returns, 0.01, method, simulations, &mut *rng)?;
        let cvar95 = var::conditional_var(returns, 0.05)?;

        let rf = self.config.risk_free_rate;
        let sharpe_ratio = metrics::sharpe_ratio(returns, rf)?;
        let sortino_ratio = metrics::sortino_ratio(returns, rf, 0.0)?;

        let prices = portfolio_returns.price_path(self.config.start_price);
        let max_drawdown = metrics::max_drawdown(&prices)?;

        let forecast_volatility = metrics::ewma_volatility(
            returns,
            self.config.ewma_lambda,
            self.config.ewma_window,
            self.config.default_volatility,
        );

        let symbols = portfolio
            .holdings()
            .iter()
            .map(|h| h.symbol.clone())
            .collect();
        let correlation = CorrelationMatrix::compute(symbols, &series)?;

        let metrics = RiskMetrics {
            total_value: portfolio.total_value(),
            current_value: portfolio.current_value(),
            total_pnl: portfolio.total_pnl(),
            total_pnl_percent: portfolio.total_pnl_percent(),
            var95,
            var99,
            cvar95,
            sharpe_ratio,
            sortino_ratio,
            beta: metrics::portfolio_beta(portfolio)?,
            delta: metrics::portfolio_delta(portfolio, self.config.delta_market_move)?,
            max_drawdown,
            max_concentration: metrics::max_concentration(portfolio)?,
            volatility: metrics::annualized_volatility(returns)?,
            forecast_volatility,
            sector_allocation: portfolio.sector_allocation()?,
            holding_count: portfolio.len(),
            computed_at: Utc::now(),
        };

        debug!(
            var95 = metrics.var95,
            var99 = metrics.var99,
            sharpe = metrics.sharpe_ratio,
            max_drawdown = metrics.max_drawdown.value,
            "Risk metrics calculated"
        );

        Ok(RiskReport {
            metrics,
            correlation,
            portfolio_returns,
        })
    }
}
