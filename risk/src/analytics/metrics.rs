//! Risk-adjusted return, drawdown and exposure metrics
//!
//! Degenerate inputs (zero variance, no downside) resolve to 0 rather than
//! an error. Short or mismatched series are still errors.

use crate::error::{Result, RiskError};
use crate::portfolio::Portfolio;
use crate::returns::TRADING_DAYS;
use crate::stats;
use serde::{Deserialize, Serialize};

fn annualizer() -> f64 {
    (TRADING_DAYS as f64).sqrt()
}

fn excess_returns(returns: &[f64], risk_free_annual: f64) -> Vec<f64> {
    let daily_rf = risk_free_annual / TRADING_DAYS as f64;
    returns.iter().map(|r| r - daily_rf).collect()
}

/// Annualized Sharpe ratio of daily returns
///
/// Formula: mean(r - rf/252) / std(r - rf/252) × √252
pub fn sharpe_ratio(returns: &[f64], risk_free_annual: f64) -> Result<f64> {
    let excess = excess_returns(returns, risk_free_annual);
    let mean = stats::mean(&excess)?;
    let std = stats::std_dev(&excess)?;

    if std == 0.0 {
        return Ok(0.0);
    }
    Ok(mean / std * annualizer())
}

/// Annualized Sortino ratio
///
/// Same numerator as Sharpe. The denominator is the sample standard
/// deviation of the returns strictly below `target`; with fewer than two
/// such returns the ratio is 0.
pub fn sortino_ratio(returns: &[f64], risk_free_annual: f64, target: f64) -> Result<f64> {
    if returns.len() < 2 {
        return Err(RiskError::InsufficientData(format!(
            "Sortino requires at least 2 observations, got {}",
            returns.len()
        )));
    }
    let mean = stats::mean(&excess_returns(returns, risk_free_annual))?;

    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < target).collect();
    if downside.len() < 2 {
        return Ok(0.0);
    }

    let downside_dev = stats::std_dev(&downside)?;
    if downside_dev == 0.0 {
        return Ok(0.0);
    }
    Ok(mean / downside_dev * annualizer())
}

/// cov(asset, market) / var(market), 0 when the market is flat
pub fn beta(asset: &[f64], market: &[f64]) -> Result<f64> {
    let cov = stats::covariance(asset, market)?;
    let market_var = stats::variance(market)?;

    if market_var == 0.0 {
        return Ok(0.0);
    }
    Ok(cov / market_var)
}

/// Largest peak-to-trough decline of a price path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drawdown {
    /// Fractional decline from peak, 0 when prices never fall
    pub value: f64,

    /// Index of the peak preceding the trough
    pub peak_index: usize,

    /// Index of the trough
    pub trough_index: usize,

    /// trough_index - peak_index
    pub duration_days: usize,

    /// Days after the trough until the price regains the peak, `None` if it
    /// never does within the series
    pub recovery_days: Option<usize>,
}

impl Drawdown {
    pub fn is_recovered(&self) -> bool {
        self.recovery_days.is_some()
    }
}

/// Maximum drawdown by a single forward scan
pub fn max_drawdown(prices: &[f64]) -> Result<Drawdown> {
    let first = *prices.first().ok_or_else(|| {
        RiskError::InsufficientData("Max drawdown requires at least 1 price".to_string())
    })?;
    if let Some(bad) = prices.iter().find(|p| !(p.is_finite() && **p > 0.0)) {
        return Err(RiskError::InvalidParameter(format!(
            "Prices must be finite and positive, got {}",
            bad
        )));
    }

    let mut peak = first;
    let mut peak_index = 0;
    let mut worst = Drawdown {
        value: 0.0,
        peak_index: 0,
        trough_index: 0,
        duration_days: 0,
        recovery_days: Some(0),
    };
    let mut worst_peak = first;

    for (i, &price) in prices.iter().enumerate().skip(1) {
        if price > peak {
            peak = price;
            peak_index = i;
        }

        let drawdown = (peak - price) / peak;
        if drawdown > worst.value {
            worst.value = drawdown;
            worst.peak_index = peak_index;
            worst.trough_index = i;
            worst.duration_days = i - peak_index;
            worst_peak = peak;
        }
    }

    if worst.value > 0.0 {
        worst.recovery_days = prices[worst.trough_index + 1..]
            .iter()
            .position(|p| *p >= worst_peak)
            .map(|offset| offset + 1);
    }

    Ok(worst)
}

/// Current-value-weighted sector beta
///
/// Stands in for per-asset betas, which would require market history.
pub fn portfolio_beta(portfolio: &Portfolio) -> Result<f64> {
    let weights = portfolio.weights()?;
    Ok(portfolio
        .holdings()
        .iter()
        .zip(weights)
        .map(|(h, w)| w * h.sector.market_beta())
        .sum())
}

/// Dollar change in current value for a `market_move` market return
pub fn portfolio_delta(portfolio: &Portfolio, market_move: f64) -> Result<f64> {
    Ok(portfolio.current_value() * portfolio_beta(portfolio)? * market_move)
}

/// Weight of the largest single holding
pub fn max_concentration(portfolio: &Portfolio) -> Result<f64> {
    let weights = portfolio.weights()?;
    Ok(weights.into_iter().fold(0.0, f64::max))
}

/// Annualized EWMA volatility forecast
///
/// Uses the last `window` returns; the newest carries weight (1 - λ), each
/// older one a further factor of λ. Returns `default` when fewer than 10
/// observations are available.
pub fn ewma_volatility(returns: &[f64], lambda: f64, window: usize, default: f64) -> f64 {
    if returns.len() < 10 {
        return default;
    }

    let start = returns.len().saturating_sub(window);
    let variance: f64 = returns[start..]
        .iter()
        .rev()
        .enumerate()
        .map(|(age, r)| lambda.powi(age as i32) * (1.0 - lambda) * r * r)
        .sum();

    (variance * TRADING_DAYS as f64).sqrt()
}

/// Annualized sample volatility of daily returns
pub fn annualized_volatility(returns: &[f64]) -> Result<f64> {
    Ok(stats::std_dev(returns)? * annualizer())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::Holding;
    use approx::assert_relative_eq;

    #[test]
    fn test_sharpe_ratio() {
        let returns = vec![0.01, 0.02, -0.01, 0.015, 0.005];
        let excess: Vec<f64> = returns.iter().map(|r| r - 0.02 / 252.0).collect();
        let expected = stats::mean(&excess).unwrap() / stats::std_dev(&excess).unwrap()
            * 252f64.sqrt();

        assert_relative_eq!(sharpe_ratio(&returns, 0.02).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_sharpe_zero_variance_is_zero() {
        assert_eq!(sharpe_ratio(&[0.01; 20], 0.02).unwrap(), 0.0);
    }

    #[test]
    fn test_sortino_ratio() {
        let returns = vec![0.02, -0.01, 0.03, -0.03, 0.01];
        let mean_excess = stats::mean(&returns).unwrap() - 0.02 / 252.0;
        let downside_dev = stats::std_dev(&[-0.01, -0.03]).unwrap();

        assert_relative_eq!(
            sortino_ratio(&returns, 0.02, 0.0).unwrap(),
            mean_excess / downside_dev * 252f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_sortino_without_downside_is_zero() {
        assert_eq!(sortino_ratio(&[0.01, 0.02, 0.03], 0.0, 0.0).unwrap(), 0.0);
        // A single downside observation has no sample deviation
        assert_eq!(sortino_ratio(&[0.01, -0.02, 0.03], 0.0, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_beta() {
        let market = vec![0.01, -0.02, 0.015, 0.005, -0.01];
        let asset: Vec<f64> = market.iter().map(|r| 1.5 * r).collect();
        assert_relative_eq!(beta(&asset, &market).unwrap(), 1.5, epsilon = 1e-12);

        assert_eq!(beta(&asset, &[0.01; 5]).unwrap(), 0.0);
        assert!(beta(&asset, &market[..3]).is_err());
    }

    #[test]
    fn test_max_drawdown_monotonic_is_zero() {
        let dd = max_drawdown(&[100.0, 101.0, 102.5, 110.0]).unwrap();
        assert_eq!(dd.value, 0.0);
        assert_eq!(dd.recovery_days, Some(0));
    }

    #[test]
    fn test_max_drawdown_unrecovered() {
        let dd = max_drawdown(&[100.0, 50.0]).unwrap();
        assert_relative_eq!(dd.value, 0.5);
        assert_eq!(dd.peak_index, 0);
        assert_eq!(dd.trough_index, 1);
        assert_eq!(dd.duration_days, 1);
        assert!(!dd.is_recovered());
    }

    #[test]
    fn test_max_drawdown_recovery_counts_days_after_trough() {
        let prices = [100.0, 120.0, 90.0, 80.0, 100.0, 121.0, 110.0];
        let dd = max_drawdown(&prices).unwrap();

        assert_relative_eq!(dd.value, (120.0 - 80.0) / 120.0);
        assert_eq!(dd.peak_index, 1);
        assert_eq!(dd.trough_index, 3);
        assert_eq!(dd.duration_days, 2);
        // Index 5 regains 120 → two days after the trough
        assert_eq!(dd.recovery_days, Some(2));
    }

    #[test]
    fn test_max_drawdown_input_errors() {
        assert!(max_drawdown(&[]).is_err());
        assert!(max_drawdown(&[100.0, 0.0]).is_err());
        assert!(max_drawdown(&[100.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_portfolio_beta_and_delta() {
        let portfolio = Portfolio::new(
            "Beta",
            vec![
                Holding::new("AAPL", 10.0, 100.0, "Technology"),
                Holding::new("DUK", 10.0, 100.0, "Utilities"),
            ],
        )
        .unwrap();

        // 0.5 × 1.3 + 0.5 × 0.6
        assert_relative_eq!(portfolio_beta(&portfolio).unwrap(), 0.95, epsilon = 1e-12);
        assert_relative_eq!(portfolio_delta(&portfolio, 0.01).unwrap(), 2_000.0 * 0.95 * 0.01, epsilon = 1e-9);
        assert_relative_eq!(max_concentration(&portfolio).unwrap(), 0.5);
    }

    #[test]
    fn test_unknown_sector_beta_is_one() {
        let portfolio =
            Portfolio::new("Other", vec![Holding::new("BTC", 1.0, 100.0, "Crypto")]).unwrap();
        assert_relative_eq!(portfolio_beta(&portfolio).unwrap(), 1.0);
    }

    #[test]
    fn test_ewma_volatility() {
        assert_eq!(ewma_volatility(&[0.01; 9], 0.94, 30, 0.2), 0.2);

        // Constant magnitude: variance = r² × (1 - λ^n)
        let returns = vec![0.02; 40];
        let expected_var = 0.0004 * (1.0 - 0.94f64.powi(30));
        assert_relative_eq!(
            ewma_volatility(&returns, 0.94, 30, 0.2),
            (expected_var * 252.0).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_ewma_weights_recent_returns_most() {
        let mut calm_then_wild = vec![0.001; 20];
        calm_then_wild.extend(vec![0.05; 10]);
        let mut wild_then_calm = vec![0.05; 10];
        wild_then_calm.extend(vec![0.001; 20]);

        assert!(
            ewma_volatility(&calm_then_wild, 0.94, 30, 0.2)
                > ewma_volatility(&wild_then_calm, 0.94, 30, 0.2)
        );
    }
}
