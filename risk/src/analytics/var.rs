//! Value at Risk and Conditional VaR
//!
//! All estimators return a signed daily return (normally negative). The
//! `confidence` argument is the left-tail probability, so 0.05 yields the
//! 95% VaR. Callers take the absolute value for display.

use crate::error::{Result, RiskError};
use crate::stats::{self, normal_random};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default number of Monte Carlo draws
pub const DEFAULT_SIMULATIONS: usize = 10_000;

/// VaR estimation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarMethod {
    Parametric,
    Historical,
    MonteCarlo,
}

fn validate(returns: &[f64], confidence: f64) -> Result<()> {
    if returns.len() < 2 {
        return Err(RiskError::InsufficientData(format!(
            "VaR requires at least 2 observations, got {}",
            returns.len()
        )));
    }
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(RiskError::InvalidProbability(confidence));
    }
    Ok(())
}

/// Sorted copy of a return series
fn sorted(returns: &[f64]) -> Vec<f64> {
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Empirical quantile at index ⌊confidence·n⌋, no interpolation
fn historical_quantile(sorted: &[f64], confidence: f64) -> f64 {
    let index = ((confidence * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}

/// VaR with the default Monte Carlo sample size
pub fn value_at_risk<R: Rng + ?Sized>(
    returns: &[f64],
    confidence: f64,
    method: VarMethod,
    rng: &mut R,
) -> Result<f64> {
    value_at_risk_with(returns, confidence, method, DEFAULT_SIMULATIONS, rng)
}

/// VaR with an explicit Monte Carlo sample size
///
/// `rng` is only drawn from by [`VarMethod::MonteCarlo`].
pub fn value_at_risk_with<R: Rng + ?Sized>(
    returns: &[f64],
    confidence: f64,
    method: VarMethod,
    simulations: usize,
    rng: &mut R,
) -> Result<f64> {
    validate(returns, confidence)?;

    match method {
        VarMethod::Parametric => parametric_var(returns, confidence),
        VarMethod::Historical => Ok(historical_quantile(&sorted(returns), confidence)),
        VarMethod::MonteCarlo => monte_carlo_var(returns, confidence, simulations, rng),
    }
}

/// mean + Φ⁻¹(confidence)·std
pub fn parametric_var(returns: &[f64], confidence: f64) -> Result<f64> {
    validate(returns, confidence)?;
    let mean = stats::mean(returns)?;
    let std = stats::std_dev(returns)?;
    Ok(mean + stats::inverse_normal_cdf(confidence)? * std)
}

/// Historical estimator applied to `simulations` draws from N(mean, std)
pub fn monte_carlo_var<R: Rng + ?Sized>(
    returns: &[f64],
    confidence: f64,
    simulations: usize,
    rng: &mut R,
) -> Result<f64> {
    validate(returns, confidence)?;
    if simulations < 2 {
        return Err(RiskError::InvalidParameter(format!(
            "Monte Carlo VaR needs at least 2 simulations, got {}",
            simulations
        )));
    }

    let mean = stats::mean(returns)?;
    let std = stats::std_dev(returns)?;
    let simulated: Vec<f64> = (0..simulations)
        .map(|_| normal_random(&mut *rng, mean, std))
        .collect();

    Ok(historical_quantile(&sorted(&simulated), confidence))
}

/// Expected shortfall: mean of all returns at or below the historical VaR
pub fn conditional_var(returns: &[f64], confidence: f64) -> Result<f64> {
    validate(returns, confidence)?;

    let sorted = sorted(returns);
    let threshold = historical_quantile(&sorted, confidence);
    let tail: Vec<f64> = sorted.into_iter().take_while(|r| *r <= threshold).collect();

    // The threshold is an element of the series, so the tail is never empty
    stats::mean(&tail)
}
