//! Risk metrics calculator
//!
//! - VaR (parametric, historical, Monte Carlo) and CVaR
//! - Sharpe, Sortino, beta, max drawdown
//! - Correlation matrix
//! - Sector beta, delta, concentration and EWMA volatility
//! - The [`RiskCalculator`] pass that assembles a [`RiskMetrics`] snapshot

pub mod calculator;
pub mod correlation;
pub mod metrics;
pub mod var;

pub use calculator::{RiskCalculator, RiskMetrics, RiskReport};
pub use correlation::CorrelationMatrix;
pub use metrics::{
    annualized_volatility, beta, ewma_volatility, max_concentration, max_drawdown,
    portfolio_beta, portfolio_delta, sharpe_ratio, sortino_ratio, Drawdown,
};
pub use var::{
    conditional_var, monte_carlo_var, parametric_var, value_at_risk, value_at_risk_with,
    VarMethod, DEFAULT_SIMULATIONS,
};
