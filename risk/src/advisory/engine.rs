//! Advisory rule evaluation
//!
//! Every rule is evaluated independently against one metrics snapshot and
//! may emit zero or more insights. Metrics that resolved to exactly 0 (the
//! degenerate-case fallback) carry no signal and are skipped by the VaR,
//! Sharpe, P&L and benchmark rules.

use super::insight::{Alert, Insight, InsightBundle, InsightCategory, Priority, Severity};
use super::rebalance::{target_weights, weight_drift};
use super::rules::{AdvisoryConfig, AdvisoryRule, AlertRule};
use crate::analytics::RiskMetrics;
use crate::error::Result;
use crate::portfolio::{Portfolio, Sector};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Rule engine over risk metrics
#[derive(Debug, Clone, Default)]
pub struct AdvisoryEngine {
    config: AdvisoryConfig,
}

impl AdvisoryEngine {
    pub fn new(config: AdvisoryConfig) -> Self {
        Self { config }
    }

    /// Load rules from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(Self::new(AdvisoryConfig::from_yaml(yaml)?))
    }

    /// Load rules from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(AdvisoryConfig::from_json(json)?))
    }

    pub fn config(&self) -> &AdvisoryConfig {
        &self.config
    }

    /// Evaluate all insight and alert rules
    pub fn generate_insights(&self, portfolio: &Portfolio, metrics: &RiskMetrics) -> InsightBundle {
        let mut bundle = InsightBundle::default();
        for rule in &self.config.rules {
            for insight in self.evaluate(rule, portfolio, metrics) {
                bundle.push(insight);
            }
        }
        bundle.alerts = self.generate_alerts(metrics);

        debug!(
            insights = bundle.len(),
            alerts = bundle.alerts.len(),
            "Advisory rules evaluated"
        );
        bundle
    }

    /// Evaluate the alert rules only
    pub fn generate_alerts(&self, metrics: &RiskMetrics) -> Vec<Alert> {
        self.config
            .alerts
            .iter()
            .filter_map(|rule| check_alert(rule, metrics))
            .map(Alert::new)
            .collect()
    }

    /// Evaluate a single insight rule
    pub fn evaluate(
        &self,
        rule: &AdvisoryRule,
        portfolio: &Portfolio,
        metrics: &RiskMetrics,
    ) -> Vec<Insight> {
        match rule {
            AdvisoryRule::VarMagnitude { high, low } => var_magnitude(metrics, *high, *low),
            AdvisoryRule::SharpeRatio { low, high } => sharpe(metrics, *low, *high),
            AdvisoryRule::MaxDrawdown { max } => drawdown(metrics, *max),
            AdvisoryRule::PositionConcentration { max_weight } => {
                position_concentration(portfolio, metrics, *max_weight)
            }
            AdvisoryRule::SectorConcentration { max_weight } => {
                sector_concentration(metrics, *max_weight)
            }
            AdvisoryRule::SectorDeviation {
                max_deviation,
                targets,
            } => sector_deviation(metrics, targets, *max_deviation),
            AdvisoryRule::PnL { loss, gain } => pnl(metrics, *loss, *gain),
            AdvisoryRule::Rebalancing { threshold } => rebalancing(portfolio, *threshold),
            AdvisoryRule::BenchmarkSharpe {
                benchmark,
                benchmark_sharpe,
                margin,
            } => benchmark_gap(metrics, benchmark, *benchmark_sharpe, *margin),
            AdvisoryRule::VolatilityForecast { max } => forecast(metrics, *max),
        }
    }
}

fn var_magnitude(metrics: &RiskMetrics, high: f64, low: f64) -> Vec<Insight> {
    if metrics.var95 == 0.0 {
        return Vec::new();
    }
    let var = metrics.var95.abs();
    let pct = var * 100.0;

    if var > high {
        vec![Insight::new(
            Severity::Warning,
            InsightCategory::Risk,
            Priority::High,
            "High Value at Risk",
            format!(
                "Your portfolio has a 95% VaR of {:.2}%, indicating high potential losses. Consider reducing position sizes or adding defensive assets.",
                pct
            ),
        )
        .with_suggestions([
            "Reduce position sizes",
            "Add defensive assets",
            "Increase cash allocation",
        ])]
    } else if var < low {
        vec![Insight::new(
            Severity::Info,
            InsightCategory::Risk,
            Priority::Medium,
            "Conservative Risk Profile",
            format!(
                "Your portfolio has a low VaR of {:.2}%, suggesting conservative positioning. Consider if this aligns with your return objectives.",
                pct
            ),
        )
        .with_suggestions([
            "Consider higher-return assets",
            "Evaluate risk tolerance",
            "Review return targets",
        ])]
    } else {
        Vec::new()
    }
}

fn sharpe(metrics: &RiskMetrics, low: f64, high: f64) -> Vec<Insight> {
    let sharpe = metrics.sharpe_ratio;
    if sharpe == 0.0 {
        return Vec::new();
    }

    if sharpe < low {
        vec![Insight::new(
            Severity::Warning,
            InsightCategory::Performance,
            Priority::High,
            "Low Risk-Adjusted Returns",
            format!(
                "Your Sharpe ratio of {:.2} indicates poor risk-adjusted performance. Consider optimizing your asset allocation.",
                sharpe
            ),
        )
        .with_suggestions([
            "Optimize asset allocation",
            "Reduce low-performing assets",
            "Consider index funds",
        ])]
    } else if sharpe > high {
        vec![Insight::new(
            Severity::Success,
            InsightCategory::Performance,
            Priority::Low,
            "Excellent Risk-Adjusted Returns",
            format!(
                "Your Sharpe ratio of {:.2} indicates excellent risk-adjusted performance.",
                sharpe
            ),
        )]
    } else {
        Vec::new()
    }
}

fn drawdown(metrics: &RiskMetrics, max: f64) -> Vec<Insight> {
    let value = metrics.max_drawdown.value;
    if value <= max {
        return Vec::new();
    }

    vec![Insight::new(
        Severity::Error,
        InsightCategory::Risk,
        Priority::High,
        "High Maximum Drawdown",
        format!(
            "Your portfolio experienced a maximum drawdown of {:.2}%. This indicates high volatility and potential for large losses.",
            value * 100.0
        ),
    )
    .with_suggestions([
        "Implement stop-loss strategies",
        "Diversify across asset classes",
        "Consider volatility targeting",
    ])]
}

fn position_concentration(portfolio: &Portfolio, metrics: &RiskMetrics, max_weight: f64) -> Vec<Insight> {
    if metrics.max_concentration <= max_weight {
        return Vec::new();
    }
    let Some(largest) = portfolio.largest_holding() else {
        return Vec::new();
    };

    vec![Insight::new(
        Severity::Warning,
        InsightCategory::Concentration,
        Priority::High,
        "High Single Position Concentration",
        format!(
            "{} represents {:.1}% of your portfolio. Consider reducing this position to limit concentration risk.",
            largest.symbol,
            metrics.max_concentration * 100.0
        ),
    )
    .with_suggestions([
        format!("Reduce {} position", largest.symbol),
        "Diversify into other assets".to_string(),
        "Set position size limits".to_string(),
    ])]
}

fn sector_concentration(metrics: &RiskMetrics, max_weight: f64) -> Vec<Insight> {
    metrics
        .sector_allocation
        .iter()
        .filter(|(_, weight)| **weight > max_weight)
        .map(|(sector, weight)| {
            Insight::new(
                Severity::Warning,
                InsightCategory::Concentration,
                Priority::Medium,
                format!("High {} Sector Concentration", sector),
                format!(
                    "Your {} allocation of {:.1}% is quite high. Consider diversifying across other sectors.",
                    sector,
                    weight * 100.0
                ),
            )
            .with_suggestions([
                format!("Reduce {} exposure", sector),
                "Add positions in other sectors".to_string(),
                "Consider sector ETFs for diversification".to_string(),
            ])
        })
        .collect()
}

fn sector_deviation(
    metrics: &RiskMetrics,
    targets: &BTreeMap<Sector, f64>,
    max_deviation: f64,
) -> Vec<Insight> {
    targets
        .iter()
        .filter_map(|(sector, target)| {
            let current = metrics.sector_allocation.get(sector).copied().unwrap_or(0.0);
            if (current - target).abs() <= max_deviation {
                return None;
            }

            let over = current > *target;
            let (severity, direction, suggestions) = if over {
                (
                    Severity::Warning,
                    "Overweight",
                    [
                        format!("Reduce {} positions", sector),
                        format!("Consider taking profits in {}", sector),
                    ],
                )
            } else {
                (
                    Severity::Info,
                    "Underweight",
                    [
                        format!("Increase {} exposure", sector),
                        format!("Consider {} ETFs or individual stocks", sector),
                    ],
                )
            };

            Some(
                Insight::new(
                    severity,
                    InsightCategory::Allocation,
                    Priority::Medium,
                    format!("{} Sector {}", sector, direction),
                    format!(
                        "Your {} allocation of {:.1}% deviates significantly from the target {:.1}%.",
                        sector,
                        current * 100.0,
                        target * 100.0
                    ),
                )
                .with_suggestions(suggestions),
            )
        })
        .collect()
}

fn pnl(metrics: &RiskMetrics, loss: f64, gain: f64) -> Vec<Insight> {
    let pnl = metrics.total_pnl_percent;
    if pnl == 0.0 {
        return Vec::new();
    }

    if pnl < loss {
        vec![Insight::new(
            Severity::Error,
            InsightCategory::Performance,
            Priority::High,
            "Significant Portfolio Losses",
            format!(
                "Your portfolio is down {:.2}%. Consider reviewing your investment strategy and risk management approach.",
                pnl.abs() * 100.0
            ),
        )
        .with_suggestions([
            "Review investment thesis",
            "Consider stop-loss rules",
            "Reassess risk tolerance",
        ])]
    } else if pnl > gain {
        vec![Insight::new(
            Severity::Success,
            InsightCategory::Performance,
            Priority::Medium,
            "Strong Portfolio Performance",
            format!(
                "Your portfolio is up {:.2}%. Consider taking some profits or rebalancing to maintain your target allocation.",
                pnl * 100.0
            ),
        )
        .with_suggestions([
            "Consider profit-taking",
            "Rebalance to target weights",
            "Review position sizes",
        ])]
    } else {
        Vec::new()
    }
}

fn rebalancing(portfolio: &Portfolio, threshold: f64) -> Vec<Insight> {
    let drift = match weight_drift(portfolio, threshold) {
        Ok(drift) => drift,
        Err(e) => {
            warn!(error = %e, "Skipping rebalancing rule");
            return Vec::new();
        }
    };
    if drift.is_empty() {
        return Vec::new();
    }

    let targets: BTreeMap<String, f64> = target_weights(portfolio).into_iter().collect();
    vec![Insight::new(
        Severity::Info,
        InsightCategory::Rebalancing,
        Priority::Medium,
        "Rebalancing Recommended",
        "Your portfolio has drifted from its risk-scaled target weights. These targets are a sector-risk heuristic, not an optimized allocation.",
    )
    .with_suggestions(drift.iter().map(ToString::to_string))
    .with_details(targets)]
}

fn benchmark_gap(metrics: &RiskMetrics, benchmark: &str, benchmark_sharpe: f64, margin: f64) -> Vec<Insight> {
    let sharpe = metrics.sharpe_ratio;
    if sharpe == 0.0 {
        return Vec::new();
    }
    let gap = sharpe - benchmark_sharpe;

    if gap < -margin {
        vec![Insight::new(
            Severity::Warning,
            InsightCategory::Benchmark,
            Priority::High,
            format!("Underperforming {}", benchmark),
            format!(
                "Your Sharpe ratio of {:.2} is significantly below the {}'s {}. Consider index fund allocation.",
                sharpe, benchmark, benchmark_sharpe
            ),
        )
        .with_suggestions([
            format!("Consider {} index funds", benchmark),
            "Review stock selection process".to_string(),
            "Evaluate active vs passive strategy".to_string(),
        ])]
    } else if gap > margin {
        vec![Insight::new(
            Severity::Success,
            InsightCategory::Benchmark,
            Priority::Low,
            format!("Outperforming {}", benchmark),
            format!(
                "Your Sharpe ratio of {:.2} exceeds the {}'s {}.",
                sharpe, benchmark, benchmark_sharpe
            ),
        )]
    } else {
        Vec::new()
    }
}

fn forecast(metrics: &RiskMetrics, max: f64) -> Vec<Insight> {
    let vol = metrics.forecast_volatility;
    if vol <= max {
        return Vec::new();
    }

    vec![Insight::new(
        Severity::Warning,
        InsightCategory::Forecast,
        Priority::Medium,
        "High Volatility Forecast",
        format!(
            "Forecasted volatility of {:.1}% suggests increased risk ahead. Consider defensive positioning.",
            vol * 100.0
        ),
    )
    .with_suggestions([
        "Increase cash allocation",
        "Add defensive assets",
        "Consider volatility hedging",
    ])]
}

fn check_alert(rule: &AlertRule, metrics: &RiskMetrics) -> Option<Insight> {
    match rule {
        AlertRule::VarThreshold { max } if metrics.var95.abs() > *max => Some(Insight::new(
            Severity::Error,
            InsightCategory::Alert,
            Priority::High,
            "VaR Threshold Exceeded",
            format!("Portfolio VaR exceeds {:.0}% threshold", max * 100.0),
        )),
        AlertRule::Concentration { max_weight } if metrics.max_concentration > *max_weight => {
            Some(Insight::new(
                Severity::Warning,
                InsightCategory::Alert,
                Priority::Medium,
                "Concentration Risk Alert",
                format!("Single position exceeds {:.0}% of portfolio", max_weight * 100.0),
            ))
        }
        AlertRule::Drawdown { max } if metrics.max_drawdown.value > *max => Some(Insight::new(
            Severity::Error,
            InsightCategory::Alert,
            Priority::High,
            "High Drawdown Alert",
            format!("Portfolio drawdown exceeds {:.0}%", max * 100.0),
        )),
        _ => None,
    }
}
