//! Stress testing and scenario analysis
//!
//! Two entry points over the same result type:
//! - [`StressTestEngine::stress_test`]: generic shock pipeline (sector →
//!   market → optional random volatility), one scenario at a time
//! - [`StressTestEngine::scenario_analysis`]: per-kind sector sensitivity
//!   models, always deterministic
//!
//! Neither mutates the input portfolio.

use super::scenario::{predefined_scenarios, Scenario, ScenarioKind};
use crate::error::{Result, RiskError};
use crate::portfolio::{Holding, Portfolio, Sector};
use crate::stats::normal_random;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Effect of a scenario on one holding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingImpact {
    pub symbol: String,
    pub sector: Sector,
    pub original_price: f64,
    pub shocked_price: f64,
    pub original_value: f64,
    pub shocked_value: f64,
    /// shocked_value - original_value
    pub impact: f64,
}

/// Effect of a scenario on the whole portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockResult {
    pub scenario_name: String,

    /// Current value before the shock
    pub original_value: f64,

    pub stressed_value: f64,

    /// original_value - stressed_value (negative for a gain)
    pub loss: f64,

    /// loss / original_value, 0 when the portfolio has no value
    pub loss_percent: f64,

    pub holdings: Vec<HoldingImpact>,

    pub computed_at: DateTime<Utc>,
}

impl ShockResult {
    fn from_impacts(scenario_name: &str, holdings: Vec<HoldingImpact>) -> Self {
        let original_value: f64 = holdings.iter().map(|h| h.original_value).sum();
        let stressed_value: f64 = holdings.iter().map(|h| h.shocked_value).sum();
        let loss = original_value - stressed_value;
        let loss_percent = if original_value > 0.0 {
            loss / original_value
        } else {
            0.0
        };

        Self {
            scenario_name: scenario_name.to_string(),
            original_value,
            stressed_value,
            loss,
            loss_percent,
            holdings,
            computed_at: Utc::now(),
        }
    }

    /// Holding with the most negative impact
    pub fn worst_holding(&self) -> Option<&HoldingImpact> {
        self.holdings
            .iter()
            .min_by(|a, b| a.impact.total_cmp(&b.impact))
    }
}

/// Summary across a set of scenario results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestReport {
    /// Scenario with the largest loss
    pub worst_scenario: String,

    pub max_loss: f64,

    pub max_loss_percent: f64,

    /// Scenario with the smallest loss (or largest gain)
    pub best_scenario: String,

    pub min_loss: f64,

    pub average_loss: f64,

    pub scenario_count: usize,

    pub timestamp: DateTime<Utc>,
}

fn impact(holding: &Holding, shocked_price: f64) -> HoldingImpact {
    let original_value = holding.current_value();
    let shocked_value = holding.quantity * shocked_price;
    HoldingImpact {
        symbol: holding.symbol.clone(),
        sector: holding.sector.clone(),
        original_price: holding.current_price,
        shocked_price,
        original_value,
        shocked_value,
        impact: shocked_value - original_value,
    }
}

/// Price sensitivity to a rate move, by sector
fn rate_sensitivity(sector: &Sector) -> f64 {
    match sector {
        Sector::Financials => 0.5,
        Sector::RealEstate => -1.2,
        Sector::Utilities => -0.8,
        Sector::Technology => -0.6,
        _ => -0.3,
    }
}

/// Price sensitivity to inflation, by sector
fn inflation_sensitivity(sector: &Sector) -> f64 {
    match sector {
        Sector::Energy => 0.8,
        Sector::Materials => 0.6,
        Sector::ConsumerStaples => 0.3,
        Sector::Technology => -0.4,
        _ => -0.2,
    }
}

/// Multiplier on the base recession decline, by sector
fn recession_multiplier(sector: &Sector) -> f64 {
    match sector {
        Sector::ConsumerDiscretionary => 1.5,
        Sector::Financials => 1.3,
        Sector::Technology => 1.2,
        Sector::ConsumerStaples => 0.6,
        Sector::Healthcare => 0.7,
        Sector::Utilities => 0.5,
        _ => 1.0,
    }
}

/// Stress testing engine
///
/// Usable on its own, without a session: load a scenario list with
/// [`new`](Self::new) or [`add_scenario`](Self::add_scenario) and run it with
/// [`run_all`](Self::run_all). A session builds one per run from its scenario
/// library. The individual operations accept any scenario.
#[derive(Debug, Clone)]
pub struct StressTestEngine {
    scenarios: Vec<Scenario>,
}

impl Default for StressTestEngine {
    fn default() -> Self {
        Self::with_predefined_scenarios()
    }
}

impl StressTestEngine {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    /// Engine loaded with the six built-in scenarios
    pub fn with_predefined_scenarios() -> Self {
        Self::new(predefined_scenarios())
    }

    /// Apply one scenario through the generic shock pipeline
    ///
    /// Per holding: sector shock, then market shock, then (when the scenario
    /// has a non-zero volatility term) an independent draw from
    /// N(0, volatility_shock). Kinds without any of these terms leave prices
    /// unchanged here; use [`scenario_analysis`](Self::scenario_analysis)
    /// for their sensitivity models.
    pub fn stress_scenario<R: Rng + ?Sized>(
        &self,
        portfolio: &Portfolio,
        scenario: &Scenario,
        rng: &mut R,
    ) -> ShockResult {
        let market_shock = scenario.market_shock();
        let volatility = scenario.volatility_shock().filter(|v| *v != 0.0);

        let impacts = portfolio
            .holdings()
            .iter()
            .map(|holding| {
                let mut price = holding.current_price;
                if let Some(shock) = scenario.sector_shock(&holding.sector) {
                    price *= 1.0 + shock;
                }
                if let Some(shock) = market_shock {
                    price *= 1.0 + shock;
                }
                if let Some(std) = volatility {
                    price *= 1.0 + normal_random(&mut *rng, 0.0, std);
                }
                impact(holding, price)
            })
            .collect();

        let result = ShockResult::from_impacts(&scenario.name, impacts);
        debug!(
            scenario = %scenario.name,
            loss = result.loss,
            loss_percent = result.loss_percent,
            "Stress scenario applied"
        );
        result
    }

    /// Run every scenario independently, keyed by scenario name
    ///
    /// A later scenario with a duplicate name replaces the earlier result.
    pub fn stress_test<R: Rng + ?Sized>(
        &self,
        portfolio: &Portfolio,
        scenarios: &[Scenario],
        rng: &mut R,
    ) -> IndexMap<String, ShockResult> {
        let mut results = IndexMap::with_capacity(scenarios.len());
        for scenario in scenarios {
            let result = self.stress_scenario(portfolio, scenario, &mut *rng);
            results.insert(scenario.name.clone(), result);
        }
        results
    }

    /// Stress test against the engine's own scenario list
    pub fn run_all<R: Rng + ?Sized>(
        &self,
        portfolio: &Portfolio,
        rng: &mut R,
    ) -> IndexMap<String, ShockResult> {
        self.stress_test(portfolio, &self.scenarios, rng)
    }

    /// Deterministic analysis of one scenario using its kind's model
    pub fn scenario_analysis(&self, portfolio: &Portfolio, scenario: &Scenario) -> ShockResult {
        let impacts = portfolio
            .holdings()
            .iter()
            .map(|holding| {
                let price = holding.current_price;
                let shocked = match &scenario.kind {
                    ScenarioKind::InterestRate { rate_delta } => {
                        price * (1.0 + rate_delta * rate_sensitivity(&holding.sector))
                    }
                    ScenarioKind::Inflation { inflation_rate } => {
                        price * (1.0 + inflation_rate * inflation_sensitivity(&holding.sector))
                    }
                    ScenarioKind::Recession { severity } => {
                        price * (1.0 - severity * recession_multiplier(&holding.sector))
                    }
                    ScenarioKind::Market { .. }
                    | ScenarioKind::Sector { .. }
                    | ScenarioKind::Volatility { .. }
                    | ScenarioKind::Custom { .. } => {
                        let mut shocked = price;
                        if let Some(shock) = scenario.symbol_shock(&holding.symbol) {
                            shocked *= 1.0 + shock;
                        }
                        if let Some(shock) = scenario.sector_shock(&holding.sector) {
                            shocked *= 1.0 + shock;
                        }
                        if let Some(shock) = scenario.market_shock() {
                            shocked *= 1.0 + shock;
                        }
                        shocked
                    }
                };
                impact(holding, shocked)
            })
            .collect();

        let result = ShockResult::from_impacts(&scenario.name, impacts);
        debug!(
            scenario = %scenario.name,
            kind = scenario.kind.label(),
            loss = result.loss,
            "Scenario analysis applied"
        );
        result
    }

    /// Analyze every scenario, keyed by scenario name
    pub fn run_scenario_analysis(
        &self,
        portfolio: &Portfolio,
        scenarios: &[Scenario],
    ) -> IndexMap<String, ShockResult> {
        scenarios
            .iter()
            .map(|s| (s.name.clone(), self.scenario_analysis(portfolio, s)))
            .collect()
    }

    /// Worst, best and average loss across a result set
    pub fn summarize(&self, results: &IndexMap<String, ShockResult>) -> Result<StressTestReport> {
        let worst = results
            .values()
            .max_by(|a, b| a.loss.total_cmp(&b.loss))
            .ok_or_else(|| {
                RiskError::InsufficientData("No stress test results to summarize".to_string())
            })?;
        let best = results
            .values()
            .min_by(|a, b| a.loss.total_cmp(&b.loss))
            .ok_or_else(|| {
                RiskError::InsufficientData("No stress test results to summarize".to_string())
            })?;
        let average_loss = results.values().map(|r| r.loss).sum::<f64>() / results.len() as f64;

        Ok(StressTestReport {
            worst_scenario: worst.scenario_name.clone(),
            max_loss: worst.loss,
            max_loss_percent: worst.loss_percent,
            best_scenario: best.scenario_name.clone(),
            min_loss: best.loss,
            average_loss,
            scenario_count: results.len(),
            timestamp: Utc::now(),
        })
    }

    /// Add a scenario to the engine's list
    pub fn add_scenario(&mut self, scenario: Scenario) {
        self.scenarios.push(scenario);
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn create_test_portfolio() -> Portfolio {
        Portfolio::new(
            "Test",
            vec![
                Holding::new("AAPL", 100.0, 200.0, "Technology"),
                Holding::new("JPM", 100.0, 100.0, "Financials"),
                Holding::new("O", 100.0, 50.0, "Real Estate"),
                Holding::new("XOM", 100.0, 100.0, "Energy"),
            ],
        )
        .unwrap()
    }

    fn scenario(name: &str) -> Scenario {
        predefined_scenarios()
            .into_iter()
            .find(|s| s.name == name)
            .unwrap()
    }

    #[test]
    fn test_market_crash_single_holding() {
        let portfolio =
            Portfolio::new("One", vec![Holding::new("AAPL", 10.0, 150.0, "Technology")]).unwrap();
        let engine = StressTestEngine::default();
        let mut rng = StdRng::seed_from_u64(1);

        let result = engine.stress_scenario(&portfolio, &scenario("Market Crash (-30%)"), &mut rng);
        assert_relative_eq!(result.stressed_value, 1_500.0 * 0.7, epsilon = 1e-9);
        assert_relative_eq!(result.loss_percent, 0.30, epsilon = 1e-12);
    }

    #[test]
    fn test_sector_then_market_shock() {
        let engine = StressTestEngine::default();
        let custom = Scenario::new(
            "Combo",
            "",
            ScenarioKind::Custom {
                symbol_shocks: BTreeMap::new(),
                sector_shocks: BTreeMap::from([(Sector::Technology, -0.5)]),
                market_shock: Some(-0.1),
                volatility_shock: Some(0.0),
            },
        );
        let mut rng = StdRng::seed_from_u64(1);
        let result = engine.stress_scenario(&create_test_portfolio(), &custom, &mut rng);

        let aapl = &result.holdings[0];
        assert_relative_eq!(aapl.shocked_price, 200.0 * 0.5 * 0.9, epsilon = 1e-9);
        let jpm = &result.holdings[1];
        assert_relative_eq!(jpm.shocked_price, 90.0, epsilon = 1e-9);
        assert_eq!(result.worst_holding().unwrap().symbol, "AAPL");
    }

    #[test]
    fn test_zero_volatility_is_idempotent() {
        let engine = StressTestEngine::default();
        let portfolio = create_test_portfolio();
        let calm = Scenario::new("Calm", "", ScenarioKind::Volatility { volatility_shock: 0.0 });

        let a = engine.stress_scenario(&portfolio, &calm, &mut StdRng::seed_from_u64(1));
        let b = engine.stress_scenario(&portfolio, &calm, &mut StdRng::seed_from_u64(2));
        assert_eq!(a.holdings, b.holdings);
        assert_eq!(a.loss, 0.0);
    }

    #[test]
    fn test_volatility_spike_uses_rng() {
        let engine = StressTestEngine::default();
        let portfolio = create_test_portfolio();
        let spike = scenario("Volatility Spike");

        let a = engine.stress_scenario(&portfolio, &spike, &mut StdRng::seed_from_u64(7));
        let b = engine.stress_scenario(&portfolio, &spike, &mut StdRng::seed_from_u64(7));
        let c = engine.stress_scenario(&portfolio, &spike, &mut StdRng::seed_from_u64(8));

        assert_eq!(a.stressed_value, b.stressed_value);
        assert_ne!(a.stressed_value, c.stressed_value);
    }

    #[test]
    fn test_stress_test_keys_by_name_and_overwrites() {
        let engine = StressTestEngine::default();
        let portfolio = create_test_portfolio();
        let mut scenarios = predefined_scenarios();
        scenarios.push(Scenario::new(
            "Market Crash (-30%)",
            "",
            ScenarioKind::Market { market_shock: -0.10 },
        ));

        let results = engine.stress_test(&portfolio, &scenarios, &mut StdRng::seed_from_u64(3));
        assert_eq!(results.len(), 6);
        assert_eq!(results.get_index(0).unwrap().0, "Market Crash (-30%)");
        assert_relative_eq!(results["Market Crash (-30%)"].loss_percent, 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_interest_rate_analysis() {
        let engine = StressTestEngine::default();
        let result = engine.scenario_analysis(
            &create_test_portfolio(),
            &scenario("Interest Rate Shock (+200bp)"),
        );

        let prices: Vec<f64> = result.holdings.iter().map(|h| h.shocked_price).collect();
        assert_relative_eq!(prices[0], 200.0 * (1.0 - 0.012), epsilon = 1e-9);
        assert_relative_eq!(prices[1], 100.0 * (1.0 + 0.01), epsilon = 1e-9);
        assert_relative_eq!(prices[2], 50.0 * (1.0 - 0.024), epsilon = 1e-9);
        assert_relative_eq!(prices[3], 100.0 * (1.0 - 0.006), epsilon = 1e-9);
    }

    #[test]
    fn test_inflation_and_recession_analysis() {
        let engine = StressTestEngine::default();
        let portfolio = create_test_portfolio();

        let inflation = engine.scenario_analysis(&portfolio, &scenario("Inflation Spike (5%)"));
        assert_relative_eq!(inflation.holdings[3].shocked_price, 104.0, epsilon = 1e-9);
        assert_relative_eq!(inflation.holdings[0].shocked_price, 196.0, epsilon = 1e-9);

        let recession = engine.scenario_analysis(&portfolio, &scenario("Recession Scenario"));
        assert_relative_eq!(recession.holdings[0].shocked_price, 200.0 * 0.7, epsilon = 1e-9);
        assert_relative_eq!(recession.holdings[1].shocked_price, 100.0 * 0.675, epsilon = 1e-9);
        assert_relative_eq!(recession.holdings[3].shocked_price, 75.0, epsilon = 1e-9);
    }

    #[test]
    fn test_analysis_ignores_volatility() {
        let engine = StressTestEngine::default();
        let portfolio = create_test_portfolio();
        let result = engine.scenario_analysis(&portfolio, &scenario("Volatility Spike"));
        assert_eq!(result.loss, 0.0);
    }

    #[test]
    fn test_custom_analysis_applies_symbol_shock() {
        let engine = StressTestEngine::default();
        let custom = Scenario::new(
            "Single Name",
            "",
            ScenarioKind::Custom {
                symbol_shocks: BTreeMap::from([("XOM".to_string(), -0.2)]),
                sector_shocks: BTreeMap::from([(Sector::Energy, -0.5)]),
                market_shock: None,
                volatility_shock: Some(0.9),
            },
        );
        let result = engine.scenario_analysis(&create_test_portfolio(), &custom);
        assert_relative_eq!(result.holdings[3].shocked_price, 100.0 * 0.8 * 0.5, epsilon = 1e-9);
        assert_eq!(result.holdings[0].impact, 0.0);
    }

    #[test]
    fn test_input_portfolio_unchanged() {
        let engine = StressTestEngine::default();
        let portfolio = create_test_portfolio();
        let before = portfolio.clone();
        engine.run_all(&portfolio, &mut StdRng::seed_from_u64(1));
        engine.run_scenario_analysis(&portfolio, engine.scenarios());
        assert_eq!(portfolio, before);
    }

    #[test]
    fn test_summarize() {
        let engine = StressTestEngine::default();
        let portfolio = create_test_portfolio();
        let results = engine.run_scenario_analysis(&portfolio, engine.scenarios());

        let report = engine.summarize(&results).unwrap();
        assert_eq!(report.scenario_count, 6);
        assert_eq!(report.worst_scenario, "Market Crash (-30%)");
        assert!(report.max_loss >= report.average_loss);
        assert!(report.average_loss >= report.min_loss);

        assert!(engine.summarize(&IndexMap::new()).is_err());
    }
}
