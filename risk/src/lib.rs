//! # rd-risk: Risk analytics for equity portfolios
//!
//! Quantitative risk metrics, stress scenarios and advisory rules for a
//! portfolio of equity holdings. Everything here is synchronous and free of
//! I/O; randomness always comes from a generator the caller passes in.
//!
//! ## Core Components
//!
//! - **Statistics kernel** (`stats`): moments, correlation, inverse normal
//!   CDF, Box-Muller draws
//! - **RiskCalculator**: VaR/CVaR, Sharpe/Sortino, drawdown, beta, delta,
//!   correlation matrix
//! - **StressTestEngine**: shock pipeline and per-kind scenario analysis
//! - **AdvisoryEngine**: YAML/JSON-configurable threshold rules
//!
//! ## Example Usage
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use rd_risk::{
//!     AdvisoryEngine, Holding, Portfolio, RiskCalculator, StressTestEngine, SyntheticReturns,
//! };
//!
//! let portfolio = Portfolio::new(
//!     "Core",
//!     vec![
//!         Holding::new("AAPL", 100.0, 238.99, "Technology"),
//!         Holding::new("JNJ", 60.0, 156.25, "Healthcare"),
//!     ],
//! )
//! .unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let report = RiskCalculator::default()
//!     .calculate(&portfolio, &SyntheticReturns::default(), &mut rng)
//!     .unwrap();
//! assert!(report.metrics.var99 <= report.metrics.var95);
//!
//! let insights = AdvisoryEngine::default().generate_insights(&portfolio, &report.metrics);
//! assert!(!insights.concentration.is_empty());
//!
//! let engine = StressTestEngine::default();
//! let results = engine.run_all(&portfolio, &mut rng);
//! assert_eq!(results.len(), 6);
//! ```

pub mod advisory;
pub mod analytics;
pub mod config;
pub mod error;
pub mod portfolio;
pub mod returns;
pub mod stats;
pub mod stress;

pub use advisory::{
    AdvisoryConfig, AdvisoryEngine, AdvisoryRule, Alert, AlertRule, Insight, InsightBundle,
    InsightCategory, Priority, Severity,
};
pub use analytics::{CorrelationMatrix, Drawdown, RiskCalculator, RiskMetrics, RiskReport, VarMethod};
pub use config::RiskConfig;
pub use error::{Result, RiskError};
pub use portfolio::{Holding, Portfolio, Sector};
pub use returns::{HistoricalReturns, ReturnSeries, ReturnSource, SyntheticReturns, TRADING_DAYS};
pub use stress::{
    predefined_scenarios, HoldingImpact, Scenario, ScenarioKind, ShockResult, StressTestEngine,
    StressTestReport,
};
