//! Portfolio data model
//!
//! A [`Portfolio`] is an immutable, ordered list of [`Holding`]s. Values are
//! always derived from quantity × price, never stored. Live pricing produces
//! a new portfolio rather than mutating the ingested one.

use crate::error::{Result, RiskError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Equity sector tag
///
/// The ten named sectors drive every sensitivity table in the crate; any
/// other tag is carried verbatim in [`Sector::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sector {
    Technology,
    Healthcare,
    Financials,
    ConsumerDiscretionary,
    ConsumerStaples,
    Energy,
    Materials,
    Industrials,
    Utilities,
    RealEstate,
    Other(String),
}

impl Sector {
    /// Sector tag used when a holding does not declare one
    pub fn unknown() -> Self {
        Sector::Other("Unknown".to_string())
    }

    /// Display name, matching the serialized form
    pub fn name(&self) -> &str {
        match self {
            Sector::Technology => "Technology",
            Sector::Healthcare => "Healthcare",
            Sector::Financials => "Financials",
            Sector::ConsumerDiscretionary => "Consumer Discretionary",
            Sector::ConsumerStaples => "Consumer Staples",
            Sector::Energy => "Energy",
            Sector::Materials => "Materials",
            Sector::Industrials => "Industrials",
            Sector::Utilities => "Utilities",
            Sector::RealEstate => "Real Estate",
            Sector::Other(name) => name,
        }
    }

    /// Approximate market beta for the sector
    ///
    /// Used in place of per-asset betas, which would require market history.
    pub fn market_beta(&self) -> f64 {
        match self {
            Sector::Technology => 1.3,
            Sector::Healthcare => 0.9,
            Sector::Financials => 1.2,
            Sector::ConsumerDiscretionary => 1.1,
            Sector::ConsumerStaples => 0.7,
            Sector::Energy => 1.4,
            Sector::Materials => 1.2,
            Sector::Industrials => 1.1,
            Sector::Utilities => 0.6,
            Sector::RealEstate => 0.8,
            Sector::Other(_) => 1.0,
        }
    }

    /// Relative risk multiplier used by the rebalancing heuristic
    pub fn risk_multiplier(&self) -> f64 {
        match self {
            Sector::Industrials => 1.0,
            other => other.market_beta(),
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for Sector {
    fn from(value: String) -> Self {
        match value.trim() {
            "Technology" => Sector::Technology,
            "Healthcare" => Sector::Healthcare,
            "Financials" => Sector::Financials,
            "Consumer Discretionary" => Sector::ConsumerDiscretionary,
            "Consumer Staples" => Sector::ConsumerStaples,
            "Energy" => Sector::Energy,
            "Materials" => Sector::Materials,
            "Industrials" => Sector::Industrials,
            "Utilities" => Sector::Utilities,
            "Real Estate" => Sector::RealEstate,
            "" => Sector::unknown(),
            _ => Sector::Other(value),
        }
    }
}

impl From<&str> for Sector {
    fn from(value: &str) -> Self {
        Sector::from(value.to_string())
    }
}

impl From<Sector> for String {
    fn from(sector: Sector) -> Self {
        match sector {
            Sector::Other(name) => name,
            named => named.name().to_string(),
        }
    }
}

/// Single equity position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Ticker symbol, unique within a portfolio
    pub symbol: String,

    /// Number of shares held
    pub quantity: f64,

    /// Price at ingestion
    pub entry_price: f64,

    /// Latest known price (equals entry price until live prices arrive)
    pub current_price: f64,

    /// Sector tag
    #[serde(default = "Sector::unknown")]
    pub sector: Sector,
}

impl Holding {
    /// Create a holding priced at its entry price
    pub fn new(symbol: impl Into<String>, quantity: f64, price: f64, sector: impl Into<Sector>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            entry_price: price,
            current_price: price,
            sector: sector.into(),
        }
    }

    /// quantity × entry price
    pub fn entry_value(&self) -> f64 {
        self.quantity * self.entry_price
    }

    /// quantity × current price
    pub fn current_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    /// Unrealized profit and loss
    pub fn pnl(&self) -> f64 {
        self.current_value() - self.entry_value()
    }

    /// Unrealized P&L as a fraction of entry value (0 when entry value is 0)
    pub fn pnl_percent(&self) -> f64 {
        let entry = self.entry_value();
        if entry > 0.0 {
            self.pnl() / entry
        } else {
            0.0
        }
    }

    /// Copy of this holding at a different current price
    pub fn repriced(&self, price: f64) -> Self {
        Self {
            current_price: price,
            ..self.clone()
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| RiskError::InvalidHolding {
            symbol: self.symbol.clone(),
            reason: reason.to_string(),
        };

        if self.symbol.trim().is_empty() {
            return Err(invalid("empty symbol"));
        }
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(invalid("quantity must be finite and non-negative"));
        }
        if !self.entry_price.is_finite() || self.entry_price < 0.0 {
            return Err(invalid("entry price must be finite and non-negative"));
        }
        if !self.current_price.is_finite() || self.current_price < 0.0 {
            return Err(invalid("current price must be finite and non-negative"));
        }
        Ok(())
    }
}

/// Immutable portfolio snapshot
///
/// Deserialization goes through [`Portfolio::new`], so duplicate symbols and
/// invalid holdings are rejected; a missing id or timestamps are generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PortfolioRepr")]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    holdings: Vec<Holding>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct PortfolioRepr {
    #[serde(default)]
    id: Option<String>,
    name: String,
    holdings: Vec<Holding>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<PortfolioRepr> for Portfolio {
    type Error = RiskError;

    fn try_from(repr: PortfolioRepr) -> Result<Self> {
        let mut portfolio = Portfolio::new(repr.name, repr.holdings)?;
        if let Some(id) = repr.id {
            portfolio.id = id;
        }
        if let Some(created_at) = repr.created_at {
            portfolio.created_at = created_at;
        }
        portfolio.updated_at = repr.updated_at.unwrap_or(portfolio.created_at);
        Ok(portfolio)
    }
}

impl Portfolio {
    /// Build a portfolio from holdings, validating symbols and prices
    ///
    /// # Example
    ///
    /// ```
    /// use rd_risk::{Holding, Portfolio};
    ///
    /// let portfolio = Portfolio::new(
    ///     "Core",
    ///     vec![
    ///         Holding::new("AAPL", 100.0, 238.99, "Technology"),
    ///         Holding::new("GOOGL", 50.0, 142.30, "Technology"),
    ///     ],
    /// )
    /// .unwrap();
    ///
    /// assert!((portfolio.total_value() - 31_014.0).abs() < 1e-9);
    /// ```
    pub fn new(name: impl Into<String>, holdings: Vec<Holding>) -> Result<Self> {
        let mut seen = HashSet::new();
        for holding in &holdings {
            holding.validate()?;
            if !seen.insert(holding.symbol.as_str()) {
                return Err(RiskError::DuplicateSymbol(holding.symbol.clone()));
            }
        }

        let now = Utc::now();
        Ok(Self {
            id: format!("portfolio_{}", Uuid::new_v4()),
            name: name.into(),
            holdings,
            created_at: now,
            updated_at: now,
        })
    }

    /// Holdings in ingestion order
    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    /// Look up a holding by symbol
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    /// Sum of entry values
    pub fn total_value(&self) -> f64 {
        self.holdings.iter().map(Holding::entry_value).sum()
    }

    /// Sum of current values
    pub fn current_value(&self) -> f64 {
        self.holdings.iter().map(Holding::current_value).sum()
    }

    /// Aggregate unrealized P&L
    pub fn total_pnl(&self) -> f64 {
        self.holdings.iter().map(Holding::pnl).sum()
    }

    /// Aggregate P&L relative to the ingested total value
    pub fn total_pnl_percent(&self) -> f64 {
        let total = self.total_value();
        if total > 0.0 {
            self.total_pnl() / total
        } else {
            0.0
        }
    }

    /// New portfolio priced at the given live quotes
    ///
    /// Symbols missing from `prices`, or quoted at a non-finite or
    /// non-positive price, keep their entry price.
    pub fn with_live_prices(&self, prices: &HashMap<String, f64>) -> Portfolio {
        let holdings = self
            .holdings
            .iter()
            .map(|holding| match prices.get(&holding.symbol) {
                Some(&price) if price.is_finite() && price > 0.0 => holding.repriced(price),
                Some(&price) => {
                    warn!(
                        symbol = %holding.symbol,
                        price,
                        "Ignoring invalid live price, using entry price"
                    );
                    holding.repriced(holding.entry_price)
                }
                None => holding.repriced(holding.entry_price),
            })
            .collect();

        Portfolio {
            holdings,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Current-value weight of each holding, in holding order
    ///
    /// Returns an error when the portfolio has no positive current value.
    pub fn weights(&self) -> Result<Vec<f64>> {
        if self.holdings.is_empty() {
            return Err(RiskError::EmptyPortfolio);
        }
        let total = self.current_value();
        if !(total > 0.0) {
            return Err(RiskError::ZeroPortfolioValue);
        }
        Ok(self
            .holdings
            .iter()
            .map(|h| h.current_value() / total)
            .collect())
    }

    /// Current-value weight by sector
    pub fn sector_allocation(&self) -> Result<BTreeMap<Sector, f64>> {
        let weights = self.weights()?;
        let mut allocation = BTreeMap::new();
        for (holding, weight) in self.holdings.iter().zip(weights) {
            *allocation.entry(holding.sector.clone()).or_insert(0.0) += weight;
        }
        Ok(allocation)
    }

    /// Holding with the largest current value
    pub fn largest_holding(&self) -> Option<&Holding> {
        self.holdings
            .iter()
            .max_by(|a, b| a.current_value().total_cmp(&b.current_value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_portfolio() -> Portfolio {
        Portfolio::new(
            "Test",
            vec![
                Holding::new("AAPL", 100.0, 238.99, "Technology"),
                Holding::new("GOOGL", 50.0, 142.30, "Technology"),
                Holding::new("JPM", 40.0, 168.75, "Financials"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_total_value_two_holdings() {
        let portfolio = Portfolio::new(
            "Pair",
            vec![
                Holding::new("AAPL", 100.0, 238.99, "Technology"),
                Holding::new("GOOGL", 50.0, 142.30, "Technology"),
            ],
        )
        .unwrap();

        assert_relative_eq!(portfolio.total_value(), 100.0 * 238.99 + 50.0 * 142.30);
        assert_relative_eq!(portfolio.total_value(), 31_014.0, epsilon = 1e-9);
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let result = Portfolio::new(
            "Dup",
            vec![
                Holding::new("AAPL", 1.0, 10.0, "Technology"),
                Holding::new("AAPL", 2.0, 11.0, "Technology"),
            ],
        );
        assert!(matches!(result, Err(RiskError::DuplicateSymbol(s)) if s == "AAPL"));
    }

    #[test]
    fn test_invalid_holding_rejected() {
        let result = Portfolio::new("Bad", vec![Holding::new("X", -1.0, 10.0, "Energy")]);
        assert!(matches!(result, Err(RiskError::InvalidHolding { .. })));

        let result = Portfolio::new("Bad", vec![Holding::new("X", 1.0, f64::NAN, "Energy")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_live_prices_produce_new_portfolio() {
        let portfolio = create_test_portfolio();
        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), 250.0);
        prices.insert("JPM".to_string(), -5.0);

        let live = portfolio.with_live_prices(&prices);

        // Original untouched
        assert_eq!(portfolio.holding("AAPL").unwrap().current_price, 238.99);

        let aapl = live.holding("AAPL").unwrap();
        assert_eq!(aapl.current_price, 250.0);
        assert_relative_eq!(aapl.current_value(), 25_000.0);
        assert_relative_eq!(aapl.pnl(), 25_000.0 - 23_899.0, epsilon = 1e-9);

        // Missing and invalid quotes fall back to entry price
        assert_eq!(live.holding("GOOGL").unwrap().current_price, 142.30);
        assert_eq!(live.holding("JPM").unwrap().current_price, 168.75);

        // Entry total is unchanged by repricing
        assert_relative_eq!(live.total_value(), portfolio.total_value());
    }

    #[test]
    fn test_sector_allocation_sums_to_one() {
        let portfolio = create_test_portfolio();
        let allocation = portfolio.sector_allocation().unwrap();

        assert_eq!(allocation.len(), 2);
        let total: f64 = allocation.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights_require_value() {
        let empty = Portfolio::new("Empty", vec![]).unwrap();
        assert!(matches!(empty.weights(), Err(RiskError::EmptyPortfolio)));

        let zero = Portfolio::new("Zero", vec![Holding::new("X", 0.0, 10.0, "Energy")]).unwrap();
        assert!(matches!(zero.weights(), Err(RiskError::ZeroPortfolioValue)));
    }

    #[test]
    fn test_largest_holding() {
        let portfolio = create_test_portfolio();
        assert_eq!(portfolio.largest_holding().unwrap().symbol, "AAPL");
    }

    #[test]
    fn test_sector_round_trip_names() {
        assert_eq!(Sector::from("Real Estate"), Sector::RealEstate);
        assert_eq!(String::from(Sector::ConsumerStaples), "Consumer Staples");
        assert_eq!(Sector::from("Crypto"), Sector::Other("Crypto".to_string()));
        assert_eq!(Sector::from(""), Sector::unknown());
        assert_eq!(Sector::Industrials.risk_multiplier(), 1.0);
        assert_eq!(Sector::Industrials.market_beta(), 1.1);
    }

    #[test]
    fn test_holding_deserialization_yaml() {
        let yaml = r#"
symbol: JNJ
quantity: 60
entry_price: 156.25
current_price: 156.25
sector: Healthcare
"#;
        let holding: Holding = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(holding.sector, Sector::Healthcare);
        assert_relative_eq!(holding.entry_value(), 9_375.0);
    }

    #[test]
    fn test_deserialization_rejects_duplicate_symbols() {
        let yaml = r#"
name: Doubled
holdings:
  - { symbol: AAPL, quantity: 10, entry_price: 200, current_price: 200, sector: Technology }
  - { symbol: AAPL, quantity: 5, entry_price: 210, current_price: 210, sector: Technology }
"#;
        let err = serde_yaml::from_str::<Portfolio>(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate symbol"));

        let negative = r#"
name: Short
holdings:
  - { symbol: XOM, quantity: -1, entry_price: 100, current_price: 100, sector: Energy }
"#;
        assert!(serde_yaml::from_str::<Portfolio>(negative).is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_identity() {
        let portfolio = create_test_portfolio();
        let json = serde_json::to_string(&portfolio).unwrap();
        let restored: Portfolio = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, portfolio);

        let minimal: Portfolio =
            serde_json::from_str(r#"{"name":"Bare","holdings":[]}"#).unwrap();
        assert!(minimal.id.starts_with("portfolio_"));
        assert!(minimal.is_empty());
    }
}
