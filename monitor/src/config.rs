use anyhow::{Context, Result};
use rd_risk::{AdvisoryConfig, Holding, Portfolio, Scenario, Sector, SyntheticReturns};
use rd_session::SessionConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    pub portfolio_file: PathBuf,
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
    #[serde(default)]
    pub scenarios_file: Option<PathBuf>,
    #[serde(default)]
    pub prices: HashMap<String, f64>,
    #[serde(default)]
    pub volatilities: HashMap<String, f64>,
    #[serde(default)]
    pub run_for_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PortfolioFile {
    pub name: String,
    pub holdings: Vec<HoldingEntry>,
}

#[derive(Debug, Deserialize)]
pub struct HoldingEntry {
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
    #[serde(default)]
    pub sector: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let mut config: Config = serde_yaml::from_str(&contents)?;

        // Relative paths resolve against the config file's directory
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.portfolio_file = base.join(&config.portfolio_file);
        config.rules_file = config.rules_file.map(|p| base.join(p));
        config.scenarios_file = config.scenarios_file.map(|p| base.join(p));

        if let Some(rules) = &config.rules_file {
            let yaml = fs::read_to_string(rules)
                .with_context(|| format!("Failed to read rules {:?}", rules))?;
            config.session.advisory = AdvisoryConfig::from_yaml(&yaml)
                .map_err(|e| anyhow::anyhow!("Failed to load advisory rules: {}", e))?;
        }
        config
            .session
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid session config: {}", e))?;
        Ok(config)
    }

    pub fn portfolio(&self) -> Result<Portfolio> {
        let contents = fs::read_to_string(&self.portfolio_file)
            .with_context(|| format!("Failed to read portfolio {:?}", self.portfolio_file))?;
        let file: PortfolioFile = serde_yaml::from_str(&contents)?;
        let holdings = file
            .holdings
            .into_iter()
            .map(|h| {
                let sector = h.sector.map(Sector::from).unwrap_or_else(Sector::unknown);
                Holding::new(h.symbol, h.quantity, h.price, sector)
            })
            .collect();
        Portfolio::new(file.name, holdings)
            .map_err(|e| anyhow::anyhow!("Invalid portfolio: {}", e))
    }

    pub fn custom_scenarios(&self) -> Result<Vec<Scenario>> {
        let Some(path) = &self.scenarios_file else {
            return Ok(Vec::new());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenarios {:?}", path))?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Stock volatility table with the configured overrides applied
    pub fn return_source(&self) -> SyntheticReturns {
        let mut source = SyntheticReturns::default();
        source
            .volatilities
            .extend(self.volatilities.iter().map(|(s, v)| (s.clone(), *v)));
        source
    }
}
