//! Risk session orchestrator
//!
//! One [`RiskSession`] owns a portfolio, the live prices it is valued at and
//! the last published [`RiskState`]. Recompute passes are serialized through
//! a single control block: a trigger that arrives while a pass is running
//! queues exactly one follow-up instead of starting a second pass. CPU work
//! runs on the blocking pool and the result is published as one `Arc` swap,
//! so readers see either the previous snapshot or the new one.

use crate::alerts::AlertBook;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::refresh;
use crate::scenarios::ScenarioLibrary;
use crate::state::{Phase, RecomputeOutcome, RiskState};
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rd_risk::{
    AdvisoryEngine, Alert, InsightBundle, Portfolio, ReturnSource, RiskCalculator, RiskReport,
    Scenario, ShockResult, StressTestEngine, StressTestReport,
};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type ResultMap = IndexMap<String, ShockResult>;

/// Cheaply clonable handle to a risk session
#[derive(Clone)]
pub struct RiskSession {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    calculator: RiskCalculator,
    advisory: AdvisoryEngine,
    source: Arc<dyn ReturnSource>,
    refresh_interval: Duration,
    control: Mutex<Control>,
    state: RwLock<Arc<RiskState>>,
    last_error: RwLock<Option<String>>,
    stress_results: RwLock<Arc<ResultMap>>,
    scenario_results: RwLock<Arc<ResultMap>>,
    alerts: Mutex<AlertBook>,
    scenarios: RwLock<ScenarioLibrary>,
    rng: Mutex<StdRng>,
}

struct Control {
    phase: Phase,
    pending: bool,
    portfolio: Option<Arc<Portfolio>>,
    live_prices: HashMap<String, f64>,
    auto_refresh: bool,
    timer: Option<JoinHandle<()>>,
}

/// Output of one successful calculation
struct Pass {
    valued: Portfolio,
    report: RiskReport,
    insights: InsightBundle,
}

impl RiskSession {
    /// Create a session that draws return series from `source`
    pub fn new(config: SessionConfig, source: Arc<dyn ReturnSource>) -> Result<Self> {
        let interval = config.refresh_interval();
        Self::with_refresh_interval(config, source, interval)
    }

    /// Like [`new`](Self::new) with an explicit timer period
    pub fn with_refresh_interval(
        config: SessionConfig,
        source: Arc<dyn ReturnSource>,
        refresh_interval: Duration,
    ) -> Result<Self> {
        config.validate()?;
        if refresh_interval.is_zero() {
            return Err(SessionError::Config(
                "Refresh interval must be positive".to_string(),
            ));
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            refresh_interval_ms = refresh_interval.as_millis() as u64,
            auto_refresh = config.auto_refresh,
            var_method = ?config.risk.var_method,
            "Risk session created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                calculator: RiskCalculator::new(config.risk),
                advisory: AdvisoryEngine::new(config.advisory),
                source,
                refresh_interval,
                control: Mutex::new(Control {
                    phase: Phase::Idle,
                    pending: false,
                    portfolio: None,
                    live_prices: HashMap::new(),
                    auto_refresh: config.auto_refresh,
                    timer: None,
                }),
                state: RwLock::new(Arc::new(RiskState::default())),
                last_error: RwLock::new(None),
                stress_results: RwLock::new(Arc::new(IndexMap::new())),
                scenario_results: RwLock::new(Arc::new(IndexMap::new())),
                alerts: Mutex::new(AlertBook::new()),
                scenarios: RwLock::new(ScenarioLibrary::new()),
                rng: Mutex::new(rng),
            }),
        })
    }

    pub(crate) fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    // ===== Recompute triggers =====

    /// Replace portfolio and live prices, then recompute
    pub async fn recompute_metrics(
        &self,
        portfolio: Portfolio,
        live_prices: HashMap<String, f64>,
    ) -> RecomputeOutcome {
        {
            let mut control = self.inner.control.lock();
            control.portfolio = Some(Arc::new(portfolio));
            control.live_prices = live_prices;
            self.ensure_timer(&mut control);
        }
        self.trigger().await
    }

    /// Load or replace the portfolio, keeping current live prices
    pub async fn set_portfolio(&self, portfolio: Portfolio) -> RecomputeOutcome {
        {
            let mut control = self.inner.control.lock();
            info!(
                portfolio = %portfolio.name,
                holdings = portfolio.len(),
                "Portfolio loaded"
            );
            control.portfolio = Some(Arc::new(portfolio));
            self.ensure_timer(&mut control);
        }
        self.trigger().await
    }

    /// Drop the portfolio and everything derived from it
    ///
    /// Stops the refresh timer. Alerts and live prices are kept.
    pub fn clear_portfolio(&self) {
        let timer = {
            let mut control = self.inner.control.lock();
            control.portfolio = None;
            control.pending = false;
            let timer = control.timer.take();

            let mut state = self.inner.state.write();
            let generation = state.generation + 1;
            *state = Arc::new(RiskState {
                generation,
                ..RiskState::default()
            });
            timer
        };
        if let Some(timer) = timer {
            timer.abort();
        }

        *self.inner.last_error.write() = None;
        *self.inner.stress_results.write() = Arc::new(IndexMap::new());
        *self.inner.scenario_results.write() = Arc::new(IndexMap::new());
        info!("Portfolio cleared");
    }

    /// Merge quotes into the live-price map, then recompute
    pub async fn update_prices(&self, prices: HashMap<String, f64>) -> RecomputeOutcome {
        {
            let mut control = self.inner.control.lock();
            debug!(quotes = prices.len(), "Live prices updated");
            control.live_prices.extend(prices);
        }
        self.trigger().await
    }

    /// Manual recompute request
    pub async fn refresh(&self) -> RecomputeOutcome {
        self.trigger().await
    }

    async fn trigger(&self) -> RecomputeOutcome {
        {
            let mut control = self.inner.control.lock();
            if control.portfolio.is_none() {
                return RecomputeOutcome::NoPortfolio;
            }
            if control.phase == Phase::Calculating {
                if !control.pending {
                    debug!("Recompute queued behind in-flight pass");
                }
                control.pending = true;
                return RecomputeOutcome::Queued;
            }
            control.phase = Phase::Calculating;
        }

        let mut guard = PhaseGuard {
            session: self,
            armed: true,
        };
        let mut follow_ups = 0;

        loop {
            let Some((portfolio, prices)) = self.inner.begin_pass() else {
                guard.disarm();
                return RecomputeOutcome::NoPortfolio;
            };

            let seed = self.next_seed();
            let inner = Arc::clone(&self.inner);
            let task_portfolio = Arc::clone(&portfolio);
            let result = tokio::task::spawn_blocking(move || {
                inner
                    .compute(&task_portfolio, &prices, seed)
                    .map_err(|e| e.to_string())
            })
            .await
            .unwrap_or_else(|e| Err(format!("Recompute task failed: {}", e)));

            match self.inner.settle(&portfolio, result, follow_ups == 0) {
                Settled::RunAgain => follow_ups += 1,
                Settled::Done(outcome) => {
                    guard.disarm();
                    return outcome;
                }
                Settled::HandOff(outcome) => {
                    guard.disarm();
                    debug!("Handing later recompute to a background task");
                    self.spawn_follow_up();
                    return outcome;
                }
            }
        }
    }

    /// Run a queued recompute on its own task
    fn spawn_follow_up(&self) {
        match Handle::try_current() {
            Ok(handle) => {
                let session = self.clone();
                handle.spawn(async move {
                    let outcome = session.refresh().await;
                    debug!(?outcome, "Background recompute finished");
                });
            }
            Err(_) => warn!("No tokio runtime, queued recompute dropped"),
        }
    }

    // ===== Stress and scenario analysis =====

    /// Run the shock pipeline over `scenarios` (default: the library)
    ///
    /// The portfolio is valued at the session's live prices. The result
    /// replaces the stress slot wholesale.
    pub async fn run_stress_tests(
        &self,
        portfolio: &Portfolio,
        scenarios: Option<Vec<Scenario>>,
    ) -> Result<Arc<ResultMap>> {
        let (valued, engine) = self.prepare_scenario_run(portfolio, scenarios)?;
        let seed = self.next_seed();

        let results = tokio::task::spawn_blocking(move || {
            let mut rng = StdRng::seed_from_u64(seed);
            engine.run_all(&valued, &mut rng)
        })
        .await?;

        let results = Arc::new(results);
        *self.inner.stress_results.write() = Arc::clone(&results);
        info!(scenarios = results.len(), "Stress tests completed");
        Ok(results)
    }

    /// Deterministic per-kind analysis over `scenarios` (default: the library)
    pub async fn run_scenario_analysis(
        &self,
        portfolio: &Portfolio,
        scenarios: Option<Vec<Scenario>>,
    ) -> Result<Arc<ResultMap>> {
        let (valued, engine) = self.prepare_scenario_run(portfolio, scenarios)?;

        let results = tokio::task::spawn_blocking(move || {
            engine.run_scenario_analysis(&valued, engine.scenarios())
        })
        .await?;

        let results = Arc::new(results);
        *self.inner.scenario_results.write() = Arc::clone(&results);
        info!(scenarios = results.len(), "Scenario analysis completed");
        Ok(results)
    }

    fn prepare_scenario_run(
        &self,
        portfolio: &Portfolio,
        scenarios: Option<Vec<Scenario>>,
    ) -> Result<(Portfolio, StressTestEngine)> {
        if portfolio.is_empty() {
            return Err(rd_risk::RiskError::EmptyPortfolio.into());
        }
        let valued = portfolio.with_live_prices(&self.inner.control.lock().live_prices);
        let engine = match scenarios {
            Some(scenarios) => StressTestEngine::new(scenarios),
            None => self.inner.scenarios.read().engine(),
        };
        Ok((valued, engine))
    }

    /// Worst, best and average loss of the last stress run
    pub fn stress_summary(&self) -> Result<StressTestReport> {
        let results = self.stress_results();
        Ok(StressTestEngine::new(Vec::new()).summarize(&results)?)
    }

    pub fn add_custom_scenario(&self, scenario: Scenario) -> Uuid {
        self.inner.scenarios.write().add(scenario)
    }

    pub fn remove_custom_scenario(&self, id: Uuid) -> Result<Scenario> {
        self.inner.scenarios.write().remove(id)
    }

    // ===== Alerts =====

    pub fn dismiss_alert(&self, id: Uuid) -> Result<Alert> {
        let alert = self
            .inner
            .alerts
            .lock()
            .dismiss(id)
            .ok_or(SessionError::AlertNotFound(id))?;
        debug!(%id, title = %alert.title(), "Alert dismissed");
        Ok(alert)
    }

    pub fn clear_alerts(&self) {
        self.inner.alerts.lock().clear();
        debug!("Alerts cleared");
    }

    // ===== Auto refresh =====

    /// Enable or disable the periodic recompute timer
    ///
    /// Disabling cancels a running timer immediately. A request queued behind
    /// a timer pass cut short this way still runs.
    pub fn set_auto_refresh(&self, enabled: bool) {
        let stopped = {
            let mut control = self.inner.control.lock();
            control.auto_refresh = enabled;
            if enabled {
                self.ensure_timer(&mut control);
                None
            } else {
                control.timer.take()
            }
        };
        if let Some(timer) = stopped {
            timer.abort();
        }
        info!(enabled, "Auto refresh toggled");
    }

    fn ensure_timer(&self, control: &mut Control) {
        if !control.auto_refresh || control.portfolio.is_none() {
            return;
        }
        if control.timer.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        control.timer = refresh::spawn_timer(Arc::downgrade(&self.inner), self.inner.refresh_interval);
    }

    /// True while the timer should keep firing
    pub(crate) fn wants_tick(&self) -> bool {
        let control = self.inner.control.lock();
        control.auto_refresh && control.portfolio.is_some()
    }

    fn next_seed(&self) -> u64 {
        self.inner.rng.lock().gen()
    }

    // ===== Readers =====

    /// Last published snapshot
    pub fn state(&self) -> Arc<RiskState> {
        Arc::clone(&self.inner.state.read())
    }

    /// Error from the most recent pass, cleared by the next success
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.read().clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.inner.alerts.lock().alerts().to_vec()
    }

    pub fn stress_results(&self) -> Arc<ResultMap> {
        Arc::clone(&self.inner.stress_results.read())
    }

    pub fn scenario_results(&self) -> Arc<ResultMap> {
        Arc::clone(&self.inner.scenario_results.read())
    }

    /// Predefined scenarios followed by custom ones
    pub fn scenarios(&self) -> Vec<Scenario> {
        self.inner.scenarios.read().all()
    }

    pub fn phase(&self) -> Phase {
        self.inner.control.lock().phase
    }

    pub fn auto_refresh(&self) -> bool {
        self.inner.control.lock().auto_refresh
    }

    pub fn portfolio(&self) -> Option<Arc<Portfolio>> {
        self.inner.control.lock().portfolio.clone()
    }

    pub fn live_prices(&self) -> HashMap<String, f64> {
        self.inner.control.lock().live_prices.clone()
    }
}

impl Inner {
    /// Snapshot inputs for the next pass, or go idle when there are none
    fn begin_pass(&self) -> Option<(Arc<Portfolio>, HashMap<String, f64>)> {
        let mut control = self.control.lock();
        match &control.portfolio {
            Some(portfolio) => Some((Arc::clone(portfolio), control.live_prices.clone())),
            None => {
                control.phase = Phase::Idle;
                control.pending = false;
                None
            }
        }
    }

    fn compute(
        &self,
        portfolio: &Portfolio,
        prices: &HashMap<String, f64>,
        seed: u64,
    ) -> rd_risk::Result<Pass> {
        let valued = portfolio.with_live_prices(prices);
        let mut rng = StdRng::seed_from_u64(seed);
        let report = self.calculator.calculate(&valued, self.source.as_ref(), &mut rng)?;
        let insights = self.advisory.generate_insights(&valued, &report.metrics);
        Ok(Pass {
            valued,
            report,
            insights,
        })
    }

    /// Record a finished pass and decide who runs the next one
    ///
    /// Publishing and the phase change happen under the control lock, so a
    /// trigger either sees `Calculating` and is picked up by a follow-up,
    /// or sees `Idle` and starts its own pass. With `may_rerun` unset a
    /// queued request goes back to `Idle` as a hand-off.
    fn settle(
        &self,
        portfolio: &Arc<Portfolio>,
        result: std::result::Result<Pass, String>,
        may_rerun: bool,
    ) -> Settled {
        let mut control = self.control.lock();
        let current = control
            .portfolio
            .as_ref()
            .is_some_and(|p| Arc::ptr_eq(p, portfolio));

        let outcome = match result {
            Ok(pass) if current => self.publish(pass),
            Ok(_) if control.portfolio.is_some() => {
                debug!("Discarding pass computed for a replaced portfolio");
                control.pending = true;
                RecomputeOutcome::Queued
            }
            Ok(_) => RecomputeOutcome::NoPortfolio,
            Err(message) => self.fail(message),
        };

        let queued = std::mem::take(&mut control.pending) && control.portfolio.is_some();
        if queued && may_rerun {
            debug!("Running queued recompute");
            return Settled::RunAgain;
        }
        control.phase = Phase::Idle;
        if queued {
            Settled::HandOff(outcome)
        } else {
            Settled::Done(outcome)
        }
    }

    fn publish(&self, pass: Pass) -> RecomputeOutcome {
        let Pass {
            valued,
            report,
            insights,
        } = pass;
        let raised = insights.alerts.clone();

        let generation = {
            let mut state = self.state.write();
            let generation = state.generation + 1;
            *state = Arc::new(RiskState {
                portfolio: Some(valued),
                metrics: Some(report.metrics),
                correlation: Some(report.correlation),
                insights,
                last_calculation: Some(Utc::now()),
                generation,
            });
            generation
        };
        *self.last_error.write() = None;

        let added = self.alerts.lock().insert_all(raised);
        info!(generation, alerts_added = added, "Risk snapshot published");
        RecomputeOutcome::Published(generation)
    }

    fn fail(&self, message: String) -> RecomputeOutcome {
        error!(error = %message, "Recompute failed, keeping last snapshot");
        *self.last_error.write() = Some(message.clone());
        RecomputeOutcome::Failed(message)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = self.control.get_mut().timer.take() {
            timer.abort();
        }
    }
}

/// What a finished pass leaves for its caller
enum Settled {
    Done(RecomputeOutcome),
    /// The caller runs the queued follow-up itself
    RunAgain,
    /// Idle again, but a request queued during the follow-up still needs a pass
    HandOff(RecomputeOutcome),
}

/// Returns the session to `Idle` if a pass is abandoned mid-flight
///
/// A follow-up queued behind the abandoned pass is handed to a background
/// task rather than dropped.
struct PhaseGuard<'a> {
    session: &'a RiskSession,
    armed: bool,
}

impl PhaseGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let queued = {
            let mut control = self.session.inner.control.lock();
            control.phase = Phase::Idle;
            std::mem::take(&mut control.pending) && control.portfolio.is_some()
        };
        if queued {
            warn!("Recompute cancelled, running queued follow-up in the background");
            self.session.spawn_follow_up();
        } else {
            warn!("Recompute cancelled before publishing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rd_risk::{Holding, SyntheticReturns};

    fn session() -> RiskSession {
        let config = SessionConfig {
            auto_refresh: false,
            seed: Some(7),
            ..SessionConfig::default()
        };
        RiskSession::new(config, Arc::new(SyntheticReturns::default())).unwrap()
    }

    fn portfolio() -> Portfolio {
        Portfolio::new(
            "Test",
            vec![
                Holding::new("AAPL", 100.0, 238.99, "Technology"),
                Holding::new("GOOGL", 50.0, 142.30, "Technology"),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_refresh_without_portfolio() {
        let session = session();
        assert_eq!(session.refresh().await, RecomputeOutcome::NoPortfolio);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.state().is_empty());
    }

    #[tokio::test]
    async fn test_set_portfolio_publishes() {
        let session = session();
        let outcome = session.set_portfolio(portfolio()).await;
        assert_eq!(outcome, RecomputeOutcome::Published(1));

        let state = session.state();
        let metrics = state.metrics.as_ref().unwrap();
        assert_relative_eq!(metrics.total_value, 31_014.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.sector_allocation.values().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert_eq!(state.correlation.as_ref().unwrap().len(), 2);
        assert!(state.last_calculation.is_some());
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_update_prices_merges() {
        let session = session();
        session.set_portfolio(portfolio()).await;

        session
            .update_prices(HashMap::from([("AAPL".to_string(), 250.0)]))
            .await;
        session
            .update_prices(HashMap::from([("GOOGL".to_string(), 150.0)]))
            .await;

        let prices = session.live_prices();
        assert_eq!(prices.len(), 2);
        let state = session.state();
        let valued = state.portfolio.as_ref().unwrap();
        assert_eq!(valued.holding("AAPL").unwrap().current_price, 250.0);
        assert_eq!(valued.holding("GOOGL").unwrap().current_price, 150.0);
        assert_eq!(state.generation, 3);
    }

    #[tokio::test]
    async fn test_clear_portfolio_resets_derived_state() {
        let session = session();
        session.set_portfolio(portfolio()).await;
        session.run_stress_tests(&portfolio(), None).await.unwrap();
        assert_eq!(session.stress_results().len(), 6);

        session.clear_portfolio();
        assert!(session.portfolio().is_none());
        assert!(session.state().is_empty());
        assert!(session.stress_results().is_empty());
        assert_eq!(session.refresh().await, RecomputeOutcome::NoPortfolio);
    }

    #[tokio::test]
    async fn test_dismiss_unknown_alert() {
        let session = session();
        let id = Uuid::new_v4();
        assert!(matches!(
            session.dismiss_alert(id),
            Err(SessionError::AlertNotFound(missing)) if missing == id
        ));
    }
}
