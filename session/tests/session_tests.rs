//! Integration tests for the risk session orchestrator
//!
//! Covers pass serialization, failure handling, cancellation, the refresh
//! timer, alerts and the scenario library.

use rand::RngCore;
use rd_risk::{
    Holding, Portfolio, ReturnSeries, ReturnSource, RiskError, Scenario, ScenarioKind,
    SyntheticReturns,
};
use rd_session::{Phase, RecomputeOutcome, RiskSession, SessionConfig, SessionError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Deterministic source that can be slowed down or made to fail
#[derive(Default)]
struct ControlledSource {
    delay: Duration,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl ControlledSource {
    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

impl ReturnSource for ControlledSource {
    fn returns_for(
        &self,
        holding: &Holding,
        horizon: usize,
        _rng: &mut dyn RngCore,
    ) -> rd_risk::Result<ReturnSeries> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RiskError::MissingHistory(holding.symbol.clone()));
        }
        let returns = (0..horizon)
            .map(|i| ((i as f64) * 0.7).sin() * 0.015 + 0.0003)
            .collect();
        Ok(ReturnSeries::new(returns))
    }
}

fn manual_config() -> SessionConfig {
    SessionConfig {
        auto_refresh: false,
        seed: Some(11),
        ..SessionConfig::default()
    }
}

fn sample_portfolio() -> Portfolio {
    Portfolio::new(
        "Sample Portfolio",
        vec![
            Holding::new("AAPL", 100.0, 238.99, "Technology"),
            Holding::new("GOOGL", 50.0, 142.30, "Technology"),
            Holding::new("MSFT", 75.0, 378.85, "Technology"),
            Holding::new("JPM", 80.0, 168.75, "Financials"),
            Holding::new("JNJ", 60.0, 156.25, "Healthcare"),
            Holding::new("XOM", 90.0, 104.50, "Energy"),
        ],
    )
    .unwrap()
}

async fn wait_for_phase(session: &RiskSession, phase: Phase) {
    for _ in 0..500 {
        if session.phase() == phase {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("session never reached {:?}", phase);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_triggers_during_pass_queue_one_follow_up() {
    let source = Arc::new(ControlledSource::slow(Duration::from_millis(40)));
    let session = RiskSession::new(manual_config(), source.clone()).unwrap();

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.set_portfolio(sample_portfolio()).await })
    };
    wait_for_phase(&session, Phase::Calculating).await;

    assert_eq!(session.refresh().await, RecomputeOutcome::Queued);
    assert_eq!(session.refresh().await, RecomputeOutcome::Queued);
    assert_eq!(
        session.update_prices(HashMap::from([("AAPL".to_string(), 250.0)])).await,
        RecomputeOutcome::Queued
    );

    // The original caller runs the follow-up before returning
    assert_eq!(first.await.unwrap(), RecomputeOutcome::Published(2));
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.state().generation, 2);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2 * 6);

    // The follow-up saw the price merged while the first pass ran
    let state = session.state();
    let valued = state.portfolio.as_ref().unwrap();
    assert_eq!(valued.holding("AAPL").unwrap().current_price, 250.0);
}

#[tokio::test]
async fn test_failed_pass_keeps_previous_snapshot() {
    let source = Arc::new(ControlledSource::default());
    let session = RiskSession::new(manual_config(), source.clone()).unwrap();

    assert_eq!(
        session.set_portfolio(sample_portfolio()).await,
        RecomputeOutcome::Published(1)
    );
    let before = session.state();

    source.fail.store(true, Ordering::SeqCst);
    let outcome = session.refresh().await;
    assert!(matches!(outcome, RecomputeOutcome::Failed(ref e) if e.contains("AAPL")));

    let after = session.state();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(session.last_error().is_some());
    assert_eq!(session.phase(), Phase::Idle);

    source.fail.store(false, Ordering::SeqCst);
    assert_eq!(session.refresh().await, RecomputeOutcome::Published(2));
    assert!(session.last_error().is_none());
}

#[tokio::test]
async fn test_first_pass_failure_leaves_empty_state() {
    let session = RiskSession::new(
        manual_config(),
        Arc::new(rd_risk::HistoricalReturns::new()),
    )
    .unwrap();

    let outcome = session.set_portfolio(sample_portfolio()).await;
    assert!(matches!(outcome, RecomputeOutcome::Failed(_)));
    assert!(session.state().is_empty());
    assert_eq!(session.state().generation, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_pass_returns_to_idle() {
    let source = Arc::new(ControlledSource::slow(Duration::from_millis(50)));
    let session = RiskSession::new(manual_config(), source).unwrap();

    let result = tokio::time::timeout(
        Duration::from_millis(20),
        session.set_portfolio(sample_portfolio()),
    )
    .await;
    assert!(result.is_err());

    assert_eq!(session.phase(), Phase::Idle);
    assert!(session.state().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_auto_refresh_timer_fires_and_stops() {
    let config = SessionConfig {
        auto_refresh: true,
        ..manual_config()
    };
    let session = RiskSession::with_refresh_interval(
        config,
        Arc::new(SyntheticReturns::default()),
        Duration::from_millis(40),
    )
    .unwrap();

    session.set_portfolio(sample_portfolio()).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(session.state().generation >= 3);

    session.set_auto_refresh(false);
    assert!(!session.auto_refresh());
    wait_for_phase(&session, Phase::Idle).await;
    let stopped_at = session.state().generation;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session.state().generation, stopped_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_disabling_auto_refresh_keeps_queued_update() {
    // ~210 ms per pass against a 300 ms timer
    let config = SessionConfig {
        auto_refresh: true,
        ..manual_config()
    };
    let session = RiskSession::with_refresh_interval(
        config,
        Arc::new(ControlledSource::slow(Duration::from_millis(35))),
        Duration::from_millis(300),
    )
    .unwrap();

    assert_eq!(
        session.set_portfolio(sample_portfolio()).await,
        RecomputeOutcome::Published(1)
    );
    // Next pass comes from the timer
    wait_for_phase(&session, Phase::Calculating).await;

    assert_eq!(
        session.update_prices(HashMap::from([("AAPL".to_string(), 300.0)])).await,
        RecomputeOutcome::Queued
    );
    session.set_auto_refresh(false);

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(session.phase(), Phase::Idle);
    let state = session.state();
    let valued = state.portfolio.as_ref().unwrap();
    assert_eq!(valued.holding("AAPL").unwrap().current_price, 300.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timer_faster_than_pass_does_not_hold_caller() {
    // ~180 ms per pass against a 100 ms timer
    let config = SessionConfig {
        auto_refresh: true,
        ..manual_config()
    };
    let session = RiskSession::with_refresh_interval(
        config,
        Arc::new(ControlledSource::slow(Duration::from_millis(30))),
        Duration::from_millis(100),
    )
    .unwrap();

    let outcome = tokio::time::timeout(
        Duration::from_secs(3),
        session.set_portfolio(sample_portfolio()),
    )
    .await;
    assert!(matches!(outcome, Ok(RecomputeOutcome::Published(_))));

    // The timer keeps publishing without piling up passes
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(session.state().generation >= 2);

    session.set_auto_refresh(false);
    assert!(!session.auto_refresh());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_clear_portfolio_stops_timer() {
    let config = SessionConfig {
        auto_refresh: true,
        ..manual_config()
    };
    let session = RiskSession::with_refresh_interval(
        config,
        Arc::new(SyntheticReturns::default()),
        Duration::from_millis(30),
    )
    .unwrap();

    session.set_portfolio(sample_portfolio()).await;
    session.clear_portfolio();
    let cleared_at = session.state().generation;

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(session.state().generation, cleared_at);
    assert!(session.state().is_empty());
}

#[tokio::test]
async fn test_alerts_are_deduplicated_across_passes() {
    // Concentration alert fires every pass: MSFT is ~31% of value
    let session = RiskSession::new(manual_config(), Arc::new(SyntheticReturns::default())).unwrap();

    session.set_portfolio(sample_portfolio()).await;
    let first = session.alerts();
    assert!(first.iter().any(|a| a.title() == "Concentration Risk Alert"));

    session.refresh().await;
    session.refresh().await;
    let titles: Vec<String> = session.alerts().iter().map(|a| a.title().to_string()).collect();
    let mut unique = titles.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(titles.len(), unique.len());

    let id = first[0].id;
    session.dismiss_alert(id).unwrap();
    assert!(session.alerts().iter().all(|a| a.id != id));
    assert!(matches!(session.dismiss_alert(id), Err(SessionError::AlertNotFound(_))));

    session.clear_alerts();
    assert!(session.alerts().is_empty());
}

#[tokio::test]
async fn test_stress_and_scenario_slots_are_independent() {
    let session = RiskSession::new(manual_config(), Arc::new(SyntheticReturns::default())).unwrap();
    let portfolio = sample_portfolio();

    let crash = Scenario::new("Crash", "", ScenarioKind::Market { market_shock: -0.3 });
    let stress = session
        .run_stress_tests(&portfolio, Some(vec![crash]))
        .await
        .unwrap();
    assert_eq!(stress.len(), 1);
    assert!((stress["Crash"].loss_percent - 0.30).abs() < 1e-12);

    let analysis = session.run_scenario_analysis(&portfolio, None).await.unwrap();
    assert_eq!(analysis.len(), 6);
    assert_eq!(session.stress_results().len(), 1);
    assert_eq!(session.scenario_results().len(), 6);

    let summary = session.stress_summary().unwrap();
    assert_eq!(summary.worst_scenario, "Crash");
}

#[tokio::test]
async fn test_stress_uses_session_live_prices() {
    let session = RiskSession::new(manual_config(), Arc::new(SyntheticReturns::default())).unwrap();
    let portfolio = sample_portfolio();
    session
        .recompute_metrics(
            portfolio.clone(),
            HashMap::from([("AAPL".to_string(), 300.0)]),
        )
        .await;

    let results = session.run_stress_tests(&portfolio, None).await.unwrap();
    let crash = &results["Market Crash (-30%)"];
    let aapl = crash.holdings.iter().find(|h| h.symbol == "AAPL").unwrap();
    assert_eq!(aapl.original_price, 300.0);
}

#[tokio::test]
async fn test_empty_portfolio_is_rejected_for_stress() {
    let session = RiskSession::new(manual_config(), Arc::new(SyntheticReturns::default())).unwrap();
    let empty = Portfolio::new("Empty", vec![]).unwrap();

    let result = session.run_stress_tests(&empty, None).await;
    assert!(matches!(result, Err(SessionError::Risk(RiskError::EmptyPortfolio))));
}

#[tokio::test]
async fn test_custom_scenarios_join_the_library() {
    let session = RiskSession::new(manual_config(), Arc::new(SyntheticReturns::default())).unwrap();
    let portfolio = sample_portfolio();

    let oil = Scenario::new(
        "Oil Shock",
        "Energy rally, broad sell-off",
        ScenarioKind::Custom {
            symbol_shocks: [("XOM".to_string(), 0.15)].into_iter().collect(),
            sector_shocks: Default::default(),
            market_shock: Some(-0.05),
            volatility_shock: None,
        },
    );
    let id = session.add_custom_scenario(oil);
    assert_eq!(session.scenarios().len(), 7);

    let analysis = session.run_scenario_analysis(&portfolio, None).await.unwrap();
    assert!(analysis.contains_key("Oil Shock"));

    session.remove_custom_scenario(id).unwrap();
    assert_eq!(session.scenarios().len(), 6);
    assert!(matches!(
        session.remove_custom_scenario(id),
        Err(SessionError::ScenarioNotFound(_))
    ));
}

#[tokio::test]
async fn test_session_config_from_yaml() {
    let yaml = r#"
refresh_interval_secs: 5
auto_refresh: false
seed: 3
advisory:
  rules:
    - type: PositionConcentration
      max_weight: 0.10
  alerts: []
"#;
    let config = SessionConfig::from_yaml(yaml).unwrap();
    let session = RiskSession::new(config, Arc::new(SyntheticReturns::default())).unwrap();

    session.set_portfolio(sample_portfolio()).await;
    let state = session.state();
    assert_eq!(state.insights.concentration.len(), 1);
    assert!(state.insights.risk.is_empty());
    assert!(session.alerts().is_empty());
}
