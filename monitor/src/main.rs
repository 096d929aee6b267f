use anyhow::Result;
use clap::Parser;
use rd_risk::{InsightBundle, RiskMetrics, ShockResult};
use rd_session::{RecomputeOutcome, RiskSession};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};

mod config;

use config::Config;

#[derive(Parser, Debug)]
#[clap(name = "riskdeck", about = "Portfolio risk monitor")]
struct Args {
    #[clap(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    info!("Loading configuration from {:?}", args.config);
    let config = Config::load(&args.config)?;

    info!("Loading portfolio from {:?}", config.portfolio_file);
    let portfolio = config.portfolio()?;
    info!(
        "Portfolio '{}': {} holdings, entry value {:.2}",
        portfolio.name,
        portfolio.len(),
        portfolio.total_value()
    );

    let session = RiskSession::new(config.session.clone(), Arc::new(config.return_source()))?;
    for scenario in config.custom_scenarios()? {
        session.add_custom_scenario(scenario);
    }
    info!("{} scenarios loaded", session.scenarios().len());

    match session
        .recompute_metrics(portfolio.clone(), config.prices.clone())
        .await
    {
        RecomputeOutcome::Published(_) => {}
        RecomputeOutcome::Failed(e) => anyhow::bail!("Initial risk pass failed: {}", e),
        other => warn!("Initial risk pass: {:?}", other),
    }

    let state = session.state();
    if let Some(metrics) = &state.metrics {
        log_metrics(metrics);
    }
    log_insights(&state.insights);

    let stress = session.run_stress_tests(&portfolio, None).await?;
    log_results("Stress test", stress.values());
    match session.stress_summary() {
        Ok(summary) => info!(
            "Worst scenario: {} ({:.2}), best: {} ({:.2}), average loss {:.2}",
            summary.worst_scenario,
            summary.max_loss,
            summary.best_scenario,
            summary.min_loss,
            summary.average_loss
        ),
        Err(e) => warn!("No stress summary: {}", e),
    }

    let analysis = session.run_scenario_analysis(&portfolio, None).await?;
    log_results("Scenario", analysis.values());

    // Report new snapshots until Ctrl-C or the configured run time elapses
    let run_for = config.run_for_secs.map(Duration::from_secs);
    let deadline = async {
        match run_for {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut ticker = interval(Duration::from_secs(1));
    let mut last_generation = state.generation;
    let mut last_alerts = session.alerts().len();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let state = session.state();
                if state.generation != last_generation {
                    last_generation = state.generation;
                    if let Some(metrics) = &state.metrics {
                        info!(
                            "Snapshot #{}: VaR95 {:.2}% | Sharpe {:.2} | vol {:.1}%",
                            state.generation,
                            metrics.var95.abs() * 100.0,
                            metrics.sharpe_ratio,
                            metrics.volatility * 100.0
                        );
                    }
                }
                if let Some(e) = session.last_error() {
                    error!("Last recompute failed: {}", e);
                }

                let alerts = session.alerts();
                for alert in alerts.iter().skip(last_alerts) {
                    warn!("ALERT [{:?}] {}: {}", alert.insight.severity, alert.title(), alert.insight.message);
                }
                last_alerts = alerts.len();
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received");
                break;
            }
            _ = &mut deadline => {
                info!("Run time elapsed");
                break;
            }
        }
    }

    session.set_auto_refresh(false);
    info!("Shutting down");
    Ok(())
}

fn log_metrics(metrics: &RiskMetrics) {
    info!(
        "Value {:.2} (P&L {:+.2}, {:+.2}%)",
        metrics.current_value,
        metrics.total_pnl,
        metrics.total_pnl_percent * 100.0
    );
    info!(
        "VaR95 {:.2}% | VaR99 {:.2}% | CVaR95 {:.2}%",
        metrics.var95.abs() * 100.0,
        metrics.var99.abs() * 100.0,
        metrics.cvar95.abs() * 100.0
    );
    info!(
        "Sharpe {:.2} | Sortino {:.2} | beta {:.2} | delta {:.2}",
        metrics.sharpe_ratio, metrics.sortino_ratio, metrics.beta, metrics.delta
    );
    info!(
        "Max drawdown {:.2}% | volatility {:.1}% (forecast {:.1}%)",
        metrics.max_drawdown.value * 100.0,
        metrics.volatility * 100.0,
        metrics.forecast_volatility * 100.0
    );
    for (sector, weight) in &metrics.sector_allocation {
        info!("  {:<24} {:>6.1}%", sector.name(), weight * 100.0);
    }
}

fn log_insights(bundle: &InsightBundle) {
    for insight in bundle.prioritized() {
        info!(
            "[{:?}/{:?}] {}: {}",
            insight.priority, insight.severity, insight.title, insight.message
        );
        for suggestion in &insight.suggestions {
            info!("    - {}", suggestion);
        }
    }
}

fn log_results<'a>(label: &str, results: impl Iterator<Item = &'a ShockResult>) {
    for result in results {
        info!(
            "{} '{}': loss {:.2} ({:+.2}%)",
            label,
            result.scenario_name,
            result.loss,
            -result.loss_percent * 100.0
        );
    }
}
