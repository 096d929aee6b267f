//! # rd-session: Risk session orchestration
//!
//! Wraps the `rd-risk` analytics in a long-lived, cheaply clonable
//! [`RiskSession`] that owns a portfolio and its live prices, serializes
//! recompute passes, publishes immutable snapshots and keeps an alert book
//! and a scenario library.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use rd_risk::{Holding, Portfolio, SyntheticReturns};
//! use rd_session::{RecomputeOutcome, RiskSession, SessionConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> rd_session::Result<()> {
//! let session = RiskSession::new(SessionConfig::default(), Arc::new(SyntheticReturns::default()))?;
//!
//! let portfolio = Portfolio::new(
//!     "Core",
//!     vec![Holding::new("AAPL", 100.0, 238.99, "Technology")],
//! )?;
//! if let RecomputeOutcome::Published(generation) = session.set_portfolio(portfolio.clone()).await {
//!     println!("snapshot {} ready", generation);
//! }
//!
//! let stress = session.run_stress_tests(&portfolio, None).await?;
//! println!("{} scenarios", stress.len());
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod config;
pub mod error;
mod refresh;
pub mod scenarios;
pub mod session;
pub mod state;

pub use alerts::AlertBook;
pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use scenarios::ScenarioLibrary;
pub use session::RiskSession;
pub use state::{Phase, RecomputeOutcome, RiskState};
