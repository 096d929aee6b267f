//! Published session snapshot and recompute bookkeeping

use chrono::{DateTime, Utc};
use rd_risk::{CorrelationMatrix, InsightBundle, Portfolio, RiskMetrics};
use serde::Serialize;

/// Calculation phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Calculating,
}

/// What a recompute request led to
#[derive(Debug, Clone, PartialEq)]
pub enum RecomputeOutcome {
    /// A new snapshot was published with this generation
    Published(u64),
    /// The last pass failed; the previous snapshot was kept
    Failed(String),
    /// Another pass was running; one follow-up pass is scheduled
    Queued,
    /// Nothing to compute
    NoPortfolio,
}

/// Immutable result of the last successful pass
///
/// Replaced wholesale on publish, never edited in place.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RiskState {
    /// Portfolio valued at the live prices the pass used
    pub portfolio: Option<Portfolio>,
    pub metrics: Option<RiskMetrics>,
    pub correlation: Option<CorrelationMatrix>,
    pub insights: InsightBundle,
    pub last_calculation: Option<DateTime<Utc>>,
    /// Count of snapshots published since the session started
    pub generation: u64,
}

impl RiskState {
    pub fn is_empty(&self) -> bool {
        self.metrics.is_none()
    }
}
