//! # Advisory rules
//!
//! Threshold rules over a [`RiskMetrics`](crate::RiskMetrics) snapshot,
//! producing categorized insights and a narrower set of alerts.
//!
//! ## Modules
//!
//! - `rules`: serde-tagged rule configuration and stock thresholds
//! - `insight`: insight, alert and bundle types
//! - `rebalance`: risk-scaled target weights and drift detection
//! - `engine`: rule evaluation

mod engine;
mod insight;
mod rebalance;
mod rules;

pub use engine::AdvisoryEngine;
pub use insight::{Alert, Insight, InsightBundle, InsightCategory, Priority, Severity};
pub use rebalance::{target_weights, weight_drift, WeightDrift};
pub use rules::{ideal_sector_targets, AdvisoryConfig, AdvisoryRule, AlertRule};
