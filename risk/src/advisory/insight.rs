//! Insight and alert types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightCategory {
    Risk,
    Performance,
    Concentration,
    Allocation,
    Rebalancing,
    Benchmark,
    Forecast,
    Alert,
}

/// Human-readable finding derived from a metrics snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub severity: Severity,
    pub category: InsightCategory,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub actionable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, f64>>,
}

impl Insight {
    /// Informational insight with no suggested action
    pub fn new(
        severity: Severity,
        category: InsightCategory,
        priority: Priority,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            title: title.into(),
            message: message.into(),
            priority,
            actionable: false,
            suggestions: Vec::new(),
            details: None,
        }
    }

    /// Mark actionable with the given suggestions
    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actionable = true;
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_details(mut self, details: BTreeMap<String, f64>) -> Self {
        self.details = Some(details);
        self
    }
}

/// Insight raised by a hard-threshold alert rule
///
/// Two alerts are duplicates when they share title and category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    #[serde(flatten)]
    pub insight: Insight,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(insight: Insight) -> Self {
        Self {
            id: Uuid::new_v4(),
            insight,
            raised_at: Utc::now(),
        }
    }

    pub fn title(&self) -> &str {
        &self.insight.title
    }

    pub fn category(&self) -> InsightCategory {
        self.insight.category
    }

    /// True when `other` would be deduplicated against this alert
    pub fn same_as(&self, other: &Alert) -> bool {
        self.insight.title == other.insight.title && self.insight.category == other.insight.category
    }
}

/// Insights grouped by area
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightBundle {
    pub risk: Vec<Insight>,
    pub concentration: Vec<Insight>,
    pub performance: Vec<Insight>,
    pub allocation: Vec<Insight>,
    pub rebalancing: Vec<Insight>,
    pub benchmark: Vec<Insight>,
    pub forecast: Vec<Insight>,
    pub alerts: Vec<Alert>,
}

impl InsightBundle {
    /// File an insight under its category
    pub fn push(&mut self, insight: Insight) {
        let bucket = match insight.category {
            InsightCategory::Risk | InsightCategory::Alert => &mut self.risk,
            InsightCategory::Concentration => &mut self.concentration,
            InsightCategory::Performance => &mut self.performance,
            InsightCategory::Allocation => &mut self.allocation,
            InsightCategory::Rebalancing => &mut self.rebalancing,
            InsightCategory::Benchmark => &mut self.benchmark,
            InsightCategory::Forecast => &mut self.forecast,
        };
        bucket.push(insight);
    }

    /// All non-alert insights, highest priority first
    pub fn prioritized(&self) -> Vec<&Insight> {
        let mut all: Vec<&Insight> = self
            .risk
            .iter()
            .chain(&self.concentration)
            .chain(&self.performance)
            .chain(&self.allocation)
            .chain(&self.rebalancing)
            .chain(&self.benchmark)
            .chain(&self.forecast)
            .collect();
        all.sort_by(|a, b| b.priority.cmp(&a.priority));
        all
    }

    /// Number of non-alert insights
    pub fn len(&self) -> usize {
        self.risk.len()
            + self.concentration.len()
            + self.performance.len()
            + self.allocation.len()
            + self.rebalancing.len()
            + self.benchmark.len()
            + self.forecast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.alerts.is_empty()
    }
}
