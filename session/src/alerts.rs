//! Alert book with (title, category) deduplication

use rd_risk::Alert;
use tracing::{debug, info};
use uuid::Uuid;

/// Raised alerts, oldest first
#[derive(Debug, Clone, Default)]
pub struct AlertBook {
    alerts: Vec<Alert>,
}

impl AlertBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert new alerts, skipping any that duplicate an alert already held
    ///
    /// Returns the number actually added.
    pub fn insert_all(&mut self, incoming: impl IntoIterator<Item = Alert>) -> usize {
        let mut added = 0;
        for alert in incoming {
            if self.alerts.iter().any(|existing| existing.same_as(&alert)) {
                debug!(title = %alert.title(), "Duplicate alert suppressed");
                continue;
            }
            info!(
                id = %alert.id,
                title = %alert.title(),
                severity = ?alert.insight.severity,
                "Alert raised"
            );
            self.alerts.push(alert);
            added += 1;
        }
        added
    }

    /// Remove one alert by id
    pub fn dismiss(&mut self, id: Uuid) -> Option<Alert> {
        let index = self.alerts.iter().position(|a| a.id == id)?;
        Some(self.alerts.remove(index))
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
