//! Scenario library: predefined scenarios plus user-added ones

use crate::error::{Result, SessionError};
use indexmap::IndexMap;
use rd_risk::{Scenario, StressTestEngine};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ScenarioLibrary {
    /// Loaded with the predefined scenarios
    predefined: StressTestEngine,
    custom: IndexMap<Uuid, Scenario>,
}

impl Default for ScenarioLibrary {
    fn default() -> Self {
        Self {
            predefined: StressTestEngine::with_predefined_scenarios(),
            custom: IndexMap::new(),
        }
    }
}

impl ScenarioLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom scenario and return its id
    pub fn add(&mut self, scenario: Scenario) -> Uuid {
        let id = Uuid::new_v4();
        info!(%id, name = %scenario.name, kind = scenario.kind.label(), "Custom scenario added");
        self.custom.insert(id, scenario);
        id
    }

    /// Remove a custom scenario; predefined scenarios cannot be removed
    pub fn remove(&mut self, id: Uuid) -> Result<Scenario> {
        let scenario = self
            .custom
            .shift_remove(&id)
            .ok_or(SessionError::ScenarioNotFound(id))?;
        info!(%id, name = %scenario.name, "Custom scenario removed");
        Ok(scenario)
    }

    pub fn custom(&self) -> impl Iterator<Item = (&Uuid, &Scenario)> {
        self.custom.iter()
    }

    /// Predefined scenarios followed by custom ones in insertion order
    pub fn all(&self) -> Vec<Scenario> {
        self.predefined
            .scenarios()
            .iter()
            .chain(self.custom.values())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.predefined.scenarios().len() + self.custom.len()
    }

    /// Stress engine loaded with every scenario in the library
    pub fn engine(&self) -> StressTestEngine {
        let mut engine = self.predefined.clone();
        for scenario in self.custom.values() {
            engine.add_scenario(scenario.clone());
        }
        engine
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
