//! Stress and scenario engine

pub mod engine;
pub mod scenario;

pub use engine::{HoldingImpact, ShockResult, StressTestEngine, StressTestReport};
pub use scenario::{predefined_scenarios, Scenario, ScenarioKind};
