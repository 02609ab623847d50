use std::sync::Arc;

use agriflyer::config::SimulationConfig;
use agriflyer::{ControlAction, SimulationEngine, SimulationSnapshot, TickOutcome};

use crate::common::{create_fast_config, DT};

pub struct TestEngineBuilder {
    config: SimulationConfig,
    manual: bool,
    start: bool,
}

impl TestEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: create_fast_config(),
            manual: false,
            start: true,
        }
    }

    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_manual_control(mut self) -> Self {
        self.manual = true;
        self
    }

    pub fn stopped(mut self) -> Self {
        self.start = false;
        self
    }

    pub fn build(self) -> TestEngine {
        let mut engine = SimulationEngine::new(self.config).expect("valid test config");
        engine.initialize().expect("engine initializes");
        engine.set_manual_control(self.manual);
        if self.start {
            engine.start();
        }
        TestEngine { engine }
    }
}

/// Engine wrapper that steps with a fixed dt
pub struct TestEngine {
    pub engine: SimulationEngine,
}

impl TestEngine {
    pub fn step(&mut self) -> TickOutcome {
        self.engine.step_with_dt(DT)
    }

    /// Run `n` ticks, panicking on any failure.
    pub fn run_steps(&mut self, n: usize) -> Vec<Arc<SimulationSnapshot>> {
        (0..n)
            .map(|i| match self.step() {
                TickOutcome::Completed(snapshot) => snapshot,
                other => panic!("tick {} did not complete: {:?}", i, other),
            })
            .collect()
    }

    pub fn fly(&mut self, action: ControlAction, n: usize) -> Vec<Arc<SimulationSnapshot>> {
        self.engine.set_drone_action(action);
        self.run_steps(n)
    }

    pub fn state(&self) -> SimulationSnapshot {
        self.engine.get_state().expect("engine initialized")
    }
}
