use crossbeam_channel::{unbounded, Receiver, Sender};
use nalgebra::Vector3;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::ConfigPatch;
use crate::environment::EffectKind;
use crate::simulation::engine::{SimulationEngine, TickOutcome};
use crate::utils::errors::SimError;
use crate::vehicles::drone::ControlAction;

/// Requests applied at the next tick boundary, in arrival order
#[derive(Debug, Clone)]
pub enum EngineCommand {
    SetAction(ControlAction),
    SetManualControl(bool),
    ToggleHeightLock,
    SetTargetAltitude(f64),
    EmergencyLand,
    ApplyEffect {
        position: Vector3<f64>,
        kind: EffectKind,
        intensity: f64,
    },
    UpdateConfig(ConfigPatch),
    InjectFaults(u32),
    Start,
    Pause,
    Resume,
    Stop,
    Reset,
    Shutdown,
}

/// Cloneable, thread-safe control surface for a running [`SimulationRunner`]
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn send(&self, command: EngineCommand) -> Result<(), SimError> {
        self.sender.send(command).map_err(|_| SimError::RunnerClosed)
    }

    pub fn set_action(&self, action: ControlAction) -> Result<(), SimError> {
        self.send(EngineCommand::SetAction(action))
    }

    pub fn set_manual_control(&self, enabled: bool) -> Result<(), SimError> {
        self.send(EngineCommand::SetManualControl(enabled))
    }

    pub fn toggle_height_lock(&self) -> Result<(), SimError> {
        self.send(EngineCommand::ToggleHeightLock)
    }

    pub fn set_target_altitude(&self, altitude: f64) -> Result<(), SimError> {
        self.send(EngineCommand::SetTargetAltitude(altitude))
    }

    pub fn emergency_land(&self) -> Result<(), SimError> {
        self.send(EngineCommand::EmergencyLand)
    }

    pub fn apply_effect(&self, position: Vector3<f64>, kind: EffectKind, intensity: f64) -> Result<(), SimError> {
        self.send(EngineCommand::ApplyEffect {
            position,
            kind,
            intensity,
        })
    }

    pub fn update_config(&self, patch: ConfigPatch) -> Result<(), SimError> {
        self.send(EngineCommand::UpdateConfig(patch))
    }

    pub fn start(&self) -> Result<(), SimError> {
        self.send(EngineCommand::Start)
    }

    pub fn pause(&self) -> Result<(), SimError> {
        self.send(EngineCommand::Pause)
    }

    pub fn resume(&self) -> Result<(), SimError> {
        self.send(EngineCommand::Resume)
    }

    pub fn stop(&self) -> Result<(), SimError> {
        self.send(EngineCommand::Stop)
    }

    pub fn reset(&self) -> Result<(), SimError> {
        self.send(EngineCommand::Reset)
    }

    pub fn shutdown(&self) -> Result<(), SimError> {
        self.send(EngineCommand::Shutdown)
    }
}

/// Fixed-rate driver for a [`SimulationEngine`].
///
/// Ticks every `1000 / max_fps` ms on the calling thread. Commands sent
/// through an [`EngineHandle`] are drained before each tick.
pub struct SimulationRunner {
    engine: SimulationEngine,
    commands: Receiver<EngineCommand>,
    sender: Sender<EngineCommand>,
    shutdown: bool,
}

impl SimulationRunner {
    pub fn new(engine: SimulationEngine) -> Self {
        let (sender, commands) = unbounded();
        Self {
            engine,
            commands,
            sender,
            shutdown: false,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            sender: self.sender.clone(),
        }
    }

    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SimulationEngine {
        &mut self.engine
    }

    pub fn into_engine(self) -> SimulationEngine {
        self.engine
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Apply every queued command. Returns the number applied.
    pub fn drain_commands(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
            applied += 1;
            if self.shutdown {
                break;
            }
        }
        applied
    }

    fn apply(&mut self, command: EngineCommand) {
        debug!(?command, "applying engine command");
        let engine = &mut self.engine;
        let result = match command {
            EngineCommand::SetAction(action) => {
                engine.set_drone_action(action);
                Ok(())
            }
            EngineCommand::SetManualControl(enabled) => {
                engine.set_manual_control(enabled);
                Ok(())
            }
            EngineCommand::ToggleHeightLock => {
                engine.toggle_height_lock();
                Ok(())
            }
            EngineCommand::SetTargetAltitude(altitude) => {
                engine.set_target_altitude(altitude);
                Ok(())
            }
            EngineCommand::EmergencyLand => {
                engine.emergency_land();
                Ok(())
            }
            EngineCommand::ApplyEffect {
                position,
                kind,
                intensity,
            } => {
                engine.apply_environmental_effect(&position, kind, intensity);
                Ok(())
            }
            EngineCommand::UpdateConfig(patch) => engine.update_config(&patch),
            EngineCommand::InjectFaults(count) => {
                engine.inject_faults(count);
                Ok(())
            }
            EngineCommand::Start => {
                engine.start();
                Ok(())
            }
            EngineCommand::Pause => {
                engine.pause();
                Ok(())
            }
            EngineCommand::Resume => {
                engine.resume();
                Ok(())
            }
            EngineCommand::Stop => {
                engine.stop();
                Ok(())
            }
            EngineCommand::Reset => engine.reset(),
            EngineCommand::Shutdown => {
                self.shutdown = true;
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "engine command failed");
        }
    }

    /// Drain commands then run a single tick.
    pub fn run_once(&mut self) -> TickOutcome {
        self.drain_commands();
        if self.shutdown {
            return TickOutcome::Skipped;
        }
        self.engine.tick()
    }

    /// Tick at the configured rate until shut down or `limit` elapses.
    /// Returns the number of completed ticks.
    pub fn run(&mut self, limit: Option<Duration>) -> u64 {
        let started = Instant::now();
        let mut next = started;
        let mut completed = 0u64;
        info!(max_fps = self.engine.config().engine.max_fps, "runner started");

        while !self.shutdown {
            if limit.is_some_and(|limit| started.elapsed() >= limit) {
                break;
            }
            if self.run_once().is_completed() {
                completed += 1;
            }

            // Re-read every tick so config updates take effect
            let interval = Duration::from_secs_f64(self.engine.config().engine.tick_interval_ms() / 1000.0);
            next += interval;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                // Fell behind; don't try to catch up
                next = now;
            }
        }
        info!(completed, "runner finished");
        completed
    }
}
