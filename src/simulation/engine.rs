use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigPatch, SimulationConfig};
use crate::environment::{EffectKind, Environment};
use crate::physics::PhysicsWorld;
use crate::rendering::{CameraFrame, CameraRenderer};
use crate::server::{BackendBridge, BridgeError, MessageType, ToObservation};
use crate::simulation::events::{EventBus, SimulationEvent, SubscriptionId};
use crate::simulation::metrics::{PerformanceTracker, Phase};
use crate::simulation::reward::{RewardSignal, RewardTracker};
use crate::simulation::snapshot::SimulationSnapshot;
use crate::utils::errors::SimError;
use crate::utils::rng::RngManager;
use crate::vehicles::drone::{ControlAction, DroneController, FlightMode};

/// Lifecycle state of a [`SimulationEngine`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    #[default]
    Uninitialized,
    Stopped,
    Running,
    Paused,
    Destroyed,
}

impl EngineStatus {
    /// Started and not stopped; paused counts as running
    pub fn is_running(&self) -> bool {
        matches!(self, EngineStatus::Running | EngineStatus::Paused)
    }
}

/// Result of one call to [`SimulationEngine::tick`]
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// Engine not running, or paused
    Skipped,
    Completed(Arc<SimulationSnapshot>),
    Failed { consecutive: u32 },
    /// Too many consecutive failures; the world was rebuilt
    Recovered { errors: u32 },
}

impl TickOutcome {
    pub fn snapshot(&self) -> Option<&Arc<SimulationSnapshot>> {
        match self {
            TickOutcome::Completed(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TickOutcome::Completed(_))
    }
}

struct Components {
    world: PhysicsWorld,
    drone: DroneController,
    environment: Environment,
    camera: CameraRenderer,
}

/// Owns the physics world, drone, field and camera and advances them one
/// tick at a time.
///
/// Single-threaded: the host calls [`SimulationEngine::tick`] on its own
/// schedule (see [`crate::simulation::SimulationRunner`]). Lifecycle calls
/// made in the wrong state are ignored.
pub struct SimulationEngine {
    config: Arc<SimulationConfig>,
    rngs: RngManager,
    status: EngineStatus,
    components: Option<Components>,
    step: u64,
    sim_time: f64,
    manual_control: bool,
    action: ControlAction,
    performance: PerformanceTracker,
    reward: RewardTracker,
    last_reward: RewardSignal,
    last_frame: Option<Arc<CameraFrame>>,
    events: EventBus,
    bridge: Option<BackendBridge>,
    pending_faults: u32,
}

impl SimulationEngine {
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;
        let rngs = RngManager::from_optional(config.engine.seed);
        info!(seed = rngs.master_seed(), "simulation engine created");
        Ok(Self {
            rngs,
            status: EngineStatus::Uninitialized,
            components: None,
            step: 0,
            sim_time: 0.0,
            manual_control: config.engine.manual_control,
            action: ControlAction::default(),
            performance: PerformanceTracker::new(),
            reward: RewardTracker::new(config.engine.max_episode_steps),
            last_reward: RewardSignal::default(),
            last_frame: None,
            events: EventBus::new(),
            bridge: None,
            pending_faults: 0,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> Arc<SimulationConfig> {
        Arc::clone(&self.config)
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.status == EngineStatus::Paused
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    pub fn seed(&self) -> u64 {
        self.rngs.master_seed()
    }

    pub fn manual_control(&self) -> bool {
        self.manual_control
    }

    pub fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    pub fn last_frame(&self) -> Option<Arc<CameraFrame>> {
        self.last_frame.clone()
    }

    pub fn drone(&self) -> Option<&DroneController> {
        self.components.as_ref().map(|c| &c.drone)
    }

    pub fn environment(&self) -> Option<&Environment> {
        self.components.as_ref().map(|c| &c.environment)
    }

    pub fn world(&self) -> Option<&PhysicsWorld> {
        self.components.as_ref().map(|c| &c.world)
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&SimulationEvent) + Send + 'static,
    {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Replace the backend bridge; the previous one is closed.
    pub fn attach_bridge(&mut self, bridge: BackendBridge) {
        info!(session = %bridge.session(), "backend bridge attached");
        if let Some(mut old) = self.bridge.replace(bridge) {
            old.close();
        }
    }

    pub fn bridge(&self) -> Option<&BackendBridge> {
        self.bridge.as_ref()
    }

    fn build_components(&self) -> Result<Components, SimError> {
        let config = &self.config;
        let mut world = PhysicsWorld::new(config.physics.clone());
        world.initialize()?;
        let mut drone = DroneController::new(config.drone.clone())?;
        drone.spawn(&mut world)?;
        let environment = Environment::new(config.environment.clone(), &self.rngs)?;
        let camera = CameraRenderer::new(config.camera.clone(), &self.rngs)?;
        Ok(Components {
            world,
            drone,
            environment,
            camera,
        })
    }

    fn set_status(&mut self, status: EngineStatus) {
        if self.status != status {
            info!(from = ?self.status, to = ?status, "engine status changed");
            self.status = status;
            self.events.emit(SimulationEvent::StatusChanged(status));
        }
    }

    /// Build every component. Failures here are returned to the caller.
    pub fn initialize(&mut self) -> Result<(), SimError> {
        if !matches!(self.status, EngineStatus::Uninitialized | EngineStatus::Destroyed) {
            debug!(status = ?self.status, "initialize ignored, already initialized");
            return Ok(());
        }
        self.components = Some(self.build_components()?);
        self.refresh_flight_mode();

        if self.bridge.is_none() && self.config.bridge.address.is_some() {
            match BackendBridge::connect_tcp(&self.config.bridge) {
                Ok(bridge) => self.attach_bridge(bridge),
                Err(e) => warn!(error = %e, "backend bridge unavailable, continuing without it"),
            }
        }
        self.set_status(EngineStatus::Stopped);
        Ok(())
    }

    pub fn start(&mut self) {
        if self.status != EngineStatus::Stopped {
            debug!(status = ?self.status, "start ignored");
            return;
        }
        if let Some(c) = self.components.as_mut() {
            c.drone.arm();
        }
        self.performance.restart_clock();
        self.set_status(EngineStatus::Running);
    }

    pub fn pause(&mut self) {
        if self.status != EngineStatus::Running {
            debug!(status = ?self.status, "pause ignored");
            return;
        }
        self.set_status(EngineStatus::Paused);
    }

    pub fn resume(&mut self) {
        if self.status != EngineStatus::Paused {
            debug!(status = ?self.status, "resume ignored");
            return;
        }
        self.performance.restart_clock();
        self.set_status(EngineStatus::Running);
    }

    pub fn stop(&mut self) {
        if !self.status.is_running() {
            debug!(status = ?self.status, "stop ignored");
            return;
        }
        if let Some(c) = self.components.as_mut() {
            c.drone.disarm();
        }
        self.set_status(EngineStatus::Stopped);
    }

    /// Return to step 0 with a freshly generated world; restarts if the
    /// engine was running (paused or not).
    pub fn reset(&mut self) -> Result<(), SimError> {
        if self.components.is_none() {
            debug!(status = ?self.status, "reset ignored, engine not initialized");
            return Ok(());
        }
        let was_running = self.status.is_running();
        if was_running {
            self.stop();
        }

        self.reset_components()?;
        self.step = 0;
        self.sim_time = 0.0;
        self.action = ControlAction::default();
        self.performance.reset();
        self.reward.reset();
        self.last_reward = RewardSignal::default();
        self.last_frame = None;
        self.pending_faults = 0;
        info!("simulation reset");

        self.forward(MessageType::Reset, serde_json::json!({ "seed": self.rngs.master_seed() }));
        if was_running {
            self.start();
        }
        Ok(())
    }

    fn reset_components(&mut self) -> Result<(), SimError> {
        let c = self
            .components
            .as_mut()
            .ok_or_else(|| SimError::NotInitialized("reset".into()))?;
        c.world.reset();
        c.drone.reset(&mut c.world)?;
        c.environment.reset()?;
        self.refresh_flight_mode();
        Ok(())
    }

    /// Drop every component, subscriber and the bridge. Call
    /// [`SimulationEngine::initialize`] again before reuse.
    pub fn destroy(&mut self) {
        if self.status == EngineStatus::Destroyed {
            return;
        }
        self.set_status(EngineStatus::Destroyed);
        self.components = None;
        self.events.clear();
        if let Some(mut bridge) = self.bridge.take() {
            bridge.close();
        }
        self.step = 0;
        self.sim_time = 0.0;
        self.last_frame = None;
        self.performance.reset();
        self.reward.reset();
    }

    /// Latest command wins; applied at the next tick when in manual control.
    pub fn set_drone_action(&mut self, action: ControlAction) {
        self.action = action.sanitized();
    }

    /// `[thrust, pitch, roll, yaw]`
    pub fn set_drone_action_array(&mut self, action: [f64; 4]) {
        self.set_drone_action(ControlAction::from_array(action));
    }

    pub fn set_manual_control(&mut self, enabled: bool) {
        if self.manual_control != enabled {
            info!(enabled, "manual control changed");
        }
        self.manual_control = enabled;
        self.refresh_flight_mode();
    }

    fn refresh_flight_mode(&mut self) {
        let manual = self.manual_control;
        if let Some(c) = self.components.as_mut() {
            let mode = match (manual, c.drone.state().height_lock) {
                (true, true) => FlightMode::Stabilized,
                (true, false) => FlightMode::Manual,
                (false, _) => FlightMode::Autonomous,
            };
            c.drone.set_flight_mode(mode);
        }
    }

    /// Returns the new lock state, or `None` before initialization.
    pub fn toggle_height_lock(&mut self) -> Option<bool> {
        let locked = self.components.as_mut()?.drone.toggle_height_lock();
        self.refresh_flight_mode();
        Some(locked)
    }

    pub fn set_target_altitude(&mut self, altitude: f64) {
        match self.components.as_mut() {
            Some(c) => c.drone.set_target_altitude(altitude),
            None => debug!("set_target_altitude ignored, engine not initialized"),
        }
    }

    pub fn emergency_land(&mut self) {
        match self.components.as_mut() {
            Some(c) => c.drone.emergency_land(),
            None => debug!("emergency_land ignored, engine not initialized"),
        }
    }

    /// Returns the number of plants affected.
    pub fn apply_environmental_effect(
        &mut self,
        position: &Vector3<f64>,
        kind: EffectKind,
        intensity: f64,
    ) -> usize {
        match self.components.as_mut() {
            Some(c) => c.environment.apply_effect(position, kind, intensity),
            None => {
                debug!("effect ignored, engine not initialized");
                0
            }
        }
    }

    /// Merge `patch` into a new config snapshot and push it to the components.
    pub fn update_config(&mut self, patch: &ConfigPatch) -> Result<(), SimError> {
        let next = patch.apply_to(&self.config)?;
        if let Some(c) = self.components.as_mut() {
            c.world.update_config(next.physics.clone());
            c.drone.update_config(next.drone.clone())?;
            c.environment.update_config(next.environment.clone())?;
            c.camera.update_config(next.camera.clone())?;
        }
        if next.engine.max_episode_steps != self.config.engine.max_episode_steps {
            self.reward = RewardTracker::new(next.engine.max_episode_steps);
        }
        info!(field_regenerated = patch.affects_field(), "configuration updated");
        self.config = Arc::new(next);
        Ok(())
    }

    pub fn update_config_json(&mut self, value: &Value) -> Result<(), SimError> {
        self.update_config(&ConfigPatch::from_json(value)?)
    }

    /// Make the next `count` ticks fail.
    pub fn inject_faults(&mut self, count: u32) {
        warn!(count, "injecting tick faults");
        self.pending_faults += count;
    }

    /// Snapshot of the current state, without advancing.
    pub fn get_state(&self) -> Result<SimulationSnapshot, SimError> {
        let c = self
            .components
            .as_ref()
            .ok_or_else(|| SimError::NotInitialized("get_state".into()))?;
        Ok(self.snapshot_of(c))
    }

    fn snapshot_of(&self, c: &Components) -> SimulationSnapshot {
        let drone = c.drone.state().clone();
        let weather = c.environment.weather().clone();
        SimulationSnapshot {
            status: self.status,
            is_running: self.status.is_running(),
            is_paused: self.is_paused(),
            step: self.step,
            sim_time: self.sim_time,
            fps: self.performance.fps(),
            performance: self.performance.metrics(),
            visible_plants: c.environment.visible_plants(
                &drone.position,
                &drone.rotation,
                self.config.camera.max_render_altitude,
            ),
            plants: c.environment.plants().as_slice().to_vec(),
            weather_condition: weather.condition(),
            insights: weather.insights(),
            weather,
            drone,
            reward: self.last_reward,
        }
    }

    /// Run one tick with wall-clock delta time.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != EngineStatus::Running {
            return TickOutcome::Skipped;
        }
        let dt = self
            .performance
            .measure_delta(self.config.engine.max_delta_time, self.config.physics.timestep);
        self.step_with_dt(dt)
    }

    /// Run one tick with an explicit delta time.
    pub fn step_with_dt(&mut self, dt: f64) -> TickOutcome {
        if self.status != EngineStatus::Running {
            return TickOutcome::Skipped;
        }
        let started = Instant::now();
        match self.run_tick(dt) {
            Ok(snapshot) => {
                self.performance.record_phase(Phase::Tick, started.elapsed());
                TickOutcome::Completed(snapshot)
            }
            Err(e) => self.handle_failure(e),
        }
    }

    fn run_tick(&mut self, dt: f64) -> Result<Arc<SimulationSnapshot>, SimError> {
        if self.pending_faults > 0 {
            self.pending_faults -= 1;
            return Err(SimError::InjectedFault(self.step));
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::VehicleError(format!("invalid tick dt {}", dt)));
        }
        let dt = dt.min(self.config.engine.max_delta_time);
        let manual = self.manual_control;
        let render_due = self.step % self.config.engine.camera_interval == 0;

        let c = self
            .components
            .as_mut()
            .ok_or_else(|| SimError::NotInitialized("tick".into()))?;

        let t = Instant::now();
        c.world.step(dt)?;
        self.performance.record_phase(Phase::Physics, t.elapsed());

        let t = Instant::now();
        let action = if manual {
            self.action
        } else {
            ControlAction::hover(c.drone.hover_thrust(c.world.config().gravity))
        };
        c.drone.set_action(action);
        c.drone.update(&mut c.world, dt)?;
        c.environment.update(dt)?;
        self.performance.record_phase(Phase::Update, t.elapsed());

        let mut fresh_frame = None;
        if render_due {
            let t = Instant::now();
            let state = c.drone.state();
            let frame = c.camera.render(
                self.step,
                &state.position,
                &state.rotation,
                c.environment.plants(),
                c.environment.weather().sunlight,
            )?;
            self.performance.record_phase(Phase::Render, t.elapsed());
            let frame = Arc::new(frame);
            self.last_frame = Some(Arc::clone(&frame));
            fresh_frame = Some(frame);
        }

        self.last_reward = self.reward.evaluate(c.drone.state(), &c.drone.action());
        self.step += 1;
        self.sim_time += dt;
        self.performance.record_tick(dt);
        self.performance.record_success();

        let snapshot = match self.components.as_ref() {
            Some(c) => Arc::new(self.snapshot_of(c)),
            None => return Err(SimError::NotInitialized("tick".into())),
        };

        self.events.emit(SimulationEvent::Update(Arc::clone(&snapshot)));
        if let Some(frame) = fresh_frame {
            self.events.emit(SimulationEvent::CameraFeed(frame));
        }
        if self.step % self.config.engine.observation_interval == 0 {
            self.forward_observation(&snapshot);
        }
        self.drain_backend();
        Ok(snapshot)
    }

    fn handle_failure(&mut self, err: SimError) -> TickOutcome {
        let consecutive = self.performance.record_error();
        error!(error = %err, consecutive, step = self.step, "tick failed");
        if consecutive < self.config.engine.max_consecutive_errors {
            return TickOutcome::Failed { consecutive };
        }
        match self.recover() {
            Ok(()) => TickOutcome::Recovered {
                errors: consecutive,
            },
            Err(e) => {
                error!(error = %e, "recovery failed");
                TickOutcome::Failed { consecutive }
            }
        }
    }

    /// Rebuild physics, drone and field state without touching the step counter.
    fn recover(&mut self) -> Result<(), SimError> {
        let errors = self.performance.consecutive_errors();
        warn!(errors, step = self.step, "too many consecutive tick failures, recovering");
        self.reset_components()?;
        if let Some(c) = self.components.as_mut() {
            if self.status.is_running() {
                c.drone.arm();
            }
        }
        self.pending_faults = 0;
        self.performance.record_recovery();
        self.performance.restart_clock();
        self.events.emit(SimulationEvent::Recovered { errors });
        Ok(())
    }

    fn forward_observation(&mut self, snapshot: &SimulationSnapshot) {
        if self.bridge.is_none() {
            return;
        }
        let observation = snapshot.to_observation(self.last_frame.as_deref());
        match serde_json::to_value(&observation) {
            Ok(data) => self.forward(MessageType::Observation, data),
            Err(e) => warn!(error = %e, "failed to serialize observation"),
        }
    }

    fn forward(&self, kind: MessageType, data: Value) {
        let Some(bridge) = self.bridge.as_ref() else {
            return;
        };
        match bridge.forward(kind, data) {
            Ok(()) | Err(BridgeError::Full) => {}
            Err(e) => warn!(error = %e, ?kind, "backend forward failed"),
        }
    }

    fn drain_backend(&mut self) {
        let Some(bridge) = self.bridge.as_ref() else {
            return;
        };
        for message in bridge.poll_inbound() {
            self.events.emit(SimulationEvent::BackendMessage(message));
        }
    }
}

impl Drop for SimulationEngine {
    fn drop(&mut self) {
        if let Some(mut bridge) = self.bridge.take() {
            bridge.close();
        }
    }
}
