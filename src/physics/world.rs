use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::PhysicsConfig;
use crate::physics::engine::NalgebraEngine;
use crate::physics::error::PhysicsError;
use crate::physics::shapes::{Material, Shape};
use crate::physics::traits::{
    ordered_pair, BodyDesc, BodyId, ContactEvent, Pose, RigidBodyEngine, Velocity,
};

pub type CollisionCallback = Box<dyn FnMut(&ContactEvent) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollisionHandlerId(u64);

/// Deterministic wrapper over a [`RigidBodyEngine`].
///
/// Until [`PhysicsWorld::initialize`] runs, mutating calls log a warning and
/// do nothing, and queries return nothing.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    engine: Option<Box<dyn RigidBodyEngine>>,
    handlers: BTreeMap<(BodyId, BodyId), Vec<(CollisionHandlerId, CollisionCallback)>>,
    next_handler: u64,
    step_count: u64,
    elapsed: f64,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            engine: None,
            handlers: BTreeMap::new(),
            next_handler: 0,
            step_count: 0,
            elapsed: 0.0,
        }
    }

    /// Create the default nalgebra-backed engine.
    pub fn initialize(&mut self) -> Result<(), PhysicsError> {
        self.config
            .validate()
            .map_err(|e| PhysicsError::InvalidParameter(e.to_string()))?;
        self.engine = Some(Box::new(NalgebraEngine::new(&self.config)));
        self.step_count = 0;
        self.elapsed = 0.0;
        debug!(
            timestep = self.config.timestep,
            max_substeps = self.config.max_substeps,
            "physics world initialized"
        );
        Ok(())
    }

    /// Initialize with a caller-supplied backend.
    pub fn initialize_with(&mut self, mut engine: Box<dyn RigidBodyEngine>) {
        engine.set_gravity(self.config.gravity_vector());
        self.engine = Some(engine);
        self.step_count = 0;
        self.elapsed = 0.0;
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Simulated time advanced since initialization [s]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    fn engine_mut(&mut self, operation: &str) -> Option<&mut Box<dyn RigidBodyEngine>> {
        if self.engine.is_none() {
            warn!(operation, "physics world not initialized, ignoring call");
        }
        self.engine.as_mut()
    }

    pub fn add_body(
        &mut self,
        id: impl Into<BodyId>,
        shape: Shape,
        mass: f64,
        pose: Pose,
        material: Material,
    ) -> Result<(), PhysicsError> {
        self.add_body_desc(id.into(), BodyDesc::dynamic(shape, mass, pose, material))
    }

    pub fn add_body_desc(&mut self, id: BodyId, desc: BodyDesc) -> Result<(), PhysicsError> {
        let Some(engine) = self.engine_mut("add_body") else {
            return Ok(());
        };
        if engine.contains(&id) {
            warn!(body = %id, "rejecting duplicate body id");
            return Err(PhysicsError::DuplicateBody(id));
        }
        engine.add_body(id, desc)
    }

    pub fn remove_body(&mut self, id: &BodyId) -> Result<(), PhysicsError> {
        let Some(engine) = self.engine_mut("remove_body") else {
            return Ok(());
        };
        engine.remove_body(id)
    }

    /// Advance by exactly `dt` using at most `max_substeps` equal sub-steps.
    ///
    /// Returns the number of sub-steps taken. Collision handlers fire after
    /// each sub-step, in body-pair order.
    pub fn step(&mut self, dt: f64) -> Result<u32, PhysicsError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(PhysicsError::InvalidParameter(format!(
                "step dt must be positive, got {}",
                dt
            )));
        }
        let substeps = self.substeps_for(dt);
        let sub_dt = dt / substeps as f64;

        let Some(engine) = self.engine.as_mut() else {
            warn!(operation = "step", "physics world not initialized, ignoring call");
            return Ok(0);
        };

        for _ in 0..substeps {
            let contacts = engine.step(sub_dt)?;
            for contact in &contacts {
                if let Some(callbacks) = self.handlers.get_mut(&contact.pair()) {
                    for (_, callback) in callbacks.iter_mut() {
                        callback(contact);
                    }
                }
            }
        }
        engine.clear_forces();

        self.step_count += 1;
        self.elapsed += dt;
        Ok(substeps)
    }

    /// Sub-step count for a frame of length `dt`
    pub fn substeps_for(&self, dt: f64) -> u32 {
        let wanted = (dt / self.config.timestep).ceil();
        (wanted as u32).clamp(1, self.config.max_substeps.max(1))
    }

    pub fn apply_force(
        &mut self,
        id: &BodyId,
        force: Vector3<f64>,
        point: Option<Point3<f64>>,
    ) -> Result<(), PhysicsError> {
        match self.engine_mut("apply_force") {
            Some(engine) => engine.apply_force(id, force, point),
            None => Ok(()),
        }
    }

    pub fn apply_impulse(
        &mut self,
        id: &BodyId,
        impulse: Vector3<f64>,
        point: Option<Point3<f64>>,
    ) -> Result<(), PhysicsError> {
        match self.engine_mut("apply_impulse") {
            Some(engine) => engine.apply_impulse(id, impulse, point),
            None => Ok(()),
        }
    }

    pub fn apply_torque(&mut self, id: &BodyId, torque: Vector3<f64>) -> Result<(), PhysicsError> {
        match self.engine_mut("apply_torque") {
            Some(engine) => engine.apply_torque(id, torque),
            None => Ok(()),
        }
    }

    /// Drop forces queued for the next step.
    pub fn clear_forces(&mut self) {
        if let Some(engine) = self.engine_mut("clear_forces") {
            engine.clear_forces();
        }
    }

    pub fn set_transform(&mut self, id: &BodyId, pose: Pose) -> Result<(), PhysicsError> {
        match self.engine_mut("set_transform") {
            Some(engine) => engine.set_transform(id, pose),
            None => Ok(()),
        }
    }

    pub fn set_velocity(&mut self, id: &BodyId, velocity: Velocity) -> Result<(), PhysicsError> {
        match self.engine_mut("set_velocity") {
            Some(engine) => engine.set_velocity(id, velocity),
            None => Ok(()),
        }
    }

    pub fn set_gravity(&mut self, gravity: f64) {
        self.config.gravity = gravity;
        let vector = self.config.gravity_vector();
        if let Some(engine) = self.engine_mut("set_gravity") {
            engine.set_gravity(vector);
        }
    }

    pub fn transform(&self, id: &BodyId) -> Option<Pose> {
        self.engine.as_ref().and_then(|e| e.transform(id))
    }

    pub fn velocity(&self, id: &BodyId) -> Option<Velocity> {
        self.engine.as_ref().and_then(|e| e.velocity(id))
    }

    pub fn contains(&self, id: &BodyId) -> bool {
        self.engine.as_ref().map_or(false, |e| e.contains(id))
    }

    pub fn body_count(&self) -> usize {
        self.engine.as_ref().map_or(0, |e| e.body_count())
    }

    pub fn bodies_in_radius(&self, center: &Point3<f64>, radius: f64) -> Vec<BodyId> {
        self.engine
            .as_ref()
            .map(|e| e.bodies_in_radius(center, radius))
            .unwrap_or_default()
    }

    /// Register a callback for contacts between `a` and `b` (in either order).
    /// Use [`BodyId::ground`] for ground contacts.
    pub fn on_collision(
        &mut self,
        a: &BodyId,
        b: &BodyId,
        callback: impl FnMut(&ContactEvent) + Send + 'static,
    ) -> CollisionHandlerId {
        let id = CollisionHandlerId(self.next_handler);
        self.next_handler += 1;
        self.handlers
            .entry(ordered_pair(a, b))
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    pub fn remove_collision_handler(&mut self, handler: CollisionHandlerId) -> bool {
        let mut removed = false;
        for callbacks in self.handlers.values_mut() {
            let before = callbacks.len();
            callbacks.retain(|(id, _)| *id != handler);
            removed |= callbacks.len() != before;
        }
        self.handlers.retain(|_, callbacks| !callbacks.is_empty());
        removed
    }

    /// Remove every body and restart the clock. Collision handlers are kept.
    pub fn reset(&mut self) {
        if let Some(engine) = self.engine_mut("reset") {
            engine.clear();
        }
        self.step_count = 0;
        self.elapsed = 0.0;
    }

    /// Apply a new physics config; bodies are kept.
    pub fn update_config(&mut self, config: PhysicsConfig) {
        self.config = config;
        if let Some(engine) = self.engine.as_mut() {
            engine.configure(&self.config);
        }
    }

    /// Drop the engine and every handler
    pub fn destroy(&mut self) {
        self.engine = None;
        self.handlers.clear();
    }

    pub fn create_sphere_shape(radius: f64) -> Shape {
        Shape::sphere(radius)
    }

    pub fn create_box_shape(hx: f64, hy: f64, hz: f64) -> Shape {
        Shape::cuboid(hx, hy, hz)
    }

    pub fn create_material(friction: f64, restitution: f64) -> Material {
        Material::new(friction, restitution)
    }
}
