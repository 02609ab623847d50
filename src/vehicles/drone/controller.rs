use nalgebra::{Point3, UnitQuaternion, Vector3};
use tracing::{debug, info, warn};

use crate::config::DroneConfig;
use crate::physics::{BodyId, Material, Pose, Shape, PhysicsWorld, Velocity};
use crate::utils::errors::SimError;
use crate::utils::math::{finite_or, quaternion_to_euler};
use crate::vehicles::drone::controls::{mix_motors, ControlAction, MotorThrusts, MOTOR_COUNT};
use crate::vehicles::drone::pid::AltitudePid;
use crate::vehicles::drone::safety::{SafetyEnvelope, SafetyOverride};
use crate::vehicles::drone::state::{DroneState, FlightMode};
use crate::vehicles::traits::Vehicle;

/// Physics body id of the simulated drone
pub const DRONE_BODY: &str = "drone";

/// Quadrotor flight model driving a single body in a [`PhysicsWorld`].
///
/// Forces computed in [`DroneController::update`] act on the following
/// physics step.
#[derive(Debug, Clone)]
pub struct DroneController {
    config: DroneConfig,
    body: BodyId,
    state: DroneState,
    action: ControlAction,
    target_motors: MotorThrusts,
    pid: AltitudePid,
    envelope: SafetyEnvelope,
    depletion_reported: bool,
}

impl DroneController {
    pub fn new(config: DroneConfig) -> Result<Self, SimError> {
        config.validate()?;
        let state = DroneState::at(config.start_position, config.target_altitude);
        Ok(Self {
            body: BodyId::new(DRONE_BODY),
            pid: AltitudePid::new(config.pid),
            envelope: SafetyEnvelope::new(config.safety),
            state,
            action: ControlAction::default(),
            target_motors: [0.0; MOTOR_COUNT],
            depletion_reported: false,
            config,
        })
    }

    pub fn config(&self) -> &DroneConfig {
        &self.config
    }

    /// Swap in new airframe parameters; flight state is kept.
    pub fn update_config(&mut self, config: DroneConfig) -> Result<(), SimError> {
        config.validate()?;
        self.pid.set_gains(config.pid);
        self.envelope = SafetyEnvelope::new(config.safety);
        self.state.target_altitude = self
            .state
            .target_altitude
            .min(config.safety.soft_ceiling);
        self.config = config;
        Ok(())
    }

    pub fn body(&self) -> &BodyId {
        &self.body
    }

    pub fn state(&self) -> &DroneState {
        &self.state
    }

    pub fn action(&self) -> ControlAction {
        self.action
    }

    /// Latest command wins; inputs are sanitized rather than rejected.
    pub fn set_action(&mut self, action: ControlAction) {
        self.action = action.sanitized();
    }

    pub fn set_flight_mode(&mut self, mode: FlightMode) {
        if self.state.flight_mode != mode {
            debug!(?mode, "flight mode changed");
            self.state.flight_mode = mode;
        }
    }

    pub fn arm(&mut self) {
        self.state.armed = true;
    }

    pub fn disarm(&mut self) {
        self.state.armed = false;
    }

    /// Thrust fraction per motor that balances gravity, clamped to the configured band
    pub fn hover_thrust(&self, gravity: f64) -> f64 {
        let raw = self.config.mass * gravity / (self.config.max_thrust * MOTOR_COUNT as f64);
        finite_or(raw, self.config.hover_thrust_min)
            .clamp(self.config.hover_thrust_min, self.config.hover_thrust_max)
    }

    /// Enabling the lock holds the current altitude.
    pub fn toggle_height_lock(&mut self) -> bool {
        self.state.height_lock = !self.state.height_lock;
        if self.state.height_lock {
            self.state.target_altitude = self.state.position.y.max(0.0);
        }
        self.state.emergency = false;
        self.pid.reset();
        info!(
            enabled = self.state.height_lock,
            target = self.state.target_altitude,
            "height lock toggled"
        );
        self.state.height_lock
    }

    pub fn set_target_altitude(&mut self, altitude: f64) {
        let ceiling = self.config.safety.soft_ceiling;
        self.state.target_altitude = finite_or(altitude, self.state.target_altitude).clamp(0.0, ceiling);
        self.state.emergency = false;
        self.pid.reset();
    }

    /// Descend at minimal thrust regardless of mode until a new target is set.
    pub fn emergency_land(&mut self) {
        warn!(
            altitude = self.state.position.y,
            "emergency landing engaged"
        );
        self.state.emergency = true;
        self.state.target_altitude = self.config.safety.emergency_altitude;
        self.pid.reset();
    }

    fn motor_mounts(&self) -> [Point3<f64>; MOTOR_COUNT] {
        let a = self.config.arm_length / std::f64::consts::SQRT_2;
        [
            Point3::new(-a, 0.0, a),
            Point3::new(a, 0.0, a),
            Point3::new(-a, 0.0, -a),
            Point3::new(a, 0.0, -a),
        ]
    }

    fn sync_from_world(&mut self, world: &PhysicsWorld) -> Result<Pose, SimError> {
        let pose = world.transform(&self.body).ok_or_else(|| {
            SimError::VehicleError(format!("body '{}' is not in the physics world", self.body))
        })?;
        let velocity = world.velocity(&self.body).unwrap_or_default();

        self.state.position = pose.position;
        self.state.rotation = quaternion_to_euler(&pose.rotation);
        self.state.velocity = velocity.linear;
        self.state.angular_velocity = velocity.angular;
        Ok(pose)
    }

    /// Collective thrust and attitude inputs before the safety envelope
    fn command(&mut self, altitude: f64, hover: f64, dt: f64) -> ControlAction {
        if self.state.emergency {
            return ControlAction::hover(self.config.safety.emergency_thrust);
        }
        if self.state.height_lock {
            let correction = self.pid.update(self.state.target_altitude, altitude, dt);
            return ControlAction {
                thrust: (hover + correction).clamp(0.0, 1.0),
                ..self.action
            };
        }
        self.action
    }

    fn apply_motor_forces(&self, world: &mut PhysicsWorld, pose: &Pose) -> Result<(), SimError> {
        let up = pose.up();
        let max_thrust = self.config.max_thrust;
        let mounts = self.motor_mounts();

        for (fraction, mount) in self.state.motor_thrusts.iter().zip(mounts.iter()) {
            let force = up * (fraction * max_thrust);
            world.apply_force(&self.body, force, Some(pose.transform_point(mount)))?;
        }

        let m = &self.state.motor_thrusts;
        let yaw = self.config.yaw_torque_coefficient * max_thrust * ((m[1] + m[2]) - (m[0] + m[3]));
        let angular_drag = -self.state.angular_velocity * self.config.angular_drag;
        world.apply_torque(&self.body, up * yaw + angular_drag)?;

        let drag = -self.state.velocity * self.config.drag_coefficient;
        world.apply_force(&self.body, drag, None)?;
        Ok(())
    }

    fn drain_battery(&mut self, dt: f64) {
        if !self.state.armed {
            return;
        }
        let mean = self.state.motor_thrusts.iter().sum::<f64>() / MOTOR_COUNT as f64;
        let drained = mean * self.config.battery_drain_rate * dt;
        self.state.battery = (self.state.battery - drained.max(0.0)).max(0.0);

        if self.state.is_depleted() && !self.depletion_reported {
            warn!(drone = %self.config.name, "battery depleted, motors shut down");
            self.depletion_reported = true;
        }
    }

    /// Seed motors at hover so the first physics step after spawn holds altitude.
    fn prime(&mut self, world: &mut PhysicsWorld) -> Result<(), SimError> {
        let hover = self.hover_thrust(world.config().gravity);
        self.target_motors = [hover; MOTOR_COUNT];
        self.state.motor_thrusts = [hover; MOTOR_COUNT];
        self.state.commanded_thrust = hover;
        let pose = Pose::new(self.config.start_position, UnitQuaternion::identity());
        self.apply_motor_forces(world, &pose)
    }

    pub fn spawn(&mut self, world: &mut PhysicsWorld) -> Result<(), SimError> {
        let pose = Pose::from_position(self.config.start_position);
        if world.contains(&self.body) {
            world.clear_forces();
            world.set_transform(&self.body, pose)?;
            world.set_velocity(&self.body, Velocity::default())?;
        } else {
            let h = self.config.half_extents;
            world.add_body(
                self.body.clone(),
                Shape::cuboid(h.x, h.y, h.z),
                self.config.mass,
                pose,
                Material::airframe(),
            )?;
        }
        debug!(drone = %self.config.name, position = ?pose.position, "drone spawned");
        self.prime(world)
    }

    /// Restore battery, controller state and the canonical start pose.
    pub fn reset(&mut self, world: &mut PhysicsWorld) -> Result<(), SimError> {
        let mode = self.state.flight_mode;
        self.state = DroneState::at(self.config.start_position, self.config.target_altitude);
        self.state.flight_mode = mode;
        self.action = ControlAction::default();
        self.pid.reset();
        self.depletion_reported = false;
        self.spawn(world)
    }

    /// Read the post-step pose, run the control law and queue forces for the next step.
    pub fn update(&mut self, world: &mut PhysicsWorld, dt: f64) -> Result<(), SimError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::VehicleError(format!("invalid dt {}", dt)));
        }
        let pose = self.sync_from_world(world)?;
        let altitude = pose.position.y - world.config().ground_height;
        let hover = self.hover_thrust(world.config().gravity);

        let command = self.command(altitude, hover, dt);
        let decision = self
            .envelope
            .evaluate(altitude, self.state.velocity.y, command.thrust);

        let rule = match decision.rule {
            SafetyOverride::None if self.state.emergency => SafetyOverride::Emergency,
            rule => rule,
        };
        if rule != self.state.safety {
            debug!(?rule, altitude, "safety override changed");
        }
        self.state.safety = rule;
        self.state.commanded_thrust = decision.thrust;

        self.target_motors = if !self.state.armed || self.state.is_depleted() || decision.rule.is_cut() {
            [0.0; MOTOR_COUNT]
        } else {
            let shaped = ControlAction {
                thrust: decision.thrust,
                ..command
            };
            mix_motors(&shaped, self.config.control_authority)
        };

        let alpha = if self.config.motor_response_time > 0.0 {
            (dt / self.config.motor_response_time).min(1.0)
        } else {
            1.0
        };
        for (current, target) in self.state.motor_thrusts.iter_mut().zip(self.target_motors) {
            *current = (*current + (target - *current) * alpha).clamp(0.0, 1.0);
        }

        self.drain_battery(dt);
        self.apply_motor_forces(world, &pose)
    }

    pub fn target_motors(&self) -> MotorThrusts {
        self.target_motors
    }

    /// Net thrust currently produced by all motors [N]
    pub fn total_thrust(&self) -> f64 {
        self.state.motor_thrusts.iter().sum::<f64>() * self.config.max_thrust
    }

    pub fn body_up(&self) -> Vector3<f64> {
        UnitQuaternion::from_euler_angles(
            self.state.rotation.x,
            self.state.rotation.y,
            self.state.rotation.z,
        ) * Vector3::y()
    }
}

impl Vehicle for DroneController {
    type State = DroneState;
    type Controls = ControlAction;

    fn spawn(&mut self, world: &mut PhysicsWorld) -> Result<(), SimError> {
        DroneController::spawn(self, world)
    }

    fn update(&mut self, world: &mut PhysicsWorld, dt: f64) -> Result<(), SimError> {
        DroneController::update(self, world, dt)
    }

    fn get_state(&self) -> &DroneState {
        &self.state
    }

    fn set_controls(&mut self, controls: ControlAction) {
        self.set_action(controls)
    }

    fn reset(&mut self, world: &mut PhysicsWorld) -> Result<(), SimError> {
        DroneController::reset(self, world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use approx::assert_relative_eq;

    const DT: f64 = 1.0 / 60.0;

    fn setup() -> (PhysicsWorld, DroneController) {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        world.initialize().unwrap();
        let mut drone = DroneController::new(DroneConfig::default()).unwrap();
        drone.spawn(&mut world).unwrap();
        drone.arm();
        (world, drone)
    }

    fn tick(world: &mut PhysicsWorld, drone: &mut DroneController) {
        world.step(DT).unwrap();
        drone.update(world, DT).unwrap();
    }

    #[test]
    fn test_hover_thrust_balances_gravity() {
        let drone = DroneController::new(DroneConfig::default()).unwrap();
        let hover = drone.hover_thrust(9.81);
        assert_relative_eq!(hover * 8.0 * 4.0, 1.5 * 9.81, epsilon = 1e-9);

        // Clamped into the configured band
        assert_eq!(drone.hover_thrust(100.0), 0.8);
        assert_eq!(drone.hover_thrust(0.1), 0.2);
    }

    #[test]
    fn test_primed_spawn_does_not_sink() {
        let (mut world, mut drone) = setup();
        let start = drone.state().position.y;
        let hover = drone.hover_thrust(9.81);
        for _ in 0..30 {
            drone.set_action(ControlAction::hover(hover));
            tick(&mut world, &mut drone);
        }
        assert!((drone.state().position.y - start).abs() < 0.05);
    }

    #[test]
    fn test_full_thrust_climbs() {
        let (mut world, mut drone) = setup();
        drone.set_action(ControlAction::hover(1.0));
        // Motors start at hover, so the first step only spins them up
        tick(&mut world, &mut drone);
        let mut last = drone.state().position.y;
        for _ in 0..60 {
            tick(&mut world, &mut drone);
            let y = drone.state().position.y;
            assert!(y > last);
            last = y;
        }
    }

    #[test]
    fn test_motor_lag_is_first_order() {
        let (mut world, mut drone) = setup();
        let before = drone.state().motor_thrusts[0];
        drone.set_action(ControlAction::hover(1.0));
        tick(&mut world, &mut drone);
        let after = drone.state().motor_thrusts[0];
        let expected = before + (1.0 - before) * (DT / 0.08);
        assert_relative_eq!(after, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_battery_drains_only_while_armed() {
        let (mut world, mut drone) = setup();
        drone.set_action(ControlAction::hover(0.5));
        let mut last = drone.state().battery;
        for _ in 0..20 {
            tick(&mut world, &mut drone);
            assert!(drone.state().battery < last);
            last = drone.state().battery;
        }

        drone.disarm();
        tick(&mut world, &mut drone);
        assert_eq!(drone.state().battery, last);
    }

    #[test]
    fn test_depleted_battery_cuts_motors() {
        let (mut world, mut drone) = setup();
        drone.state.battery = 0.0;
        tick(&mut world, &mut drone);
        assert_eq!(drone.target_motors(), [0.0; 4]);
        assert_eq!(drone.state().battery, 0.0);
    }

    #[test]
    fn test_hard_ceiling_overrides_input() {
        let (mut world, mut drone) = setup();
        world
            .set_transform(drone.body(), Pose::from_position(Vector3::new(0.0, 60.0, 0.0)))
            .unwrap();
        drone.set_action(ControlAction::hover(1.0));
        tick(&mut world, &mut drone);
        assert_eq!(drone.state().commanded_thrust, 0.0);
        assert_eq!(drone.state().safety, SafetyOverride::HardCeiling);
        assert_eq!(drone.target_motors(), [0.0; 4]);
    }

    #[test]
    fn test_height_lock_recovers_target() {
        let (mut world, mut drone) = setup();
        assert!(drone.toggle_height_lock());
        assert_eq!(drone.state().target_altitude, 5.0);
        drone.set_target_altitude(8.0);
        for _ in 0..600 {
            tick(&mut world, &mut drone);
        }
        assert!((drone.state().position.y - 8.0).abs() < 0.5);
    }

    #[test]
    fn test_emergency_land_descends() {
        let (mut world, mut drone) = setup();
        drone.set_action(ControlAction::hover(1.0));
        drone.emergency_land();
        let start = drone.state().position.y;
        for _ in 0..60 {
            tick(&mut world, &mut drone);
        }
        assert!(drone.state().position.y < start);
        assert_eq!(drone.state().safety, SafetyOverride::Emergency);
        assert_eq!(drone.state().target_altitude, 0.5);
    }

    #[test]
    fn test_reset_restores_start() {
        let (mut world, mut drone) = setup();
        drone.set_action(ControlAction::hover(1.0));
        for _ in 0..30 {
            tick(&mut world, &mut drone);
        }
        drone.reset(&mut world).unwrap();
        assert_eq!(drone.state().battery, 100.0);
        assert_eq!(drone.state().position, Vector3::new(0.0, 5.0, 0.0));
        assert_eq!(world.transform(drone.body()).unwrap().position.y, 5.0);
        assert!(!drone.state().armed);
    }

    #[test]
    fn test_missing_body_is_an_error() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        world.initialize().unwrap();
        let mut drone = DroneController::new(DroneConfig::default()).unwrap();
        assert!(matches!(
            drone.update(&mut world, DT),
            Err(SimError::VehicleError(_))
        ));
    }

    #[test]
    fn test_update_config_keeps_state() {
        let (mut world, mut drone) = setup();
        drone.set_target_altitude(30.0);
        for _ in 0..10 {
            tick(&mut world, &mut drone);
        }
        let battery = drone.state().battery;

        let mut config = DroneConfig::default();
        config.safety.soft_ceiling = 20.0;
        config.battery_drain_rate = 1.0;
        drone.update_config(config).unwrap();

        assert_eq!(drone.state().battery, battery);
        assert_eq!(drone.state().target_altitude, 20.0);
        assert_eq!(drone.config().battery_drain_rate, 1.0);

        let mut bad = DroneConfig::default();
        bad.mass = -1.0;
        assert!(drone.update_config(bad).is_err());
    }
}
