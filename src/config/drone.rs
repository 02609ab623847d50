use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::{ensure_non_negative, ensure_positive, ensure_unit_interval, ConfigError};

/// Gains for the altitude-hold controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Absolute bound on the accumulated integral term
    pub integral_limit: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.6,
            ki: 0.1,
            kd: 0.35,
            integral_limit: 2.0,
        }
    }
}

/// Thrust override thresholds, evaluated every tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub hard_ceiling: f64,
    pub soft_ceiling: f64,
    pub soft_ceiling_thrust: f64,
    pub ground_clearance: f64,
    pub ground_thrust_floor: f64,
    pub max_climb_rate: f64,
    pub emergency_altitude: f64,
    pub emergency_thrust: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            hard_ceiling: 50.0,
            soft_ceiling: 40.0,
            soft_ceiling_thrust: 0.1,
            ground_clearance: 0.5,
            ground_thrust_floor: 0.3,
            max_climb_rate: 8.0,
            emergency_altitude: 0.5,
            emergency_thrust: 0.35,
        }
    }
}

/// Quadrotor airframe, actuator and battery parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneConfig {
    pub name: String,
    /// Total mass [kg]
    pub mass: f64,
    /// Maximum thrust of a single motor [N]
    pub max_thrust: f64,
    pub motor_count: usize,
    /// Distance from the centre of mass to each motor [m]
    pub arm_length: f64,
    pub half_extents: Vector3<f64>,
    /// Linear drag [N·s/m]
    pub drag_coefficient: f64,
    pub angular_drag: f64,
    pub yaw_torque_coefficient: f64,
    /// Scale applied to pitch/roll/yaw inputs before mixing
    pub control_authority: f64,
    /// First-order motor lag time constant [s]
    pub motor_response_time: f64,
    /// Battery drain at full thrust [%/s]
    pub battery_drain_rate: f64,
    pub hover_thrust_min: f64,
    pub hover_thrust_max: f64,
    pub start_position: Vector3<f64>,
    pub target_altitude: f64,
    pub pid: PidGains,
    pub safety: SafetyConfig,
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            name: "drone_0".to_string(),
            mass: 1.5,
            max_thrust: 8.0,
            motor_count: 4,
            arm_length: 0.25,
            half_extents: Vector3::new(0.25, 0.05, 0.25),
            drag_coefficient: 0.35,
            angular_drag: 0.02,
            yaw_torque_coefficient: 0.05,
            control_authority: 0.25,
            motor_response_time: 0.08,
            battery_drain_rate: 0.5,
            hover_thrust_min: 0.2,
            hover_thrust_max: 0.8,
            start_position: Vector3::new(0.0, 5.0, 0.0),
            target_altitude: 5.0,
            pid: PidGains::default(),
            safety: SafetyConfig::default(),
        }
    }
}

impl DroneConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("drone.mass", self.mass)?;
        ensure_positive("drone.max_thrust", self.max_thrust)?;
        ensure_positive("drone.arm_length", self.arm_length)?;
        ensure_non_negative("drone.drag_coefficient", self.drag_coefficient)?;
        ensure_non_negative("drone.angular_drag", self.angular_drag)?;
        ensure_non_negative("drone.motor_response_time", self.motor_response_time)?;
        ensure_non_negative("drone.battery_drain_rate", self.battery_drain_rate)?;
        ensure_unit_interval("drone.control_authority", self.control_authority)?;
        if self.motor_count != 4 {
            return Err(ConfigError::invalid("drone.motor_count", self.motor_count));
        }
        if self.half_extents.iter().any(|v| v.is_nan() || *v <= 0.0) {
            return Err(ConfigError::invalid(
                "drone.half_extents",
                format!("{:?}", self.half_extents),
            ));
        }
        ensure_unit_interval("drone.hover_thrust_min", self.hover_thrust_min)?;
        ensure_unit_interval("drone.hover_thrust_max", self.hover_thrust_max)?;
        if self.hover_thrust_min > self.hover_thrust_max {
            return Err(ConfigError::ValidationError(format!(
                "hover thrust band [{}, {}] is empty",
                self.hover_thrust_min, self.hover_thrust_max
            )));
        }
        if self.start_position.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::invalid(
                "drone.start_position",
                format!("{:?}", self.start_position),
            ));
        }

        ensure_non_negative("drone.pid.kp", self.pid.kp)?;
        ensure_non_negative("drone.pid.ki", self.pid.ki)?;
        ensure_non_negative("drone.pid.kd", self.pid.kd)?;
        ensure_non_negative("drone.pid.integral_limit", self.pid.integral_limit)?;

        let safety = &self.safety;
        ensure_positive("drone.safety.hard_ceiling", safety.hard_ceiling)?;
        ensure_positive("drone.safety.max_climb_rate", safety.max_climb_rate)?;
        ensure_non_negative("drone.safety.ground_clearance", safety.ground_clearance)?;
        ensure_unit_interval("drone.safety.soft_ceiling_thrust", safety.soft_ceiling_thrust)?;
        ensure_unit_interval("drone.safety.ground_thrust_floor", safety.ground_thrust_floor)?;
        ensure_unit_interval("drone.safety.emergency_thrust", safety.emergency_thrust)?;
        if safety.soft_ceiling >= safety.hard_ceiling {
            return Err(ConfigError::ValidationError(format!(
                "soft ceiling {} must be below hard ceiling {}",
                safety.soft_ceiling, safety.hard_ceiling
            )));
        }
        if safety.ground_clearance >= safety.soft_ceiling {
            return Err(ConfigError::ValidationError(format!(
                "ground clearance {} must be below soft ceiling {}",
                safety.ground_clearance, safety.soft_ceiling
            )));
        }
        Ok(())
    }
}
