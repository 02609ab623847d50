use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::utils::math::{euler_to_quaternion, quaternion_to_euler};
use crate::vehicles::drone::controls::MotorThrusts;
use crate::vehicles::drone::safety::SafetyOverride;
use crate::vehicles::traits::VehicleState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightMode {
    /// Raw stick input
    Manual,
    /// Stick input with altitude hold
    Stabilized,
    /// Actions come from the built-in policy
    #[default]
    Autonomous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneState {
    pub position: Vector3<f64>,
    /// Roll, pitch, yaw [rad]
    pub rotation: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    /// Remaining charge [%]
    pub battery: f64,
    pub motor_thrusts: MotorThrusts,
    pub armed: bool,
    pub flight_mode: FlightMode,
    pub height_lock: bool,
    pub target_altitude: f64,
    pub emergency: bool,
    /// Collective thrust after the safety envelope
    pub commanded_thrust: f64,
    pub safety: SafetyOverride,
}

impl Default for DroneState {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: Vector3::zeros(),
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            battery: 100.0,
            motor_thrusts: [0.0; 4],
            armed: false,
            flight_mode: FlightMode::default(),
            height_lock: false,
            target_altitude: 0.0,
            emergency: false,
            commanded_thrust: 0.0,
            safety: SafetyOverride::None,
        }
    }
}

impl DroneState {
    pub fn at(position: Vector3<f64>, target_altitude: f64) -> Self {
        Self {
            position,
            target_altitude,
            ..Default::default()
        }
    }

    pub fn altitude(&self) -> f64 {
        self.position.y
    }

    pub fn vertical_speed(&self) -> f64 {
        self.velocity.y
    }

    pub fn yaw(&self) -> f64 {
        self.rotation.z
    }

    pub fn is_depleted(&self) -> bool {
        self.battery <= 0.0
    }
}

impl VehicleState for DroneState {
    fn position(&self) -> Vector3<f64> {
        self.position
    }

    fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    fn attitude(&self) -> UnitQuaternion<f64> {
        euler_to_quaternion(&self.rotation)
    }

    fn rates(&self) -> Vector3<f64> {
        self.angular_velocity
    }
}

/// Convenience for callers holding a quaternion
pub fn rotation_from_attitude(attitude: &UnitQuaternion<f64>) -> Vector3<f64> {
    quaternion_to_euler(attitude)
}
