use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::{ensure_positive, ensure_unit_interval, ConfigError};

/// Configuration for the physics world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    // Integration parameters
    pub timestep: f64,
    pub max_substeps: u32,
    pub max_velocity: f64,
    pub max_angular_velocity: f64,

    /// Gravitational acceleration magnitude, acting along -y [m/s²]
    pub gravity: f64,

    // Ground plane
    pub ground_height: f64,
    pub ground_restitution: f64,
    pub ground_friction: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            timestep: 1.0 / 60.0, // 60 Hz
            max_substeps: 4,
            max_velocity: 50.0,         // m/s
            max_angular_velocity: 20.0, // rad/s
            gravity: 9.81,
            ground_height: 0.0,
            ground_restitution: 0.2,
            ground_friction: 0.5,
        }
    }
}

impl PhysicsConfig {
    pub fn gravity_vector(&self) -> Vector3<f64> {
        Vector3::new(0.0, -self.gravity, 0.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("physics.timestep", self.timestep)?;
        ensure_positive("physics.max_velocity", self.max_velocity)?;
        ensure_positive("physics.max_angular_velocity", self.max_angular_velocity)?;
        if self.max_substeps == 0 {
            return Err(ConfigError::invalid("physics.max_substeps", self.max_substeps));
        }
        if !self.gravity.is_finite() || self.gravity < 0.0 {
            return Err(ConfigError::invalid("physics.gravity", self.gravity));
        }
        ensure_unit_interval("physics.ground_restitution", self.ground_restitution)?;
        ensure_unit_interval("physics.ground_friction", self.ground_friction)?;
        Ok(())
    }
}
