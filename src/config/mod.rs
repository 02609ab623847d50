mod camera;
mod drone;
mod engine;
mod environment;
mod error;
mod patch;
mod physics;
mod simulation;

pub use camera::CameraConfig;
pub use drone::{DroneConfig, PidGains, SafetyConfig};
pub use engine::{BridgeConfig, EngineConfig};
pub use environment::EnvironmentConfig;
pub use error::ConfigError;
pub use patch::ConfigPatch;
pub use physics::PhysicsConfig;
pub use simulation::SimulationConfig;

pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, value))
    }
}

pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, value))
    }
}

pub(crate) fn ensure_unit_interval(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, value))
    }
}
