use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::config::{
    BridgeConfig, CameraConfig, ConfigError, ConfigPatch, DroneConfig, EngineConfig,
    EnvironmentConfig, PhysicsConfig,
};

/// Complete parameter bundle for one simulation engine.
///
/// Treated as an immutable snapshot: runtime updates go through
/// [`ConfigPatch::apply_to`], which returns a new validated config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub physics: PhysicsConfig,
    pub drone: DroneConfig,
    pub environment: EnvironmentConfig,
    pub camera: CameraConfig,
    pub engine: EngineConfig,
    pub bridge: BridgeConfig,
}

impl SimulationConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: SimulationConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_yaml::to_string(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Defaults overlaid with the flat tunables found in `value`.
    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        ConfigPatch::from_json(value)?.apply_to(&SimulationConfig::default())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.engine.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.physics.validate()?;
        self.drone.validate()?;
        self.environment.validate()?;
        self.camera.validate()?;
        self.engine.validate()?;
        self.bridge.validate()?;
        Ok(())
    }
}
