use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ConfigError, SimulationConfig};

/// A partial update over the flat set of runtime tunables.
///
/// Unset fields leave the base config untouched. Applying a patch never
/// mutates the base; it yields a new config that has passed validation.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    // Physics
    pub timestep: Option<f64>,
    pub gravity: Option<f64>,
    pub max_substeps: Option<u32>,
    // Engine
    pub max_fps: Option<f64>,
    pub max_consecutive_errors: Option<u32>,
    // Field
    pub world_size: Option<f64>,
    pub max_plants: Option<usize>,
    pub plant_density: Option<f64>,
    // Drone
    pub mass: Option<f64>,
    pub max_thrust: Option<f64>,
    pub pid_kp: Option<f64>,
    pub pid_ki: Option<f64>,
    pub pid_kd: Option<f64>,
    pub drag_coefficient: Option<f64>,
    pub battery_drain_rate: Option<f64>,
    pub hard_ceiling: Option<f64>,
    pub soft_ceiling: Option<f64>,
    pub max_climb_rate: Option<f64>,
    // Feature toggles
    pub enable_weather: Option<bool>,
    pub enable_growth: Option<bool>,
    pub enable_disease: Option<bool>,
    pub enable_seasons: Option<bool>,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestep(mut self, dt: f64) -> Self {
        self.timestep = Some(dt);
        self
    }

    pub fn gravity(mut self, gravity: f64) -> Self {
        self.gravity = Some(gravity);
        self
    }

    pub fn max_substeps(mut self, substeps: u32) -> Self {
        self.max_substeps = Some(substeps);
        self
    }

    pub fn max_fps(mut self, fps: f64) -> Self {
        self.max_fps = Some(fps);
        self
    }

    pub fn max_consecutive_errors(mut self, count: u32) -> Self {
        self.max_consecutive_errors = Some(count);
        self
    }

    pub fn world_size(mut self, size: f64) -> Self {
        self.world_size = Some(size);
        self
    }

    pub fn max_plants(mut self, count: usize) -> Self {
        self.max_plants = Some(count);
        self
    }

    pub fn plant_density(mut self, density: f64) -> Self {
        self.plant_density = Some(density);
        self
    }

    pub fn mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn max_thrust(mut self, thrust: f64) -> Self {
        self.max_thrust = Some(thrust);
        self
    }

    pub fn pid(mut self, kp: f64, ki: f64, kd: f64) -> Self {
        self.pid_kp = Some(kp);
        self.pid_ki = Some(ki);
        self.pid_kd = Some(kd);
        self
    }

    pub fn drag_coefficient(mut self, drag: f64) -> Self {
        self.drag_coefficient = Some(drag);
        self
    }

    pub fn battery_drain_rate(mut self, rate: f64) -> Self {
        self.battery_drain_rate = Some(rate);
        self
    }

    pub fn ceilings(mut self, soft: f64, hard: f64) -> Self {
        self.soft_ceiling = Some(soft);
        self.hard_ceiling = Some(hard);
        self
    }

    pub fn max_climb_rate(mut self, rate: f64) -> Self {
        self.max_climb_rate = Some(rate);
        self
    }

    pub fn enable_weather(mut self, enabled: bool) -> Self {
        self.enable_weather = Some(enabled);
        self
    }

    pub fn enable_growth(mut self, enabled: bool) -> Self {
        self.enable_growth = Some(enabled);
        self
    }

    pub fn enable_disease(mut self, enabled: bool) -> Self {
        self.enable_disease = Some(enabled);
        self
    }

    pub fn enable_seasons(mut self, enabled: bool) -> Self {
        self.enable_seasons = Some(enabled);
        self
    }

    /// Read the recognised keys from a flat JSON object. Keys with the wrong
    /// type are rejected rather than silently skipped.
    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        if !value.is_object() {
            return Err(ConfigError::JsonError(format!(
                "expected a JSON object, got {}",
                value
            )));
        }

        Ok(Self {
            timestep: get_f64(value, "timestep")?,
            gravity: get_f64(value, "gravity")?,
            max_substeps: get_u64(value, "max_substeps")?.map(|v| v as u32),
            max_fps: get_f64(value, "max_fps")?,
            max_consecutive_errors: get_u64(value, "max_consecutive_errors")?.map(|v| v as u32),
            world_size: get_f64(value, "world_size")?,
            max_plants: get_u64(value, "max_plants")?.map(|v| v as usize),
            plant_density: get_f64(value, "plant_density")?,
            mass: get_f64(value, "mass")?,
            max_thrust: get_f64(value, "max_thrust")?,
            pid_kp: get_f64(value, "pid_kp")?,
            pid_ki: get_f64(value, "pid_ki")?,
            pid_kd: get_f64(value, "pid_kd")?,
            drag_coefficient: get_f64(value, "drag_coefficient")?,
            battery_drain_rate: get_f64(value, "battery_drain_rate")?,
            hard_ceiling: get_f64(value, "hard_ceiling")?,
            soft_ceiling: get_f64(value, "soft_ceiling")?,
            max_climb_rate: get_f64(value, "max_climb_rate")?,
            enable_weather: get_bool(value, "enable_weather")?,
            enable_growth: get_bool(value, "enable_growth")?,
            enable_disease: get_bool(value, "enable_disease")?,
            enable_seasons: get_bool(value, "enable_seasons")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether applying this patch changes the plant field layout.
    pub fn affects_field(&self) -> bool {
        self.world_size.is_some() || self.max_plants.is_some() || self.plant_density.is_some()
    }

    pub fn apply_to(&self, base: &SimulationConfig) -> Result<SimulationConfig, ConfigError> {
        let mut config = base.clone();

        if let Some(v) = self.timestep {
            config.physics.timestep = v;
        }
        if let Some(v) = self.gravity {
            config.physics.gravity = v;
        }
        if let Some(v) = self.max_substeps {
            config.physics.max_substeps = v;
        }
        if let Some(v) = self.max_fps {
            config.engine.max_fps = v;
        }
        if let Some(v) = self.max_consecutive_errors {
            config.engine.max_consecutive_errors = v;
        }
        if let Some(v) = self.world_size {
            config.environment.world_size = v;
        }
        if let Some(v) = self.max_plants {
            config.environment.max_plants = v;
        }
        if let Some(v) = self.plant_density {
            config.environment.plant_density = v;
        }
        if let Some(v) = self.mass {
            config.drone.mass = v;
        }
        if let Some(v) = self.max_thrust {
            config.drone.max_thrust = v;
        }
        if let Some(v) = self.pid_kp {
            config.drone.pid.kp = v;
        }
        if let Some(v) = self.pid_ki {
            config.drone.pid.ki = v;
        }
        if let Some(v) = self.pid_kd {
            config.drone.pid.kd = v;
        }
        if let Some(v) = self.drag_coefficient {
            config.drone.drag_coefficient = v;
        }
        if let Some(v) = self.battery_drain_rate {
            config.drone.battery_drain_rate = v;
        }
        if let Some(v) = self.hard_ceiling {
            config.drone.safety.hard_ceiling = v;
        }
        if let Some(v) = self.soft_ceiling {
            config.drone.safety.soft_ceiling = v;
        }
        if let Some(v) = self.max_climb_rate {
            config.drone.safety.max_climb_rate = v;
        }
        if let Some(v) = self.enable_weather {
            config.environment.enable_weather = v;
        }
        if let Some(v) = self.enable_growth {
            config.environment.enable_growth = v;
        }
        if let Some(v) = self.enable_disease {
            config.environment.enable_disease = v;
        }
        if let Some(v) = self.enable_seasons {
            config.environment.enable_seasons = v;
        }

        config.validate()?;
        Ok(config)
    }
}

fn get_f64(value: &Value, key: &str) -> Result<Option<f64>, ConfigError> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, v)),
    }
}

fn get_u64(value: &Value, key: &str) -> Result<Option<u64>, ConfigError> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, v)),
    }
}

fn get_bool(value: &Value, key: &str) -> Result<Option<bool>, ConfigError> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_produces_new_config() {
        let base = SimulationConfig::default();
        let patched = ConfigPatch::new()
            .pid(1.0, 0.2, 0.5)
            .enable_disease(false)
            .apply_to(&base)
            .unwrap();

        assert_eq!(patched.drone.pid.kp, 1.0);
        assert_eq!(patched.drone.pid.ki, 0.2);
        assert_eq!(patched.drone.pid.kd, 0.5);
        assert!(!patched.environment.enable_disease);

        // Base snapshot untouched
        assert_eq!(base.drone.pid.kp, 0.6);
        assert!(base.environment.enable_disease);
    }

    #[test]
    fn test_from_json() {
        let patch = ConfigPatch::from_json(&json!({
            "timestep": 0.01,
            "max_fps": 30,
            "max_plants": 25,
            "enable_weather": false,
            "unrelated": "ignored"
        }))
        .unwrap();

        assert_eq!(patch.timestep, Some(0.01));
        assert_eq!(patch.max_fps, Some(30.0));
        assert_eq!(patch.max_plants, Some(25));
        assert_eq!(patch.enable_weather, Some(false));
        assert!(patch.affects_field());
    }

    #[test]
    fn test_from_json_rejects_wrong_types() {
        let result = ConfigPatch::from_json(&json!({ "timestep": "fast" }));
        assert!(matches!(result, Err(ConfigError::InvalidParameter { .. })));

        let result = ConfigPatch::from_json(&json!([1, 2, 3]));
        assert!(matches!(result, Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_invalid_patch_is_rejected() {
        let base = SimulationConfig::default();
        let result = ConfigPatch::new().timestep(0.0).apply_to(&base);
        assert!(result.is_err());

        let result = ConfigPatch::new().ceilings(60.0, 50.0).apply_to(&base);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_patch() {
        let patch = ConfigPatch::new();
        assert!(patch.is_empty());
        assert!(!patch.affects_field());
        assert_eq!(
            patch.apply_to(&SimulationConfig::default()).unwrap(),
            SimulationConfig::default()
        );
    }
}
