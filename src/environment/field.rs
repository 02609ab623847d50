use kiddo::KdTree;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EnvironmentConfig;
use crate::environment::disease::DiseaseModel;
use crate::environment::generator::{build_index, nearest, FieldGenerator};
use crate::environment::health;
use crate::environment::plant::{Plant, PlantArena, PlantId};
use crate::environment::weather::{WeatherConditions, WeatherModel};
use crate::utils::errors::SimError;
use crate::utils::math::{deg_to_rad, euler_to_quaternion, finite_or, horizontal_distance};
use crate::utils::rng::RngManager;

/// Externally triggered treatments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Water,
    Fertilizer,
    Pesticide,
}

impl EffectKind {
    /// Level change at the effect centre for intensity 1
    fn strength(&self) -> f64 {
        match self {
            EffectKind::Water => 30.0,
            EffectKind::Fertilizer => 25.0,
            EffectKind::Pesticide => 40.0,
        }
    }
}

impl std::str::FromStr for EffectKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "water" => Ok(EffectKind::Water),
            "fertilizer" => Ok(EffectKind::Fertilizer),
            "pesticide" => Ok(EffectKind::Pesticide),
            other => Err(SimError::EnvironmentError(format!(
                "unknown effect kind '{}'",
                other
            ))),
        }
    }
}

const SEED_GENERATION: &str = "field.generation";
const SEED_WEATHER: &str = "weather";
const SEED_DISEASE: &str = "disease";

/// Plant population and weather for one field
pub struct Environment {
    config: EnvironmentConfig,
    rngs: RngManager,
    plants: PlantArena,
    index: KdTree<f32, 2>,
    weather: WeatherModel,
    disease: DiseaseModel,
    elapsed_days: f64,
}

impl Environment {
    pub fn new(config: EnvironmentConfig, rngs: &RngManager) -> Result<Self, SimError> {
        config.validate()?;
        let weather = WeatherModel::new(&config, rngs.get_rng(SEED_WEATHER));
        let plants = FieldGenerator::new(&config, rngs.master_seed(), rngs.get_rng(SEED_GENERATION))
            .generate(config.start_season)?;
        let mut env = Self {
            index: build_index(&plants),
            disease: DiseaseModel::new(rngs.get_rng(SEED_DISEASE)),
            rngs: rngs.clone(),
            plants,
            weather,
            config,
            elapsed_days: 0.0,
        };
        env.score_initial();
        info!(plants = env.plants.len(), "environment initialized");
        Ok(env)
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn plants(&self) -> &PlantArena {
        &self.plants
    }

    pub fn plant(&self, id: PlantId) -> Option<&Plant> {
        self.plants.get(id)
    }

    pub fn weather(&self) -> &WeatherConditions {
        self.weather.conditions()
    }

    pub fn elapsed_days(&self) -> f64 {
        self.elapsed_days
    }

    // Generated health and confidence stand until the first update
    fn score_initial(&mut self) {
        let weather = self.weather.conditions().clone();
        let seasons = self.config.enable_seasons;
        for plant in self.plants.iter_mut() {
            plant.health_score = health::health_score(plant, &weather, seasons);
        }
    }

    /// Advance weather, growth, disease and health by `dt` seconds.
    pub fn update(&mut self, dt: f64) -> Result<(), SimError> {
        if !(dt.is_finite() && dt >= 0.0) {
            return Err(SimError::EnvironmentError(format!("invalid dt {}", dt)));
        }
        if dt == 0.0 {
            return Ok(());
        }
        let days = dt * self.config.days_per_second;
        self.elapsed_days += days;

        self.weather.update(dt, &self.config);
        let weather = self.weather.conditions().clone();

        if self.config.enable_growth {
            let season_size = if self.config.enable_seasons {
                weather.season.size_multiplier()
            } else {
                1.0
            };
            let temperature_factor = (weather.temperature / 20.0).max(0.5);
            let evaporation = self.config.evaporation_rate * temperature_factor;
            for plant in self.plants.iter_mut() {
                plant.grow(days, season_size);
                plant.water_level += (weather.precipitation * 20.0 - evaporation) * days;
                if plant.water_level >= 40.0 {
                    plant.nutrient_level += days;
                } else {
                    plant.nutrient_level -= 2.0 * days;
                }
                plant.clamp_levels();
            }
        }

        if self.config.enable_disease {
            let infections = self
                .disease
                .update(&mut self.plants, &weather, &self.config, days);
            if infections > 0 {
                debug!(infections, "disease pass");
            }
        }

        let seasons = self.config.enable_seasons;
        for plant in self.plants.iter_mut() {
            health::assess(plant, &weather, seasons);
            plant.clamp_levels();
        }
        Ok(())
    }

    /// Plants within `radius` of `center` in the horizontal plane, in id order
    pub fn plants_in_radius(&self, center: &Vector3<f64>, radius: f64) -> Vec<PlantId> {
        self.plants
            .iter()
            .filter(|p| horizontal_distance(&p.position, center) <= radius)
            .map(|p| p.id)
            .collect()
    }

    /// Plants inside the downward view cone of a camera at `position`.
    ///
    /// `rotation` is roll/pitch/yaw in radians.
    pub fn visible_plants(
        &self,
        position: &Vector3<f64>,
        rotation: &Vector3<f64>,
        max_distance: f64,
    ) -> Vec<PlantId> {
        let attitude: UnitQuaternion<f64> = euler_to_quaternion(rotation);
        let look = attitude * -Vector3::y();
        let cos_limit = deg_to_rad(self.config.view_half_angle).cos();

        self.plants
            .iter()
            .filter(|p| {
                let to_plant = p.position - position;
                let distance = to_plant.norm();
                if distance > max_distance || p.position.y >= position.y {
                    return false;
                }
                distance > 0.0 && to_plant.dot(&look) / distance >= cos_limit
            })
            .map(|p| p.id)
            .collect()
    }

    pub fn nearest_plant(&self, position: &Vector3<f64>) -> Option<PlantId> {
        nearest(&self.index, &self.plants, position.x, position.z)
    }

    /// Apply a treatment that attenuates linearly to zero at the effect radius.
    /// Returns the number of plants affected.
    pub fn apply_effect(&mut self, position: &Vector3<f64>, kind: EffectKind, intensity: f64) -> usize {
        let intensity = finite_or(intensity, 0.0).max(0.0);
        if intensity == 0.0 {
            return 0;
        }
        let radius = self.config.effect_radius;
        let amount = kind.strength() * intensity;
        let mut affected = 0;

        for plant in self.plants.iter_mut() {
            let distance = horizontal_distance(&plant.position, position);
            if distance >= radius {
                continue;
            }
            let delta = amount * (1.0 - distance / radius);
            match kind {
                EffectKind::Water => plant.water_level += delta,
                EffectKind::Fertilizer => plant.nutrient_level += delta,
                EffectKind::Pesticide => plant.disease_level -= delta,
            }
            plant.clamp_levels();
            affected += 1;
        }
        debug!(?kind, intensity, affected, "effect applied");
        affected
    }

    /// Mutable access for hosts that script scenarios
    pub fn plant_mut(&mut self, id: PlantId) -> Option<&mut Plant> {
        self.plants.get_mut(id)
    }

    /// Regenerate the field and restore canonical weather.
    pub fn reset(&mut self) -> Result<(), SimError> {
        *self = Self::new(self.config.clone(), &self.rngs)?;
        Ok(())
    }

    /// Swap in a new config; the field is regenerated when its layout changes.
    pub fn update_config(&mut self, config: EnvironmentConfig) -> Result<(), SimError> {
        config.validate()?;
        let layout_changed = config.world_size != self.config.world_size
            || config.population() != self.config.population()
            || config.position_jitter != self.config.position_jitter;
        if layout_changed {
            *self = Self::new(config, &self.rngs)?;
        } else {
            self.config = config;
        }
        Ok(())
    }

    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        let half = self.config.half_extent();
        (Point3::new(-half, 0.0, -half), Point3::new(half, 0.0, half))
    }
}
