use serde::{Deserialize, Serialize};

use crate::config::{ensure_non_negative, ensure_positive, ConfigError};
use crate::environment::Season;

/// Configuration for the field, plant lifecycle and weather
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Edge length of the square field centred on the origin [m]
    pub world_size: f64,
    /// Plants per square metre
    pub plant_density: f64,
    pub max_plants: usize,
    /// Random offset applied to each grid position [m]
    pub position_jitter: f64,
    /// Initial plant age is drawn from [0, initial_age_max) [days]
    pub initial_age_max: f64,
    /// Spatial frequency of the soil moisture/fertility noise field
    pub soil_noise_scale: f64,

    // Time
    pub days_per_second: f64,
    pub days_per_season: f64,
    pub start_season: Season,
    pub start_time_of_day: f64,

    // Radii [m]
    pub effect_radius: f64,
    pub spread_radius: f64,
    /// Half-angle of the downward view cone used by visibility queries [deg]
    pub view_half_angle: f64,

    // Rates [per day]
    pub base_infection_rate: f64,
    pub spread_rate: f64,
    pub recovery_rate: f64,
    pub evaporation_rate: f64,

    // Feature toggles
    pub enable_weather: bool,
    pub enable_growth: bool,
    pub enable_disease: bool,
    pub enable_seasons: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            world_size: 50.0,
            plant_density: 0.04,
            max_plants: 100,
            position_jitter: 0.3,
            initial_age_max: 120.0,
            soil_noise_scale: 0.08,
            days_per_second: 0.05,
            days_per_season: 30.0,
            start_season: Season::Spring,
            start_time_of_day: 8.0,
            effect_radius: 5.0,
            spread_radius: 3.0,
            view_half_angle: 35.0,
            base_infection_rate: 0.02,
            spread_rate: 0.15,
            recovery_rate: 4.0,
            evaporation_rate: 5.0,
            enable_weather: true,
            enable_growth: true,
            enable_disease: true,
            enable_seasons: true,
        }
    }
}

impl EnvironmentConfig {
    /// Number of plants the generator will place
    pub fn population(&self) -> usize {
        let area = self.world_size * self.world_size;
        let from_density = (area * self.plant_density).round().max(0.0) as usize;
        from_density.min(self.max_plants)
    }

    pub fn half_extent(&self) -> f64 {
        self.world_size / 2.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("environment.world_size", self.world_size)?;
        ensure_non_negative("environment.plant_density", self.plant_density)?;
        ensure_non_negative("environment.position_jitter", self.position_jitter)?;
        ensure_non_negative("environment.initial_age_max", self.initial_age_max)?;
        ensure_non_negative("environment.days_per_second", self.days_per_second)?;
        ensure_positive("environment.days_per_season", self.days_per_season)?;
        ensure_positive("environment.effect_radius", self.effect_radius)?;
        ensure_non_negative("environment.spread_radius", self.spread_radius)?;
        ensure_non_negative("environment.base_infection_rate", self.base_infection_rate)?;
        ensure_non_negative("environment.spread_rate", self.spread_rate)?;
        ensure_non_negative("environment.recovery_rate", self.recovery_rate)?;
        ensure_non_negative("environment.evaporation_rate", self.evaporation_rate)?;
        if !(0.0..24.0).contains(&self.start_time_of_day) {
            return Err(ConfigError::invalid(
                "environment.start_time_of_day",
                self.start_time_of_day,
            ));
        }
        if !(0.0..90.0).contains(&self.view_half_angle) {
            return Err(ConfigError::invalid(
                "environment.view_half_angle",
                self.view_half_angle,
            ));
        }
        Ok(())
    }
}
