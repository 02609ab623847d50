use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::config::EnvironmentConfig;
use crate::utils::math::{wrap_degrees, wrap_hours};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    #[default]
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn next(&self) -> Self {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }

    /// Daily mean temperature [°C]
    pub fn base_temperature(&self) -> f64 {
        match self {
            Season::Spring => 18.0,
            Season::Summer => 27.0,
            Season::Autumn => 15.0,
            Season::Winter => 5.0,
        }
    }

    pub fn size_multiplier(&self) -> f64 {
        match self {
            Season::Spring => 0.9,
            Season::Summer => 1.0,
            Season::Autumn => 0.95,
            Season::Winter => 0.8,
        }
    }

    pub fn disease_multiplier(&self) -> f64 {
        match self {
            Season::Spring => 1.0,
            Season::Summer => 1.3,
            Season::Autumn => 1.1,
            Season::Winter => 0.6,
        }
    }

    /// Added to the plant health score
    pub fn health_adjustment(&self) -> f64 {
        match self {
            Season::Spring | Season::Summer => 5.0,
            Season::Autumn => 0.0,
            Season::Winter => -10.0,
        }
    }

    /// Scales the base healthy probability of newly generated plants
    pub fn initial_health_factor(&self) -> f64 {
        match self {
            Season::Spring | Season::Summer => 1.0,
            Season::Autumn => 0.95,
            Season::Winter => 0.85,
        }
    }
}

/// One-word summary of the current weather
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Rain,
    Mist,
    Cold,
    Hot,
    Clear,
    PartlyCloudy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgriculturalInsights {
    pub irrigation_needed: bool,
    pub frost_risk: bool,
    pub heat_stress: bool,
    pub optimal_growing: bool,
    pub wind_damage_risk: bool,
    pub disease_risk: bool,
    pub harvest_conditions: bool,
    pub planting_recommendation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConditions {
    /// [°C]
    pub temperature: f64,
    /// [0, 100]
    pub humidity: f64,
    /// [m/s]
    pub wind_speed: f64,
    /// [0, 360) degrees
    pub wind_direction: f64,
    /// [mm/h]
    pub precipitation: f64,
    /// [0, 100]
    pub sunlight: f64,
    /// [0, 24) hours
    pub time_of_day: f64,
    pub season: Season,
}

impl Default for WeatherConditions {
    fn default() -> Self {
        Self::canonical(Season::Spring, 8.0)
    }
}

impl WeatherConditions {
    pub const MAX_WIND: f64 = 20.0;

    pub fn canonical(season: Season, time_of_day: f64) -> Self {
        let mut conditions = Self {
            temperature: 20.0,
            humidity: 60.0,
            wind_speed: 2.0,
            wind_direction: 90.0,
            precipitation: 0.0,
            sunlight: 0.0,
            time_of_day: wrap_hours(time_of_day),
            season,
        };
        conditions.sunlight = conditions.compute_sunlight();
        conditions
    }

    /// Cloud cover derived from humidity and precipitation [0, 100]
    pub fn cloud_cover(&self) -> f64 {
        ((self.humidity - 40.0) * (70.0 / 60.0) + 6.0 * self.precipitation).clamp(0.0, 100.0)
    }

    /// Sun elevation term attenuated by cloud cover
    pub fn compute_sunlight(&self) -> f64 {
        let elevation = (PI * (self.time_of_day - 6.0) / 12.0).sin().max(0.0);
        (100.0 * elevation * (1.0 - 0.75 * self.cloud_cover() / 100.0)).clamp(0.0, 100.0)
    }

    pub fn is_daytime(&self) -> bool {
        (6.0..18.0).contains(&self.time_of_day)
    }

    pub fn condition(&self) -> WeatherCondition {
        if self.precipitation > 2.0 {
            WeatherCondition::Rain
        } else if self.humidity > 80.0 && self.temperature > 20.0 {
            WeatherCondition::Mist
        } else if self.temperature < 10.0 {
            WeatherCondition::Cold
        } else if self.temperature > 30.0 {
            WeatherCondition::Hot
        } else if self.humidity < 40.0 {
            WeatherCondition::Clear
        } else {
            WeatherCondition::PartlyCloudy
        }
    }

    pub fn insights(&self) -> AgriculturalInsights {
        let t = self.temperature;
        let h = self.humidity;
        AgriculturalInsights {
            irrigation_needed: h < 40.0 && self.precipitation < 0.5,
            frost_risk: t < 2.0,
            heat_stress: t > 32.0,
            optimal_growing: (15.0..=28.0).contains(&t)
                && (40.0..=80.0).contains(&h)
                && self.wind_speed < 10.0,
            wind_damage_risk: self.wind_speed > 12.0,
            disease_risk: h > 80.0 && (15.0..=30.0).contains(&t),
            harvest_conditions: self.precipitation < 0.1 && h < 70.0 && self.wind_speed < 8.0,
            planting_recommendation: self.season == Season::Spring
                && (10.0..=25.0).contains(&t)
                && self.precipitation < 2.0,
        }
    }

    fn clamp_ranges(&mut self) {
        self.humidity = self.humidity.clamp(0.0, 100.0);
        self.wind_speed = self.wind_speed.clamp(0.0, Self::MAX_WIND);
        self.wind_direction = wrap_degrees(self.wind_direction);
        self.precipitation = self.precipitation.max(0.0);
        self.time_of_day = wrap_hours(self.time_of_day);
        self.sunlight = self.sunlight.clamp(0.0, 100.0);
    }
}

/// Incremental weather and calendar model
#[derive(Debug, Clone)]
pub struct WeatherModel {
    conditions: WeatherConditions,
    season_day: f64,
    rng: ChaCha8Rng,
}

impl WeatherModel {
    const DIURNAL_AMPLITUDE: f64 = 6.0;
    const PEAK_HOUR: f64 = 15.0;
    const TEMPERATURE_NOISE: f64 = 0.5;
    const HUMIDITY_WALK: f64 = 3.0;
    const WIND_WALK: f64 = 1.0;
    const DIRECTION_WALK: f64 = 10.0;

    pub fn new(config: &EnvironmentConfig, rng: ChaCha8Rng) -> Self {
        Self {
            conditions: WeatherConditions::canonical(config.start_season, config.start_time_of_day),
            season_day: 0.0,
            rng,
        }
    }

    pub fn conditions(&self) -> &WeatherConditions {
        &self.conditions
    }

    /// Days elapsed in the current season
    pub fn season_day(&self) -> f64 {
        self.season_day
    }

    pub fn reset(&mut self, config: &EnvironmentConfig, rng: ChaCha8Rng) {
        *self = Self::new(config, rng);
    }

    /// Advance by `dt` seconds of simulated time.
    pub fn update(&mut self, dt: f64, config: &EnvironmentConfig) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        let days = dt * config.days_per_second;
        let c = &mut self.conditions;
        c.time_of_day = wrap_hours(c.time_of_day + days * 24.0);

        if config.enable_seasons {
            self.season_day += days;
            while self.season_day >= config.days_per_season {
                self.season_day -= config.days_per_season;
                c.season = c.season.next();
            }
        }

        if config.enable_weather {
            let diurnal = (2.0 * PI * (c.time_of_day - Self::PEAK_HOUR + 6.0) / 24.0).sin();
            let noise = self
                .rng
                .gen_range(-Self::TEMPERATURE_NOISE..=Self::TEMPERATURE_NOISE);
            c.temperature = c.season.base_temperature() + Self::DIURNAL_AMPLITUDE * diurnal + noise;

            c.humidity += self.rng.gen_range(-1.0..=1.0) * Self::HUMIDITY_WALK * dt;
            c.wind_speed += self.rng.gen_range(-1.0..=1.0) * Self::WIND_WALK * dt;
            c.wind_direction += self.rng.gen_range(-1.0..=1.0) * Self::DIRECTION_WALK * dt;

            if c.humidity > 80.0 {
                c.precipitation += (c.humidity - 80.0) * 0.05 * dt;
            } else {
                c.precipitation -= 0.5 * dt;
            }
        }

        c.clamp_ranges();
        c.sunlight = c.compute_sunlight();
    }
}
