use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::config::EnvironmentConfig;
use crate::environment::plant::{Plant, PlantArena};
use crate::environment::weather::WeatherConditions;
use crate::utils::math::horizontal_distance;

/// Disease added by a single successful infection roll
const INFECTION_DOSE: f64 = 10.0;
/// Daily progression of an established infection
const PROGRESSION_RATE: f64 = 1.5;
/// Distances below this count as this close when weighting spread
const MIN_SPREAD_DISTANCE: f64 = 0.5;

fn weather_risk(weather: &WeatherConditions) -> f64 {
    let mut risk = 1.0;
    if weather.humidity > 70.0 {
        risk += (weather.humidity - 70.0) / 30.0;
    }
    if weather.temperature < 10.0 || weather.temperature > 30.0 {
        risk += 0.5;
    }
    risk + 0.5 * (weather.precipitation / 5.0).min(1.0)
}

fn condition_risk(plant: &Plant) -> f64 {
    let mut risk = 1.0;
    if plant.water_level < 30.0 {
        risk += 0.5;
    }
    if plant.nutrient_level < 30.0 {
        risk += 0.5;
    }
    if plant.age < 10.0 || plant.age > 100.0 {
        risk += 0.3;
    }
    risk
}

/// Expected infections per day for one plant
pub fn infection_risk(
    plant: &Plant,
    weather: &WeatherConditions,
    config: &EnvironmentConfig,
) -> f64 {
    let season = if config.enable_seasons {
        weather.season.disease_multiplier()
    } else {
        1.0
    };
    config.base_infection_rate
        * weather_risk(weather)
        * condition_risk(plant)
        * (1.0 + plant.disease_level / 100.0)
        * plant.plant_type.traits().susceptibility
        * season
}

fn favourable(plant: &Plant, weather: &WeatherConditions) -> bool {
    plant.water_level > 60.0 && plant.nutrient_level > 60.0 && weather.sunlight > 50.0
}

/// Stochastic infection, neighbour spread and natural recovery
#[derive(Debug, Clone)]
pub struct DiseaseModel {
    rng: ChaCha8Rng,
}

impl DiseaseModel {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self { rng }
    }

    /// Advance every plant by `days`. Returns the number of new infections.
    pub fn update(
        &mut self,
        plants: &mut PlantArena,
        weather: &WeatherConditions,
        config: &EnvironmentConfig,
        days: f64,
    ) -> usize {
        if !(days.is_finite() && days > 0.0) {
            return 0;
        }
        let mut infections = 0;

        // Spread uses the population as it was at the start of the pass
        let sources: Vec<_> = plants
            .iter()
            .filter(|p| p.is_spreading())
            .map(|p| (p.id, p.position))
            .collect();

        for plant in plants.iter_mut() {
            let p = 1.0 - (-infection_risk(plant, weather, config) * days).exp();
            if self.rng.gen::<f64>() < p {
                plant.disease_level += INFECTION_DOSE;
                infections += 1;
            }

            for (source, position) in &sources {
                if *source == plant.id {
                    continue;
                }
                let distance = horizontal_distance(position, &plant.position);
                if distance > config.spread_radius {
                    continue;
                }
                let chance =
                    (config.spread_rate * days / distance.max(MIN_SPREAD_DISTANCE)).min(1.0);
                if self.rng.gen::<f64>() < chance {
                    plant.disease_level += INFECTION_DOSE;
                    infections += 1;
                }
            }

            if favourable(plant, weather) {
                plant.disease_level -= config.recovery_rate * days;
            } else if plant.disease_level > 0.0 {
                plant.disease_level += PROGRESSION_RATE * days;
            }
            plant.clamp_levels();
        }
        infections
    }
}
