use crate::environment::plant::{HealthStatus, Plant};
use crate::environment::weather::WeatherConditions;

pub const HEALTHY_THRESHOLD: f64 = 75.0;
pub const SICK_THRESHOLD: f64 = 35.0;

const OPTIMAL_LEVEL: (f64, f64) = (40.0, 80.0);
const OPTIMAL_AGE: (f64, f64) = (10.0, 90.0);
const OPTIMAL_TEMPERATURE: (f64, f64) = (15.0, 30.0);

fn band_distance(value: f64, (low, high): (f64, f64)) -> f64 {
    if value < low {
        low - value
    } else if value > high {
        value - high
    } else {
        0.0
    }
}

/// Sweet-spot bonus inside the band, linear penalty outside it
fn level_term(level: f64) -> f64 {
    match band_distance(level, OPTIMAL_LEVEL) {
        d if d == 0.0 => 15.0,
        d => -(0.5 * d).min(25.0),
    }
}

/// Weighted health score in [0, 100]
pub fn health_score(plant: &Plant, weather: &WeatherConditions, seasons: bool) -> f64 {
    let mut score = 50.0;
    score += level_term(plant.water_level);
    score += level_term(plant.nutrient_level);
    score -= 0.5 * plant.disease_level;
    score -= (0.2 * band_distance(plant.age, OPTIMAL_AGE)).min(15.0);
    score -= (1.5 * band_distance(weather.temperature, OPTIMAL_TEMPERATURE)).min(15.0);
    if weather.is_daytime() && weather.sunlight < 20.0 {
        score -= 5.0;
    }
    if seasons {
        score += weather.season.health_adjustment();
    }
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        50.0
    }
}

pub fn classify(score: f64) -> HealthStatus {
    if score > HEALTHY_THRESHOLD {
        HealthStatus::Healthy
    } else if score < SICK_THRESHOLD {
        HealthStatus::Sick
    } else {
        HealthStatus::Unknown
    }
}

pub fn confidence(score: f64) -> f64 {
    ((score - 50.0).abs() * 2.0).min(100.0)
}

/// Re-score a plant in place.
pub fn assess(plant: &mut Plant, weather: &WeatherConditions, seasons: bool) {
    let score = health_score(plant, weather, seasons);
    plant.health_score = score;
    plant.health = classify(score);
    plant.confidence = confidence(score);
}
