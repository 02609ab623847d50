use kiddo::{distance::squared_euclidean, KdTree};
use nalgebra::Vector3;
use noise::{NoiseFn, OpenSimplex};
use rand::distributions::{Distribution, Uniform, WeightedIndex};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::EnvironmentConfig;
use crate::environment::plant::{HealthStatus, Plant, PlantArena, PlantId, PlantType};
use crate::environment::weather::Season;
use crate::utils::errors::SimError;

/// Procedural plant placement on a jittered grid
pub struct FieldGenerator<'a> {
    config: &'a EnvironmentConfig,
    soil: OpenSimplex,
    rng: ChaCha8Rng,
}

impl<'a> FieldGenerator<'a> {
    pub fn new(config: &'a EnvironmentConfig, seed: u64, rng: ChaCha8Rng) -> Self {
        Self {
            config,
            soil: OpenSimplex::new(seed as u32),
            rng,
        }
    }

    /// Grid cell centres covering the field, row-major, `count` of them
    pub fn grid_positions(&self, count: usize) -> Vec<(f64, f64)> {
        if count == 0 {
            return Vec::new();
        }
        let cols = (count as f64).sqrt().ceil() as usize;
        let rows = (count + cols - 1) / cols;
        let half = self.config.half_extent();
        let dx = self.config.world_size / cols as f64;
        let dz = self.config.world_size / rows as f64;

        (0..count)
            .map(|i| {
                let (row, col) = (i / cols, i % cols);
                (
                    -half + dx * (col as f64 + 0.5),
                    -half + dz * (row as f64 + 0.5),
                )
            })
            .collect()
    }

    /// Soil moisture and fertility from two decorrelated noise samples, each in [20, 80]
    fn soil_levels(&self, x: f64, z: f64) -> (f64, f64) {
        let s = self.config.soil_noise_scale;
        let water = self.soil.get([x * s, z * s, 0.0]);
        let nutrient = self.soil.get([x * s + 100.0, z * s - 100.0, 1.0]);
        (
            (50.0 + 30.0 * water).clamp(0.0, 100.0),
            (50.0 + 30.0 * nutrient).clamp(0.0, 100.0),
        )
    }

    fn healthy_probability(plant_type: PlantType, age: f64, season: Season) -> f64 {
        let age_factor = if !(10.0..=100.0).contains(&age) { 0.85 } else { 1.0 };
        (plant_type.traits().healthy_probability * age_factor * season.initial_health_factor())
            .clamp(0.0, 1.0)
    }

    pub fn generate(&mut self, season: Season) -> Result<PlantArena, SimError> {
        let count = self.config.population();
        let half = self.config.half_extent();
        let jitter = self.config.position_jitter;

        let weights = PlantType::ALL.map(|t| t.traits().weight);
        let type_sampler = WeightedIndex::new(weights)
            .map_err(|e| SimError::EnvironmentError(format!("plant type weights: {}", e)))?;
        let age_max = self.config.initial_age_max;
        let size_season = if self.config.enable_seasons {
            season.size_multiplier()
        } else {
            1.0
        };

        let mut plants = Vec::with_capacity(count);
        for (i, (gx, gz)) in self.grid_positions(count).into_iter().enumerate() {
            let (x, z) = if jitter > 0.0 {
                let offset = Uniform::new_inclusive(-jitter, jitter);
                (
                    (gx + offset.sample(&mut self.rng)).clamp(-half, half),
                    (gz + offset.sample(&mut self.rng)).clamp(-half, half),
                )
            } else {
                (gx, gz)
            };

            let plant_type = PlantType::ALL[type_sampler.sample(&mut self.rng)];
            let age = if age_max > 0.0 {
                self.rng.gen_range(0.0..age_max)
            } else {
                0.0
            };

            let mut plant = Plant::new(PlantId(i as u32), plant_type, Vector3::new(x, 0.0, z), age);
            plant.size = Plant::size_at(plant_type, age, size_season);
            let (water, nutrient) = self.soil_levels(x, z);
            plant.water_level = water;
            plant.nutrient_level = nutrient;

            if self.rng.gen::<f64>() < Self::healthy_probability(plant_type, age, season) {
                plant.health = HealthStatus::Healthy;
                plant.confidence = self.rng.gen_range(70.0..95.0);
                plant.disease_level = self.rng.gen_range(0.0..10.0);
            } else {
                plant.health = HealthStatus::Sick;
                plant.confidence = self.rng.gen_range(50.0..80.0);
                plant.disease_level = self.rng.gen_range(30.0..70.0);
            }
            plant.clamp_levels();
            plants.push(plant);
        }

        debug!(count, "field generated");
        Ok(PlantArena::from_plants(plants))
    }
}

/// 2-D (x, z) index over plant positions
pub fn build_index(plants: &PlantArena) -> KdTree<f32, 2> {
    let mut tree = KdTree::new();
    for plant in plants.iter() {
        tree.add(
            &[plant.position.x as f32, plant.position.z as f32],
            plant.id.index() as _,
        );
    }
    tree
}

pub fn nearest(tree: &KdTree<f32, 2>, plants: &PlantArena, x: f64, z: f64) -> Option<PlantId> {
    if plants.is_empty() {
        return None;
    }
    let (_, index) = tree.nearest_one(&[x as f32, z as f32], &squared_euclidean);
    let id = PlantId(index as u32);
    plants.get(id).map(|p| p.id)
}
