use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable plant identifier; equal to the plant's slot in its [`PlantArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlantId(pub u32);

impl PlantId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PlantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plant_{}", self.0)
    }
}

/// Per-species constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantTraits {
    /// Disease susceptibility multiplier
    pub susceptibility: f64,
    /// Probability that a freshly generated plant is healthy
    pub healthy_probability: f64,
    /// Asymptotic size [m]
    pub max_size: f64,
    /// Growth time constant [days]
    pub growth_tau: f64,
    /// Relative frequency in a generated field
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantType {
    Corn,
    Wheat,
    Soybean,
    Tomato,
}

impl PlantType {
    pub const ALL: [PlantType; 4] = [
        PlantType::Corn,
        PlantType::Wheat,
        PlantType::Soybean,
        PlantType::Tomato,
    ];

    pub fn traits(&self) -> PlantTraits {
        match self {
            PlantType::Corn => PlantTraits {
                susceptibility: 0.8,
                healthy_probability: 0.80,
                max_size: 2.5,
                growth_tau: 30.0,
                weight: 0.35,
            },
            PlantType::Wheat => PlantTraits {
                susceptibility: 0.6,
                healthy_probability: 0.85,
                max_size: 1.0,
                growth_tau: 25.0,
                weight: 0.30,
            },
            PlantType::Soybean => PlantTraits {
                susceptibility: 0.7,
                healthy_probability: 0.75,
                max_size: 0.8,
                growth_tau: 28.0,
                weight: 0.20,
            },
            PlantType::Tomato => PlantTraits {
                susceptibility: 1.0,
                healthy_probability: 0.70,
                max_size: 1.5,
                growth_tau: 35.0,
                weight: 0.15,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Sick,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    Seedling,
    Vegetative,
    Flowering,
    Mature,
}

impl GrowthStage {
    pub const VEGETATIVE_AGE: f64 = 21.0;
    pub const FLOWERING_AGE: f64 = 45.0;
    pub const MATURE_AGE: f64 = 75.0;

    pub fn from_age(age_days: f64) -> Self {
        if age_days >= Self::MATURE_AGE {
            GrowthStage::Mature
        } else if age_days >= Self::FLOWERING_AGE {
            GrowthStage::Flowering
        } else if age_days >= Self::VEGETATIVE_AGE {
            GrowthStage::Vegetative
        } else {
            GrowthStage::Seedling
        }
    }
}

/// Disease level above which a plant infects its neighbours
pub const SPREAD_THRESHOLD: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: PlantId,
    pub position: Vector3<f64>,
    pub plant_type: PlantType,
    pub health: HealthStatus,
    /// [0, 100]
    pub confidence: f64,
    /// Raw health score behind `health` [0, 100]
    pub health_score: f64,
    /// [days]
    pub age: f64,
    /// [m]
    pub size: f64,
    pub growth_stage: GrowthStage,
    pub water_level: f64,
    pub nutrient_level: f64,
    pub disease_level: f64,
}

impl Plant {
    pub fn new(id: PlantId, plant_type: PlantType, position: Vector3<f64>, age: f64) -> Self {
        let age = age.max(0.0);
        Self {
            id,
            position,
            plant_type,
            health: HealthStatus::Unknown,
            confidence: 0.0,
            health_score: 50.0,
            age,
            size: Self::size_at(plant_type, age, 1.0),
            growth_stage: GrowthStage::from_age(age),
            water_level: 50.0,
            nutrient_level: 50.0,
            disease_level: 0.0,
        }
    }

    /// `max_size * (1 - e^(-age/tau))`, scaled by a seasonal multiplier
    pub fn size_at(plant_type: PlantType, age: f64, season_multiplier: f64) -> f64 {
        let traits = plant_type.traits();
        let size = traits.max_size * (1.0 - (-age.max(0.0) / traits.growth_tau).exp());
        (size * season_multiplier).max(0.0)
    }

    /// Advance age and refresh the derived quantities.
    pub fn grow(&mut self, days: f64, season_multiplier: f64) {
        self.age += days.max(0.0);
        self.growth_stage = GrowthStage::from_age(self.age);
        self.size = Self::size_at(self.plant_type, self.age, season_multiplier);
    }

    pub fn is_spreading(&self) -> bool {
        self.disease_level > SPREAD_THRESHOLD
    }

    pub fn clamp_levels(&mut self) {
        let clamp = |v: f64| if v.is_finite() { v.clamp(0.0, 100.0) } else { 0.0 };
        self.water_level = clamp(self.water_level);
        self.nutrient_level = clamp(self.nutrient_level);
        self.disease_level = clamp(self.disease_level);
        self.confidence = clamp(self.confidence);
        self.health_score = clamp(self.health_score);
    }
}

/// Fixed-size contiguous plant storage indexed by [`PlantId`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlantArena {
    plants: Vec<Plant>,
}

impl PlantArena {
    /// Build from plants whose ids match their positions in `plants`.
    pub fn from_plants(plants: Vec<Plant>) -> Self {
        debug_assert!(plants.iter().enumerate().all(|(i, p)| p.id.index() == i));
        Self { plants }
    }

    pub fn len(&self) -> usize {
        self.plants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }

    pub fn get(&self, id: PlantId) -> Option<&Plant> {
        self.plants.get(id.index())
    }

    pub fn get_mut(&mut self, id: PlantId) -> Option<&mut Plant> {
        self.plants.get_mut(id.index())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Plant> {
        self.plants.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Plant> {
        self.plants.iter_mut()
    }

    pub fn as_slice(&self) -> &[Plant] {
        &self.plants
    }

    pub fn ids(&self) -> impl Iterator<Item = PlantId> + '_ {
        self.plants.iter().map(|p| p.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_stage_thresholds() {
        assert_eq!(GrowthStage::from_age(10.0), GrowthStage::Seedling);
        assert_eq!(GrowthStage::from_age(30.0), GrowthStage::Vegetative);
        assert_eq!(GrowthStage::from_age(60.0), GrowthStage::Flowering);
        assert_eq!(GrowthStage::from_age(90.0), GrowthStage::Mature);
        assert_eq!(GrowthStage::from_age(21.0), GrowthStage::Vegetative);
    }

    #[test]
    fn test_growth_stage_is_monotonic() {
        let mut last = GrowthStage::from_age(0.0);
        for day in 0..200 {
            let stage = GrowthStage::from_age(day as f64 * 0.75);
            assert!(stage >= last);
            last = stage;
        }
    }

    #[test]
    fn test_size_follows_saturating_curve() {
        let young = Plant::size_at(PlantType::Corn, 5.0, 1.0);
        let old = Plant::size_at(PlantType::Corn, 300.0, 1.0);
        assert!(young < old);
        assert!(old <= 2.5);
        assert_eq!(Plant::size_at(PlantType::Corn, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_type_weights_sum_to_one() {
        let total: f64 = PlantType::ALL.iter().map(|t| t.traits().weight).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_levels() {
        let mut plant = Plant::new(PlantId(0), PlantType::Wheat, Vector3::zeros(), 3.0);
        plant.water_level = 140.0;
        plant.disease_level = -3.0;
        plant.nutrient_level = f64::NAN;
        plant.clamp_levels();
        assert_eq!(plant.water_level, 100.0);
        assert_eq!(plant.disease_level, 0.0);
        assert_eq!(plant.nutrient_level, 0.0);
    }

    #[test]
    fn test_arena_lookup_by_id() {
        let plants = (0..3)
            .map(|i| Plant::new(PlantId(i), PlantType::Tomato, Vector3::zeros(), 1.0))
            .collect();
        let arena = PlantArena::from_plants(plants);
        assert_eq!(arena.len(), 3);
        assert_eq!(arena.get(PlantId(2)).map(|p| p.id), Some(PlantId(2)));
        assert!(arena.get(PlantId(3)).is_none());
    }
}
