pub mod disease;
pub mod field;
pub mod generator;
pub mod health;
pub mod plant;
pub mod weather;

pub use field::{EffectKind, Environment};
pub use generator::FieldGenerator;
pub use plant::{GrowthStage, HealthStatus, Plant, PlantArena, PlantId, PlantType};
pub use weather::{AgriculturalInsights, Season, WeatherCondition, WeatherConditions, WeatherModel};
