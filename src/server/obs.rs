use serde::{Deserialize, Serialize};

use crate::environment::{GrowthStage, HealthStatus, Plant, PlantId, PlantType};
use crate::rendering::CameraFrame;

/// Plant as reported to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantObservation {
    pub id: PlantId,
    pub position: [f64; 3],
    pub plant_type: PlantType,
    pub health: HealthStatus,
    pub confidence: f64,
    pub growth_stage: GrowthStage,
    pub disease_level: f64,
}

impl From<&Plant> for PlantObservation {
    fn from(plant: &Plant) -> Self {
        Self {
            id: plant.id,
            position: [plant.position.x, plant.position.y, plant.position.z],
            plant_type: plant.plant_type,
            health: plant.health,
            confidence: plant.confidence,
            growth_stage: plant.growth_stage,
            disease_level: plant.disease_level,
        }
    }
}

/// Payload forwarded to the external vision/RL service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub step: u64,
    /// Base64-encoded camera frame
    pub image: Option<String>,
    pub image_format: Option<String>,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub rotation: [f64; 3],
    pub battery: f64,
    /// Plants inside the camera view
    pub plants: Vec<PlantObservation>,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
}

impl Observation {
    pub fn with_frame(mut self, frame: Option<&CameraFrame>) -> Self {
        self.image = frame.map(|f| f.to_base64());
        self.image_format = frame.map(|f| f.format.mime_type().to_string());
        self
    }
}

/// Anything that can be turned into a backend observation
pub trait ToObservation {
    fn to_observation(&self, frame: Option<&CameraFrame>) -> Observation;
}
