use serde::{Deserialize, Serialize};

use crate::environment::{AgriculturalInsights, Plant, PlantId, WeatherCondition, WeatherConditions};
use crate::rendering::CameraFrame;
use crate::server::{Observation, PlantObservation, ToObservation};
use crate::simulation::engine::EngineStatus;
use crate::simulation::metrics::PerformanceMetrics;
use crate::simulation::reward::RewardSignal;
use crate::vehicles::drone::DroneState;

/// Read-only view of the engine after a tick.
///
/// Built fresh every tick; hold on to it as long as needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub status: EngineStatus,
    pub is_running: bool,
    pub is_paused: bool,
    pub step: u64,
    /// Simulated time since the last reset [s]
    pub sim_time: f64,
    pub fps: f64,
    pub performance: PerformanceMetrics,
    pub drone: DroneState,
    pub plants: Vec<Plant>,
    /// Plants inside the camera view cone, in id order
    pub visible_plants: Vec<PlantId>,
    pub weather: WeatherConditions,
    pub weather_condition: WeatherCondition,
    pub insights: AgriculturalInsights,
    pub reward: RewardSignal,
}

impl SimulationSnapshot {
    pub fn plant(&self, id: PlantId) -> Option<&Plant> {
        self.plants.get(id.index()).filter(|p| p.id == id)
    }

    pub fn altitude(&self) -> f64 {
        self.drone.altitude()
    }
}

impl ToObservation for SimulationSnapshot {
    fn to_observation(&self, frame: Option<&CameraFrame>) -> Observation {
        let v = |x: &nalgebra::Vector3<f64>| [x.x, x.y, x.z];
        Observation {
            step: self.step,
            image: None,
            image_format: None,
            position: v(&self.drone.position),
            velocity: v(&self.drone.velocity),
            rotation: v(&self.drone.rotation),
            battery: self.drone.battery,
            plants: self
                .visible_plants
                .iter()
                .filter_map(|id| self.plant(*id))
                .map(PlantObservation::from)
                .collect(),
            reward: self.reward.reward,
            terminated: self.reward.terminated,
            truncated: self.reward.truncated,
        }
        .with_frame(frame)
    }
}
