//! Real-time agricultural drone simulation.
//!
//! A fixed-timestep loop flies a quadrotor over a procedurally generated
//! crop field, evolves plant health and weather, renders a synthetic
//! downward camera and streams observations to an external backend.

pub mod config;
pub mod environment;
pub mod physics;
pub mod rendering;
pub mod server;
pub mod simulation;
pub mod utils;
pub mod vehicles;

pub use config::{ConfigPatch, SimulationConfig};
pub use environment::{EffectKind, Environment, Plant, PlantId};
pub use physics::PhysicsWorld;
pub use rendering::{CameraFrame, CameraRenderer};
pub use server::{BackendBridge, Observation};
pub use simulation::{
    EngineHandle, EngineStatus, SimulationEngine, SimulationEvent, SimulationRunner,
    SimulationSnapshot, TickOutcome,
};
pub use utils::errors::SimError;
pub use vehicles::drone::{ControlAction, DroneController, DroneState, FlightMode};
