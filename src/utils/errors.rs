use std::io;
use thiserror::Error;

use crate::config::ConfigError;
use crate::physics::PhysicsError;
use crate::server::BridgeError;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Physics error: {0}")]
    Physics(#[from] PhysicsError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid control input: {0}")]
    InvalidControl(String),

    #[error("Vehicle error: {0}")]
    VehicleError(String),

    #[error("Environment error: {0}")]
    EnvironmentError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Engine not initialized: {0}")]
    NotInitialized(String),

    #[error("Engine runner has shut down")]
    RunnerClosed,

    #[error("Injected fault at step {0}")]
    InjectedFault(u64),
}
