use serde::{Deserialize, Serialize};

use crate::config::{ensure_positive, ConfigError};

/// Tick loop, recovery and output cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_fps: f64,
    /// Upper bound on a single tick's delta time [s]
    pub max_delta_time: f64,
    /// Consecutive failed ticks that trigger a recovery reset
    pub max_consecutive_errors: u32,
    /// Master seed; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Forward an observation to the backend every N ticks
    pub observation_interval: u64,
    /// Render a camera frame every N ticks
    pub camera_interval: u64,
    pub max_episode_steps: u64,
    /// Start in manual control
    pub manual_control: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_fps: 60.0,
            max_delta_time: 0.1,
            max_consecutive_errors: 5,
            seed: None,
            observation_interval: 1,
            camera_interval: 1,
            max_episode_steps: 1000,
            manual_control: false,
        }
    }
}

impl EngineConfig {
    /// Interval between ticks of the fixed-rate loop [ms]
    pub fn tick_interval_ms(&self) -> f64 {
        1000.0 / self.max_fps
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("engine.max_fps", self.max_fps)?;
        ensure_positive("engine.max_delta_time", self.max_delta_time)?;
        if self.max_consecutive_errors == 0 {
            return Err(ConfigError::invalid(
                "engine.max_consecutive_errors",
                self.max_consecutive_errors,
            ));
        }
        if self.observation_interval == 0 {
            return Err(ConfigError::invalid(
                "engine.observation_interval",
                self.observation_interval,
            ));
        }
        if self.camera_interval == 0 {
            return Err(ConfigError::invalid("engine.camera_interval", self.camera_interval));
        }
        Ok(())
    }
}

/// Outbound connection to the external vision/RL backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// `host:port`; the bridge is disabled when absent
    pub address: Option<String>,
    pub queue_capacity: usize,
    pub reconnect_interval_ms: u64,
    pub max_reconnect_attempts: u32,
    /// Also bounds each blocking write to the backend
    pub connect_timeout_ms: u64,
    /// How long closing waits for queued messages to flush
    pub close_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            address: None,
            queue_capacity: 16,
            reconnect_interval_ms: 5000,
            max_reconnect_attempts: 10,
            connect_timeout_ms: 2000,
            close_timeout_ms: 2000,
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::invalid("bridge.queue_capacity", self.queue_capacity));
        }
        if let Some(address) = &self.address {
            if address.trim().is_empty() {
                return Err(ConfigError::invalid("bridge.address", address));
            }
        }
        Ok(())
    }
}
