use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::vehicles::drone::{ControlAction, DroneState};

/// Reward and episode flags for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardSignal {
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
}

/// Shaping terms for RL consumers of the observation stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardParams {
    pub airborne_altitude: f64,
    pub airborne_reward: f64,
    pub grounded_penalty: f64,
    pub exploration_scale: f64,
    pub exploration_cap: f64,
    pub speed_limit: f64,
    pub speed_penalty: f64,
    pub action_cost: f64,
    /// Episode ends below this altitude [m]
    pub crash_altitude: f64,
    /// Episode ends outside |x|, |z| <= this [m]
    pub boundary: f64,
}

impl Default for RewardParams {
    fn default() -> Self {
        Self {
            airborne_altitude: 1.0,
            airborne_reward: 0.1,
            grounded_penalty: -1.0,
            exploration_scale: 0.1,
            exploration_cap: 0.5,
            speed_limit: 5.0,
            speed_penalty: -0.1,
            action_cost: 0.01,
            crash_altitude: 0.5,
            boundary: 30.0,
        }
    }
}

/// Episode-scoped reward accumulator. Signals are informational; the
/// engine keeps running when an episode terminates.
#[derive(Debug, Clone)]
pub struct RewardTracker {
    params: RewardParams,
    max_episode_steps: u64,
    last_position: Option<Vector3<f64>>,
    steps: u64,
    total: f64,
}

impl RewardTracker {
    pub fn new(max_episode_steps: u64) -> Self {
        Self::with_params(RewardParams::default(), max_episode_steps)
    }

    pub fn with_params(params: RewardParams, max_episode_steps: u64) -> Self {
        Self {
            params,
            max_episode_steps,
            last_position: None,
            steps: 0,
            total: 0.0,
        }
    }

    pub fn params(&self) -> &RewardParams {
        &self.params
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn evaluate(&mut self, state: &DroneState, action: &ControlAction) -> RewardSignal {
        let p = &self.params;
        let altitude = state.altitude();

        let mut reward = if altitude > p.airborne_altitude {
            p.airborne_reward
        } else {
            p.grounded_penalty
        };

        if let Some(last) = self.last_position {
            let moved = (state.position - last).norm();
            reward += (p.exploration_scale * moved).min(p.exploration_cap);
        }
        if state.velocity.norm() > p.speed_limit {
            reward += p.speed_penalty;
        }
        reward -= p.action_cost * action.magnitude();

        let terminated = altitude < p.crash_altitude
            || state.position.x.abs() > p.boundary
            || state.position.z.abs() > p.boundary;

        self.last_position = Some(state.position);
        self.steps += 1;
        self.total += reward;

        RewardSignal {
            reward,
            terminated,
            truncated: self.steps >= self.max_episode_steps,
        }
    }

    pub fn reset(&mut self) {
        self.last_position = None;
        self.steps = 0;
        self.total = 0.0;
    }
}
