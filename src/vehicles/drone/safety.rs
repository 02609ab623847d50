use serde::{Deserialize, Serialize};

use crate::config::SafetyConfig;

/// Which safety rule, if any, overrode the commanded thrust this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyOverride {
    #[default]
    None,
    HardCeiling,
    SoftCeiling,
    GroundFloor,
    ClimbRate,
    Emergency,
}

impl SafetyOverride {
    /// Rules that cut every motor rather than reshaping collective thrust
    pub fn is_cut(&self) -> bool {
        matches!(self, SafetyOverride::HardCeiling | SafetyOverride::ClimbRate)
    }
}

/// Result of applying the envelope to a commanded thrust
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyDecision {
    pub thrust: f64,
    pub rule: SafetyOverride,
}

/// Unconditional thrust overrides, checked in priority order
#[derive(Debug, Clone)]
pub struct SafetyEnvelope {
    config: SafetyConfig,
}

impl SafetyEnvelope {
    pub fn new(config: SafetyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// First matching rule wins:
    /// hard ceiling, soft ceiling, ground floor, climb rate.
    pub fn evaluate(&self, altitude: f64, vertical_speed: f64, thrust: f64) -> SafetyDecision {
        let c = &self.config;

        if altitude > c.hard_ceiling {
            return SafetyDecision {
                thrust: 0.0,
                rule: SafetyOverride::HardCeiling,
            };
        }
        if altitude > c.soft_ceiling {
            return SafetyDecision {
                thrust: thrust.min(c.soft_ceiling_thrust),
                rule: SafetyOverride::SoftCeiling,
            };
        }
        if altitude < c.ground_clearance {
            return SafetyDecision {
                thrust: thrust.max(c.ground_thrust_floor),
                rule: SafetyOverride::GroundFloor,
            };
        }
        if vertical_speed > c.max_climb_rate {
            return SafetyDecision {
                thrust: 0.0,
                rule: SafetyOverride::ClimbRate,
            };
        }

        SafetyDecision {
            thrust,
            rule: SafetyOverride::None,
        }
    }
}
