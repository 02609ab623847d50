use serde::{Deserialize, Serialize};

use crate::utils::errors::SimError;
use crate::utils::math::{finite_or, lerp};
use crate::vehicles::traits::Controls;

pub const MOTOR_COUNT: usize = 4;

/// Per-motor thrust fractions in [0, 1], ordered FL, FR, RL, RR
pub type MotorThrusts = [f64; MOTOR_COUNT];

/// Stick input for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlAction {
    pub thrust: f64, // [0, 1] by convention
    pub pitch: f64,  // [-1, 1]
    pub roll: f64,   // [-1, 1]
    pub yaw: f64,    // [-1, 1]
}

impl ControlAction {
    /// Build an action, replacing non-finite inputs with 0 and clamping to [-1, 1].
    pub fn new(thrust: f64, pitch: f64, roll: f64, yaw: f64) -> Self {
        Self {
            thrust,
            pitch,
            roll,
            yaw,
        }
        .sanitized()
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.thrust, self.pitch, self.roll, self.yaw]
    }

    /// Level collective thrust with no attitude input
    pub fn hover(thrust: f64) -> Self {
        Self::new(thrust, 0.0, 0.0, 0.0)
    }

    pub fn sanitized(self) -> Self {
        let clean = |v: f64| finite_or(v, 0.0).clamp(-1.0, 1.0);
        Self {
            thrust: clean(self.thrust),
            pitch: clean(self.pitch),
            roll: clean(self.roll),
            yaw: clean(self.yaw),
        }
    }

    /// Sum of absolute stick deflections
    pub fn magnitude(&self) -> f64 {
        self.thrust.abs() + self.pitch.abs() + self.roll.abs() + self.yaw.abs()
    }
}

impl Controls for ControlAction {
    /// Strict check used for externally supplied actions
    fn validate(&self) -> Result<(), SimError> {
        for (name, value) in [
            ("thrust", self.thrust),
            ("pitch", self.pitch),
            ("roll", self.roll),
            ("yaw", self.yaw),
        ] {
            if !value.is_finite() {
                return Err(SimError::InvalidControl(format!("{} is not finite", name)));
            }
            if !(-1.0..=1.0).contains(&value) {
                return Err(SimError::InvalidControl(format!(
                    "{} out of bounds: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    fn interpolate(&self, other: &Self, factor: f64) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Self::new(
            lerp(self.thrust, other.thrust, f),
            lerp(self.pitch, other.pitch, f),
            lerp(self.roll, other.roll, f),
            lerp(self.yaw, other.yaw, f),
        )
    }
}

/// X-configuration mixer.
///
/// Attitude inputs are scaled by `authority` before mixing; each motor is
/// clamped to [0, 1].
pub fn mix_motors(action: &ControlAction, authority: f64) -> MotorThrusts {
    let t = action.thrust;
    let p = action.pitch * authority;
    let r = action.roll * authority;
    let y = action.yaw * authority;

    [
        t + p + r - y, // front left
        t + p - r + y, // front right
        t - p + r + y, // rear left
        t - p - r - y, // rear right
    ]
    .map(|m| finite_or(m, 0.0).clamp(0.0, 1.0))
}
