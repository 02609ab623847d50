mod forces;
mod motion;

pub use forces::{Force, ForceSystem, ForceType, Moment, ReferenceFrame};
pub use motion::{apply_velocity_limits, MotionSystem};
