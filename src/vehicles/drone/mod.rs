pub mod controller;
pub mod controls;
pub mod pid;
pub mod safety;
pub mod state;

pub use controller::{DroneController, DRONE_BODY};
pub use controls::{mix_motors, ControlAction, MotorThrusts, MOTOR_COUNT};
pub use pid::AltitudePid;
pub use safety::{SafetyDecision, SafetyEnvelope, SafetyOverride};
pub use state::{DroneState, FlightMode};
