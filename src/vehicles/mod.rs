pub mod drone;
pub mod traits;

pub use drone::{ControlAction, DroneController, DroneState, FlightMode};
pub use traits::{Controls, Vehicle, VehicleState};
