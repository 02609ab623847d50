use crate::physics::PhysicsWorld;
use crate::utils::errors::SimError;
use nalgebra::{UnitQuaternion, Vector3};

/// A vehicle that owns one body inside a [`PhysicsWorld`]
pub trait Vehicle {
    type State;
    type Controls;

    /// Create (or re-place) the vehicle body at its start pose.
    fn spawn(&mut self, world: &mut PhysicsWorld) -> Result<(), SimError>;
    /// Read back physics state and apply forces for the next step.
    fn update(&mut self, world: &mut PhysicsWorld, dt: f64) -> Result<(), SimError>;
    fn get_state(&self) -> &Self::State;
    fn set_controls(&mut self, controls: Self::Controls);
    fn reset(&mut self, world: &mut PhysicsWorld) -> Result<(), SimError>;
}

pub trait VehicleState {
    fn position(&self) -> Vector3<f64>;
    fn velocity(&self) -> Vector3<f64>;
    fn attitude(&self) -> UnitQuaternion<f64>;
    fn rates(&self) -> Vector3<f64>;
}

pub trait Controls {
    fn validate(&self) -> Result<(), SimError>;
    fn interpolate(&self, other: &Self, factor: f64) -> Self;
}
