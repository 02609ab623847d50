use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PhysicsConfig;
use crate::physics::error::PhysicsError;
use crate::physics::shapes::{Material, Shape};

/// Stable identifier of a rigid body
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(String);

impl BodyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Reserved id reported for contacts with the ground plane
    pub fn ground() -> Self {
        Self("ground".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BodyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Position and orientation of a body in world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vector3<f64>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }

    /// Transform a body-frame point into world coordinates
    pub fn transform_point(&self, local: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * local.coords + self.position)
    }

    pub fn up(&self) -> Vector3<f64> {
        self.rotation * Vector3::y()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::from_position(Vector3::zeros())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub linear: Vector3<f64>,
    pub angular: Vector3<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    Dynamic,
    /// Participates in contacts but never moves
    Static,
}

/// Everything needed to create a rigid body
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub shape: Shape,
    pub mass: f64,
    pub pose: Pose,
    pub material: Material,
    pub kind: BodyKind,
}

impl BodyDesc {
    pub fn dynamic(shape: Shape, mass: f64, pose: Pose, material: Material) -> Self {
        Self {
            shape,
            mass,
            pose,
            material,
            kind: BodyKind::Dynamic,
        }
    }

    pub fn fixed(shape: Shape, pose: Pose, material: Material) -> Self {
        Self {
            shape,
            mass: 1.0,
            pose,
            material,
            kind: BodyKind::Static,
        }
    }
}

/// A contact resolved during one integration step
#[derive(Debug, Clone, PartialEq)]
pub struct ContactEvent {
    pub a: BodyId,
    pub b: BodyId,
    pub point: Point3<f64>,
    /// Contact normal pointing from `b` towards `a`
    pub normal: Vector3<f64>,
    /// Closing speed along the normal before resolution [m/s]
    pub relative_speed: f64,
}

impl ContactEvent {
    /// Body pair in canonical (sorted) order
    pub fn pair(&self) -> (BodyId, BodyId) {
        ordered_pair(&self.a, &self.b)
    }
}

pub fn ordered_pair(a: &BodyId, b: &BodyId) -> (BodyId, BodyId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// The operations a rigid-body backend must provide.
///
/// Forces and torques accumulate until [`RigidBodyEngine::clear_forces`] so
/// that one set of control inputs acts across every sub-step of a frame.
pub trait RigidBodyEngine: Send {
    fn add_body(&mut self, id: BodyId, desc: BodyDesc) -> Result<(), PhysicsError>;
    fn remove_body(&mut self, id: &BodyId) -> Result<(), PhysicsError>;
    fn contains(&self, id: &BodyId) -> bool;
    fn body_count(&self) -> usize;

    /// Advance by exactly `dt`, returning the contacts resolved on the way
    fn step(&mut self, dt: f64) -> Result<Vec<ContactEvent>, PhysicsError>;

    fn apply_force(
        &mut self,
        id: &BodyId,
        force: Vector3<f64>,
        point: Option<Point3<f64>>,
    ) -> Result<(), PhysicsError>;
    fn apply_impulse(
        &mut self,
        id: &BodyId,
        impulse: Vector3<f64>,
        point: Option<Point3<f64>>,
    ) -> Result<(), PhysicsError>;
    fn apply_torque(&mut self, id: &BodyId, torque: Vector3<f64>) -> Result<(), PhysicsError>;
    fn clear_forces(&mut self);

    fn transform(&self, id: &BodyId) -> Option<Pose>;
    fn velocity(&self, id: &BodyId) -> Option<Velocity>;
    fn set_transform(&mut self, id: &BodyId, pose: Pose) -> Result<(), PhysicsError>;
    fn set_velocity(&mut self, id: &BodyId, velocity: Velocity) -> Result<(), PhysicsError>;

    /// Ids of bodies whose centre lies within `radius` of `center`, sorted
    fn bodies_in_radius(&self, center: &Point3<f64>, radius: f64) -> Vec<BodyId>;

    fn set_gravity(&mut self, gravity: Vector3<f64>);
    /// Take world-level settings (gravity, ground, velocity limits) from `config`
    fn configure(&mut self, config: &PhysicsConfig);
    /// Remove every body
    fn clear(&mut self);
}
