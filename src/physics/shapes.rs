use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::physics::PhysicsError;

/// Collision geometry of a rigid body, centred on its centre of mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere { radius: f64 },
    Cuboid { half_extents: Vector3<f64> },
}

impl Shape {
    pub fn sphere(radius: f64) -> Self {
        Shape::Sphere { radius }
    }

    pub fn cuboid(hx: f64, hy: f64, hz: f64) -> Self {
        Shape::Cuboid {
            half_extents: Vector3::new(hx, hy, hz),
        }
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        let valid = match self {
            Shape::Sphere { radius } => radius.is_finite() && *radius > 0.0,
            Shape::Cuboid { half_extents } => half_extents.iter().all(|h| h.is_finite() && *h > 0.0),
        };
        if valid {
            Ok(())
        } else {
            Err(PhysicsError::InvalidParameter(format!(
                "degenerate shape {:?}",
                self
            )))
        }
    }

    /// Body-frame inertia tensor of a solid shape with uniform density
    pub fn inertia(&self, mass: f64) -> Matrix3<f64> {
        match self {
            Shape::Sphere { radius } => Matrix3::identity() * (0.4 * mass * radius * radius),
            Shape::Cuboid { half_extents: h } => {
                let (x2, y2, z2) = (h.x * h.x, h.y * h.y, h.z * h.z);
                Matrix3::from_diagonal(&Vector3::new(
                    mass / 3.0 * (y2 + z2),
                    mass / 3.0 * (x2 + z2),
                    mass / 3.0 * (x2 + y2),
                ))
            }
        }
    }

    /// Radius of the smallest sphere enclosing the shape
    pub fn bounding_radius(&self) -> f64 {
        match self {
            Shape::Sphere { radius } => *radius,
            Shape::Cuboid { half_extents } => half_extents.norm(),
        }
    }

    /// Distance from the centre to the lowest point along world -y
    pub fn vertical_extent(&self, attitude: &UnitQuaternion<f64>) -> f64 {
        match self {
            Shape::Sphere { radius } => *radius,
            Shape::Cuboid { half_extents } => {
                let rotation = attitude.to_rotation_matrix();
                let m = rotation.matrix();
                (0..3).map(|i| m[(1, i)].abs() * half_extents[i]).sum()
            }
        }
    }
}

/// Surface response used when resolving contacts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub friction: f64,
    pub restitution: f64,
    pub linear_damping: f64,
    pub angular_damping: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.2,
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }
}

impl Material {
    pub fn new(friction: f64, restitution: f64) -> Self {
        Self {
            friction: friction.max(0.0),
            restitution: restitution.clamp(0.0, 1.0),
            ..Self::default()
        }
    }

    /// Light composite airframe: grippy and barely bouncy
    pub fn airframe() -> Self {
        Self {
            friction: 0.8,
            restitution: 0.1,
            linear_damping: 0.0,
            angular_damping: 0.5,
        }
    }

    pub fn rubber() -> Self {
        Self::new(0.9, 0.8)
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear.max(0.0);
        self.angular_damping = angular.max(0.0);
        self
    }

    /// Combined response of two touching materials
    pub fn combine(&self, other: &Material) -> Material {
        Material {
            friction: (self.friction * other.friction).sqrt(),
            restitution: self.restitution.max(other.restitution),
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }
}
