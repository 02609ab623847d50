use crate::physics::components::forces::ForceSystem;
use crate::physics::error::PhysicsError;
use nalgebra::{Matrix3, UnitQuaternion, Vector3};

/// Handles mass properties and motion integration for one rigid body
#[derive(Debug, Clone)]
pub struct MotionSystem {
    /// Mass of the body [kg]
    mass: f64,
    /// Body-frame inertia tensor [kg⋅m²]
    inertia: Matrix3<f64>,
    /// Inverse of the body-frame inertia tensor
    inertia_inv: Matrix3<f64>,
    /// Linear acceleration [m/s²]
    acceleration: Vector3<f64>,
    /// Angular acceleration in world frame [rad/s²]
    angular_acceleration: Vector3<f64>,
}

impl MotionSystem {
    pub fn new(mass: f64, inertia: Matrix3<f64>) -> Result<Self, PhysicsError> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(PhysicsError::InvalidParameter(
                "Mass must be positive".into(),
            ));
        }

        if !is_inertia_valid(&inertia) {
            return Err(PhysicsError::InvalidParameter(
                "Invalid inertia tensor".into(),
            ));
        }

        let inertia_inv = inertia.try_inverse().ok_or_else(|| {
            PhysicsError::ComputationError("Failed to invert inertia tensor".into())
        })?;

        Ok(Self {
            mass,
            inertia,
            inertia_inv,
            acceleration: Vector3::zeros(),
            angular_acceleration: Vector3::zeros(),
        })
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Inverse inertia rotated into the world frame: R I⁻¹ Rᵀ
    pub fn world_inertia_inv(&self, attitude: &UnitQuaternion<f64>) -> Matrix3<f64> {
        let r = attitude.to_rotation_matrix();
        r.matrix() * self.inertia_inv * r.matrix().transpose()
    }

    /// Update accelerations from accumulated forces plus uniform gravity
    pub fn update_accelerations(
        &mut self,
        force_system: &ForceSystem,
        gravity: &Vector3<f64>,
        attitude: &UnitQuaternion<f64>,
    ) {
        self.acceleration = force_system.net_force() / self.mass + gravity;
        self.angular_acceleration = self.world_inertia_inv(attitude) * force_system.net_moment();
    }

    /// Integrate motion for one timestep using semi-implicit Euler integration
    pub fn integrate(
        &self,
        position: &mut Vector3<f64>,
        velocity: &mut Vector3<f64>,
        attitude: &mut UnitQuaternion<f64>,
        angular_velocity: &mut Vector3<f64>,
        dt: f64,
    ) -> Result<(), PhysicsError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(PhysicsError::InvalidParameter(
                "Timestep must be positive".into(),
            ));
        }

        // Velocities first (semi-implicit Euler)
        *velocity += self.acceleration * dt;
        *angular_velocity += self.angular_acceleration * dt;

        *position += *velocity * dt;

        let omega = UnitQuaternion::from_scaled_axis(*angular_velocity * dt);
        *attitude = omega * *attitude;

        Ok(())
    }

    /// Apply an instantaneous impulse at `offset` from the centre of mass (world frame)
    pub fn apply_impulse(
        &self,
        velocity: &mut Vector3<f64>,
        angular_velocity: &mut Vector3<f64>,
        attitude: &UnitQuaternion<f64>,
        impulse: &Vector3<f64>,
        offset: Option<&Vector3<f64>>,
    ) {
        *velocity += impulse / self.mass;
        if let Some(offset) = offset {
            *angular_velocity += self.world_inertia_inv(attitude) * offset.cross(impulse);
        }
    }

    /// Compute kinetic energy of the body
    pub fn kinetic_energy(&self, velocity: &Vector3<f64>, angular_velocity: &Vector3<f64>) -> f64 {
        let translational = 0.5 * self.mass * velocity.norm_squared();
        let rotational = 0.5 * angular_velocity.dot(&(self.inertia * angular_velocity));
        translational + rotational
    }

    pub fn linear_acceleration(&self) -> Vector3<f64> {
        self.acceleration
    }

    pub fn angular_acceleration(&self) -> Vector3<f64> {
        self.angular_acceleration
    }
}

/// Clamp linear and angular speed to the configured limits
pub fn apply_velocity_limits(
    velocity: &mut Vector3<f64>,
    angular_velocity: &mut Vector3<f64>,
    max_velocity: f64,
    max_angular_velocity: f64,
) {
    let speed = velocity.norm();
    if speed > max_velocity {
        *velocity *= max_velocity / speed;
    }

    let rate = angular_velocity.norm();
    if rate > max_angular_velocity {
        *angular_velocity *= max_angular_velocity / rate;
    }
}

/// Check if inertia tensor is valid (symmetric and positive definite)
fn is_inertia_valid(inertia: &Matrix3<f64>) -> bool {
    if !is_matrix_symmetric(inertia) {
        return false;
    }

    let eigenvals = match inertia.symmetric_eigen().eigenvalues.as_slice() {
        [x, y, z] => [*x, *y, *z],
        _ => return false,
    };

    eigenvals.iter().all(|&v| v > 0.0)
}

fn is_matrix_symmetric(mat: &Matrix3<f64>) -> bool {
    const EPSILON: f64 = 1e-10;
    for i in 0..3 {
        for j in 0..3 {
            if (mat[(i, j)] - mat[(j, i)]).abs() > EPSILON {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn unit_body() -> MotionSystem {
        MotionSystem::new(1.0, Matrix3::identity()).unwrap()
    }

    #[test]
    fn test_invalid_mass() {
        assert!(MotionSystem::new(-1.0, Matrix3::identity()).is_err());
        assert!(MotionSystem::new(f64::NAN, Matrix3::identity()).is_err());
    }

    #[test]
    fn test_invalid_inertia() {
        let skewed = Matrix3::new(1.0, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        assert!(MotionSystem::new(1.0, skewed).is_err());
    }

    #[test]
    fn test_integration_under_gravity() {
        let mut motion = unit_body();
        let gravity = Vector3::new(0.0, -10.0, 0.0);
        motion.update_accelerations(&ForceSystem::new(), &gravity, &UnitQuaternion::identity());

        let mut position = Vector3::zeros();
        let mut velocity = Vector3::new(1.0, 0.0, 0.0);
        let mut attitude = UnitQuaternion::identity();
        let mut angular_velocity = Vector3::new(0.0, PI, 0.0);

        motion
            .integrate(
                &mut position,
                &mut velocity,
                &mut attitude,
                &mut angular_velocity,
                0.1,
            )
            .unwrap();

        assert!((velocity.y + 1.0).abs() < 1e-10);
        assert!((position.x - 0.1).abs() < 1e-10);
        assert!((position.y + 0.1).abs() < 1e-10);
        assert!((attitude.angle() - PI * 0.1).abs() < 1e-10);
    }

    #[test]
    fn test_rejects_non_positive_timestep() {
        let motion = unit_body();
        let mut p = Vector3::zeros();
        let mut v = Vector3::zeros();
        let mut q = UnitQuaternion::identity();
        let mut w = Vector3::zeros();
        assert!(motion.integrate(&mut p, &mut v, &mut q, &mut w, 0.0).is_err());
    }

    #[test]
    fn test_off_centre_impulse_spins_body() {
        let motion = unit_body();
        let mut v = Vector3::zeros();
        let mut w = Vector3::zeros();
        motion.apply_impulse(
            &mut v,
            &mut w,
            &UnitQuaternion::identity(),
            &Vector3::new(0.0, 1.0, 0.0),
            Some(&Vector3::new(1.0, 0.0, 0.0)),
        );
        assert!((v.y - 1.0).abs() < 1e-10);
        assert!((w.z - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_kinetic_energy() {
        let motion = MotionSystem::new(2.0, Matrix3::identity()).unwrap();
        let energy = motion.kinetic_energy(&Vector3::new(1.0, 0.0, 0.0), &Vector3::new(0.0, 0.0, 1.0));
        // 1/2 * 2 * 1 + 1/2 * 1 = 1.5
        assert!((energy - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_velocity_limits() {
        let mut v = Vector3::new(30.0, 40.0, 0.0);
        let mut w = Vector3::new(0.0, 0.0, -50.0);
        apply_velocity_limits(&mut v, &mut w, 10.0, 5.0);
        assert!((v.norm() - 10.0).abs() < 1e-10);
        assert!((w.z + 5.0).abs() < 1e-10);
    }
}
