use nalgebra::{UnitQuaternion, Vector3};
use std::f64::consts::PI;

/// Convert degrees to radians
#[inline]
pub fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

/// Convert radians to degrees
#[inline]
pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// Linear interpolation between two values
#[inline]
pub fn lerp(start: f64, end: f64, factor: f64) -> f64 {
    start + (end - start) * factor.clamp(0.0, 1.0)
}

/// Wrap an angle in degrees into [0, 360)
pub fn wrap_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an hour value into [0, 24)
pub fn wrap_hours(hours: f64) -> f64 {
    let wrapped = hours.rem_euclid(24.0);
    if wrapped >= 24.0 {
        0.0
    } else {
        wrapped
    }
}

/// Distance between two points in the horizontal (x/z) plane
#[inline]
pub fn horizontal_distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.z - b.z).powi(2)).sqrt()
}

/// Replace a non-finite value with a fallback
#[inline]
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Convert a quaternion to Euler angles (roll, pitch, yaw)
pub fn quaternion_to_euler(quat: &UnitQuaternion<f64>) -> Vector3<f64> {
    let (roll, pitch, yaw) = quat.euler_angles();
    Vector3::new(roll, pitch, yaw)
}

/// Build a quaternion from Euler angles (roll, pitch, yaw)
pub fn euler_to_quaternion(euler: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(euler.x, euler.y, euler.z)
}
