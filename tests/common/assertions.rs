use agriflyer::{DroneState, Plant};
use approx::assert_relative_eq;
use nalgebra::Vector3;

/// Assert that every kinematic quantity is finite and the battery is in range
#[track_caller]
pub fn assert_drone_state_valid(state: &DroneState) {
    for (name, v) in [
        ("position", &state.position),
        ("rotation", &state.rotation),
        ("velocity", &state.velocity),
        ("angular velocity", &state.angular_velocity),
    ] {
        assert!(v.iter().all(|c| c.is_finite()), "{} is not finite: {:?}", name, v);
    }
    assert!(
        (0.0..=100.0).contains(&state.battery),
        "battery out of range: {}",
        state.battery
    );
    assert_motors_in_unit_interval(&state.motor_thrusts);
}

#[track_caller]
pub fn assert_motors_in_unit_interval(motors: &[f64; 4]) {
    for (i, m) in motors.iter().enumerate() {
        assert!((0.0..=1.0).contains(m), "motor {} outside [0, 1]: {}", i, m);
    }
}

/// Assert that all bounded plant quantities stay inside [0, 100]
#[track_caller]
pub fn assert_plants_in_range<'a>(plants: impl IntoIterator<Item = &'a Plant>) {
    for plant in plants {
        for (name, value) in [
            ("confidence", plant.confidence),
            ("health score", plant.health_score),
            ("water", plant.water_level),
            ("nutrient", plant.nutrient_level),
            ("disease", plant.disease_level),
        ] {
            assert!(
                (0.0..=100.0).contains(&value),
                "{} {} out of range: {}",
                plant.id,
                name,
                value
            );
        }
        assert!(plant.size >= 0.0, "{} has negative size", plant.id);
        assert!(plant.age >= 0.0, "{} has negative age", plant.id);
    }
}

#[track_caller]
pub fn assert_position_eq(actual: &Vector3<f64>, expected: &Vector3<f64>, epsilon: f64) {
    assert_relative_eq!(actual.x, expected.x, epsilon = epsilon);
    assert_relative_eq!(actual.y, expected.y, epsilon = epsilon);
    assert_relative_eq!(actual.z, expected.z, epsilon = epsilon);
}
