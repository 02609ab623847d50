use agriflyer::config::{DroneConfig, PhysicsConfig};
use agriflyer::physics::{PhysicsWorld, Pose};
use agriflyer::vehicles::drone::{mix_motors, SafetyOverride, DRONE_BODY};
use agriflyer::{ControlAction, DroneController, FlightMode};
use nalgebra::Vector3;

use crate::common::{
    assert_drone_state_valid, assert_motors_in_unit_interval, create_fast_config, TestEngineBuilder,
    DT,
};

#[test]
fn test_full_thrust_climbs_until_soft_ceiling() {
    let mut test = TestEngineBuilder::new().with_manual_control().build();
    let snapshots = test.fly(ControlAction::new(1.0, 0.0, 0.0, 0.0), 900);

    let engaged = snapshots
        .iter()
        .position(|s| s.drone.safety == SafetyOverride::SoftCeiling)
        .expect("soft ceiling engages");

    for pair in snapshots[..engaged].windows(2) {
        assert!(
            pair[1].drone.position.y >= pair[0].drone.position.y - 1e-9,
            "altitude dropped at step {}: {} -> {}",
            pair[1].step,
            pair[0].drone.position.y,
            pair[1].drone.position.y
        );
    }
    assert!(snapshots[engaged].drone.position.y > 40.0);

    let soft_thrust = test.engine.config().drone.safety.soft_ceiling_thrust;
    for s in snapshots.iter().filter(|s| s.drone.safety == SafetyOverride::SoftCeiling) {
        assert!(s.drone.commanded_thrust <= soft_thrust + 1e-12);
    }
    for s in &snapshots {
        assert!(s.drone.position.y < 50.0);
        assert_drone_state_valid(&s.drone);
    }
}

#[test]
fn test_battery_is_non_increasing_and_floored() {
    let mut config = create_fast_config();
    config.drone.battery_drain_rate = 60.0;
    let mut test = TestEngineBuilder::new()
        .with_config(config)
        .with_manual_control()
        .build();
    let snapshots = test.fly(ControlAction::new(0.8, 0.0, 0.0, 0.0), 400);

    for pair in snapshots.windows(2) {
        assert!(pair[1].drone.battery <= pair[0].drone.battery);
    }
    let last = snapshots.last().unwrap();
    assert_eq!(last.drone.battery, 0.0);
    assert!(last.drone.motor_thrusts.iter().all(|m| *m < 1e-3));
}

#[test]
fn test_hard_ceiling_forces_zero_thrust() {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());
    world.initialize().unwrap();
    let mut drone = DroneController::new(DroneConfig::default()).unwrap();
    drone.spawn(&mut world).unwrap();
    drone.arm();

    world
        .set_transform(&DRONE_BODY.into(), Pose::from_position(Vector3::new(0.0, 55.0, 0.0)))
        .unwrap();
    for thrust in [0.0, 0.5, 1.0] {
        drone.set_action(ControlAction::new(thrust, 0.3, -0.3, 0.5));
        world.step(DT).unwrap();
        drone.update(&mut world, DT).unwrap();
        assert_eq!(drone.state().commanded_thrust, 0.0);
        assert_eq!(drone.state().safety, SafetyOverride::HardCeiling);
        assert_eq!(drone.target_motors(), [0.0; 4]);
    }
}

#[test]
fn test_height_lock_holds_new_target() {
    let mut test = TestEngineBuilder::new().with_manual_control().build();
    assert_eq!(test.engine.toggle_height_lock(), Some(true));
    test.engine.set_target_altitude(12.0);

    let snapshots = test.fly(ControlAction::new(0.0, 0.0, 0.0, 0.0), 900);
    let last = snapshots.last().unwrap();
    assert_eq!(last.drone.flight_mode, FlightMode::Stabilized);
    assert!(
        (last.drone.position.y - 12.0).abs() < 0.5,
        "altitude {}",
        last.drone.position.y
    );
}

#[test]
fn test_target_altitude_is_clamped_to_soft_ceiling() {
    let mut test = TestEngineBuilder::new().with_manual_control().build();
    test.engine.set_target_altitude(500.0);
    assert_eq!(test.state().drone.target_altitude, 40.0);
    test.engine.set_target_altitude(-3.0);
    assert_eq!(test.state().drone.target_altitude, 0.0);
}

#[test]
fn test_emergency_land_overrides_manual_input() {
    let mut test = TestEngineBuilder::new().with_manual_control().build();
    test.engine.set_drone_action(ControlAction::new(1.0, 0.0, 0.0, 0.0));
    test.engine.emergency_land();

    let snapshots = test.run_steps(600);
    let last = snapshots.last().unwrap();
    assert!(last.drone.emergency);
    assert!(last.drone.position.y < 1.5, "altitude {}", last.drone.position.y);
    assert!(snapshots[60].drone.position.y < 5.0);
    assert!(matches!(
        last.drone.safety,
        SafetyOverride::Emergency | SafetyOverride::GroundFloor
    ));
}

#[test]
fn test_mixer_output_is_bounded_for_all_valid_actions() {
    let levels = [-1.0, -0.6, -0.2, 0.0, 0.3, 0.7, 1.0];
    for &t in &[0.0, 0.25, 0.5, 0.75, 1.0] {
        for &p in &levels {
            for &r in &levels {
                for &y in &levels {
                    let action = ControlAction::new(t, p, r, y);
                    assert_motors_in_unit_interval(&mix_motors(&action, 1.0));
                    assert_motors_in_unit_interval(&mix_motors(&action, 0.25));
                }
            }
        }
    }
}

#[test]
fn test_pitch_input_moves_drone_horizontally() {
    let mut test = TestEngineBuilder::new().with_manual_control().build();
    test.engine.toggle_height_lock();
    let snapshots = test.fly(ControlAction::new(0.0, 0.4, 0.0, 0.0), 30);
    let last = snapshots.last().unwrap();
    assert!(last.drone.rotation.norm() > 1e-3);
    assert!(last.drone.position.xz().norm() > 1e-3);
}
