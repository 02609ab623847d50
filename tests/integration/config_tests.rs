use agriflyer::config::ConfigError;
use agriflyer::{ConfigPatch, SimError, SimulationConfig, SimulationEngine};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use tempfile::tempdir;

use crate::common::{create_fast_config, TestEngineBuilder, TEST_SEED};

#[test]
fn test_engine_from_yaml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("field.yaml");
    fs::write(
        &path,
        "environment:\n  max_plants: 24\n  enable_disease: false\nengine:\n  seed: 42\n  max_fps: 30.0\n",
    )
    .unwrap();

    let config = SimulationConfig::load(&path).unwrap();
    assert_eq!(config.engine.seed, Some(TEST_SEED));
    assert_eq!(config.engine.tick_interval_ms(), 1000.0 / 30.0);

    let mut engine = SimulationEngine::new(config).unwrap();
    engine.initialize().unwrap();
    let state = engine.get_state().unwrap();
    assert_eq!(state.plants.len(), 24);
}

#[test]
fn test_saved_config_round_trips_through_engine() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("saved.yaml");
    let mut config = create_fast_config();
    config.drone.battery_drain_rate = 0.5;
    config.save(&path).unwrap();

    let engine = SimulationEngine::new(SimulationConfig::load(&path).unwrap()).unwrap();
    assert_eq!(*engine.config(), config);
}

#[test]
fn test_from_json_overlays_defaults() {
    let config = SimulationConfig::from_json(&json!({
        "gravity": 3.7,
        "max_plants": 12,
        "enable_weather": false,
        "unrelated": "ignored",
    }))
    .unwrap();

    assert_eq!(config.physics.gravity, 3.7);
    assert_eq!(config.environment.max_plants, 12);
    assert!(!config.environment.enable_weather);
    assert_eq!(config.drone, SimulationConfig::default().drone);
}

#[test]
fn test_from_json_rejects_bad_input() {
    assert!(matches!(
        SimulationConfig::from_json(&json!([1, 2, 3])),
        Err(ConfigError::JsonError(_))
    ));
    assert!(matches!(
        SimulationConfig::from_json(&json!({ "mass": "heavy" })),
        Err(ConfigError::InvalidParameter { .. })
    ));
    assert!(SimulationConfig::from_json(&json!({ "mass": -2.0 })).is_err());
}

#[test]
fn test_update_config_json_regenerates_field() {
    let mut test = TestEngineBuilder::new().build();
    test.run_steps(3);
    assert_eq!(test.state().plants.len(), 100);

    test.engine
        .update_config_json(&json!({ "max_plants": 30 }))
        .unwrap();
    assert_eq!(test.engine.config().environment.max_plants, 30);
    assert_eq!(test.state().plants.len(), 30);

    // The engine keeps ticking with the new field
    let snapshot = test.run_steps(1).pop().unwrap();
    assert_eq!(snapshot.plants.len(), 30);
    assert_eq!(snapshot.step, 4);
}

#[test]
fn test_rejected_update_leaves_config_untouched() {
    let mut test = TestEngineBuilder::new().build();
    let before = test.engine.config();

    let result = test.engine.update_config_json(&json!({ "timestep": -1.0 }));
    assert!(matches!(result, Err(SimError::Config(_))));

    let result = test
        .engine
        .update_config(&ConfigPatch::new().ceilings(45.0, 40.0));
    assert!(result.is_err());

    assert_eq!(*test.engine.config(), *before);
    assert!(test.step().is_completed());
}

#[test]
fn test_update_config_applies_drone_tunables() {
    let mut test = TestEngineBuilder::new().with_manual_control().build();
    test.engine
        .update_config(&ConfigPatch::new().ceilings(20.0, 30.0).pid(0.5, 0.0, 0.2))
        .unwrap();

    let config = test.engine.config();
    assert_eq!(config.drone.safety.soft_ceiling, 20.0);
    assert_eq!(config.drone.safety.hard_ceiling, 30.0);
    assert_eq!(config.drone.pid.kp, 0.5);

    test.engine.set_target_altitude(35.0);
    assert_eq!(test.state().drone.target_altitude, 20.0);
}
