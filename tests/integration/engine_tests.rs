use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use agriflyer::simulation::SimulationEvent;
use agriflyer::{ControlAction, EngineStatus, SimulationEngine, TickOutcome};
use nalgebra::Vector3;

use crate::common::{
    assert_drone_state_valid, assert_position_eq, create_fast_config, create_test_config,
    TestEngineBuilder,
};

#[test]
fn test_ten_ticks_from_default_config() {
    let mut engine = SimulationEngine::new(create_test_config()).unwrap();
    engine.initialize().unwrap();
    engine.start();

    for _ in 0..10 {
        assert!(engine.tick().is_completed());
        thread::sleep(Duration::from_millis(2));
    }

    let state = engine.get_state().unwrap();
    assert_eq!(state.step, 10);
    assert!(state.fps > 0.0);
    assert_eq!(state.plants.len(), engine.config().environment.population());
    assert_eq!(state.plants.len(), 100);
    assert!(state.is_running);
    assert!(!state.is_paused);
    assert_drone_state_valid(&state.drone);
}

#[test]
fn test_reset_restores_canonical_state_from_any_status() {
    let start = Vector3::new(0.0, 5.0, 0.0);

    // Running, after a manual climb
    let mut test = TestEngineBuilder::new().with_manual_control().build();
    test.fly(ControlAction::new(1.0, 0.2, 0.0, 0.0), 60);
    test.engine.reset().unwrap();
    let state = test.state();
    assert_eq!(state.step, 0);
    assert_eq!(state.drone.battery, 100.0);
    assert_position_eq(&state.drone.position, &start, 1e-12);
    assert_eq!(test.engine.status(), EngineStatus::Running);

    // Paused
    test.run_steps(5);
    test.engine.pause();
    test.engine.reset().unwrap();
    assert_eq!(test.state().step, 0);
    assert_eq!(test.engine.status(), EngineStatus::Running);

    // Stopped, mid emergency landing
    test.engine.emergency_land();
    test.run_steps(30);
    test.engine.stop();
    test.engine.reset().unwrap();
    let state = test.state();
    assert_eq!(test.engine.status(), EngineStatus::Stopped);
    assert_eq!(state.step, 0);
    assert_eq!(state.drone.battery, 100.0);
    assert!(!state.drone.emergency);
    assert_position_eq(&state.drone.position, &start, 1e-12);
}

#[test]
fn test_fault_injection_recovers_and_continues() {
    let mut config = create_fast_config();
    config.engine.max_consecutive_errors = 5;
    let mut test = TestEngineBuilder::new().with_config(config).build();

    let recovered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&recovered);
    test.engine.subscribe(move |event| {
        if let SimulationEvent::Recovered { errors } = event {
            sink.lock().unwrap().push(*errors);
        }
    });

    test.run_steps(3);
    test.engine.inject_faults(5);
    let outcomes: Vec<TickOutcome> = (0..5).map(|_| test.step()).collect();

    assert!(outcomes[..4]
        .iter()
        .all(|o| matches!(o, TickOutcome::Failed { .. })));
    assert!(matches!(outcomes[4], TickOutcome::Recovered { errors: 5 }));
    assert_eq!(*recovered.lock().unwrap(), vec![5]);
    assert_eq!(test.engine.performance().consecutive_errors(), 0);
    assert_eq!(test.engine.performance().metrics().recoveries, 1);

    let snapshot = test.run_steps(1).remove(0);
    assert_eq!(snapshot.step, 4);
    assert_eq!(snapshot.performance.consecutive_errors, 0);
    assert!(snapshot.drone.armed);
}

#[test]
fn test_success_resets_error_counter() {
    let mut test = TestEngineBuilder::new().build();
    test.engine.inject_faults(3);
    for _ in 0..3 {
        assert!(matches!(test.step(), TickOutcome::Failed { .. }));
    }
    assert_eq!(test.engine.performance().consecutive_errors(), 3);
    assert!(test.step().is_completed());
    assert_eq!(test.engine.performance().consecutive_errors(), 0);
    assert_eq!(test.engine.performance().metrics().recoveries, 0);
}

#[test]
fn test_invalid_lifecycle_calls_are_noops() {
    let mut test = TestEngineBuilder::new().stopped().build();
    test.engine.pause();
    test.engine.resume();
    test.engine.stop();
    assert_eq!(test.engine.status(), EngineStatus::Stopped);
    assert!(matches!(test.step(), TickOutcome::Skipped));

    test.engine.start();
    test.engine.start();
    assert_eq!(test.engine.status(), EngineStatus::Running);
    test.engine.resume();
    assert_eq!(test.engine.status(), EngineStatus::Running);
}

#[test]
fn test_subscribers_see_ticks_in_order() {
    let mut test = TestEngineBuilder::new().build();
    let log = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&log);
    let id = test.engine.subscribe(move |event| {
        if let SimulationEvent::Update(s) = event {
            first.lock().unwrap().push(("first", s.step));
        }
    });
    let second = Arc::clone(&log);
    test.engine.subscribe(move |event| {
        if let SimulationEvent::Update(s) = event {
            second.lock().unwrap().push(("second", s.step));
        }
    });

    test.run_steps(2);
    test.engine.unsubscribe(id);
    test.run_steps(1);

    assert_eq!(
        *log.lock().unwrap(),
        vec![("first", 1), ("second", 1), ("first", 2), ("second", 2), ("second", 3)]
    );
}

#[test]
fn test_status_events() {
    let mut engine = SimulationEngine::new(create_fast_config()).unwrap();
    let (_, rx) = engine.events_mut().subscribe_channel(32);
    engine.initialize().unwrap();
    engine.start();
    engine.pause();
    engine.resume();
    engine.stop();

    let statuses: Vec<EngineStatus> = rx
        .try_iter()
        .filter_map(|e| match e {
            SimulationEvent::StatusChanged(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            EngineStatus::Stopped,
            EngineStatus::Running,
            EngineStatus::Paused,
            EngineStatus::Running,
            EngineStatus::Stopped,
        ]
    );
}

#[test]
fn test_camera_interval_reuses_last_frame() {
    let mut config = create_fast_config();
    config.engine.camera_interval = 4;
    let mut test = TestEngineBuilder::new().with_config(config).build();
    let (_, rx) = test.engine.events_mut().subscribe_channel(64);

    test.run_steps(8);
    let frames: Vec<u64> = rx
        .try_iter()
        .filter_map(|e| match e {
            SimulationEvent::CameraFeed(frame) => Some(frame.index),
            _ => None,
        })
        .collect();
    assert_eq!(frames, vec![0, 4]);
    assert_eq!(test.engine.last_frame().unwrap().index, 4);
}

#[test]
fn test_autonomous_mode_ignores_external_actions() {
    let mut test = TestEngineBuilder::new().build();
    test.fly(ControlAction::new(1.0, 0.0, 0.0, 0.0), 120);
    let state = test.state();
    assert!((state.drone.position.y - 5.0).abs() < 0.5);
}
