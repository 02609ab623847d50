use agriflyer::config::EnvironmentConfig;
use agriflyer::environment::{GrowthStage, PlantType, WeatherConditions};
use agriflyer::server::ToObservation;
use agriflyer::utils::rng::RngManager;
use agriflyer::{EffectKind, Environment, Plant, PlantId};
use nalgebra::Vector3;

use crate::common::{
    assert_plants_in_range, central_plant, create_static_field_config, TestEngineBuilder, TEST_SEED,
};

fn field() -> Environment {
    Environment::new(EnvironmentConfig::default(), &RngManager::new(TEST_SEED)).unwrap()
}

#[test]
fn test_plant_levels_stay_in_range() {
    let mut env = field();
    for _ in 0..200 {
        env.update(1.0 / 60.0).unwrap();
    }
    assert_plants_in_range(env.plants().iter());

    // A few huge steps push every rate term far past its bounds
    for _ in 0..20 {
        env.update(5_000.0).unwrap();
        assert_plants_in_range(env.plants().iter());
    }
}

#[test]
fn test_invalid_dt_is_rejected() {
    let mut env = field();
    assert!(env.update(f64::NAN).is_err());
    assert!(env.update(-1.0).is_err());
    env.update(0.0).unwrap();
    assert_eq!(env.elapsed_days(), 0.0);
}

#[test]
fn test_growth_stage_thresholds() {
    assert_eq!(GrowthStage::from_age(10.0), GrowthStage::Seedling);
    assert_eq!(GrowthStage::from_age(30.0), GrowthStage::Vegetative);
    assert_eq!(GrowthStage::from_age(60.0), GrowthStage::Flowering);
    assert_eq!(GrowthStage::from_age(90.0), GrowthStage::Mature);
}

#[test]
fn test_growth_is_monotonic_with_age() {
    let mut plant = Plant::new(PlantId(0), PlantType::Corn, Vector3::zeros(), 0.0);
    let mut stage = plant.growth_stage;
    let mut size = plant.size;

    for _ in 0..150 {
        plant.grow(1.0, 1.0);
        assert!(plant.growth_stage >= stage);
        assert!(plant.size >= size);
        stage = plant.growth_stage;
        size = plant.size;
    }
    assert_eq!(stage, GrowthStage::Mature);
}

#[test]
fn test_water_effect_raises_local_water_only() {
    let mut env = field();
    let center = env.nearest_plant(&Vector3::zeros()).unwrap();
    let origin = env.plant(center).unwrap().position;
    let radius = env.config().effect_radius;

    let far = env
        .plants()
        .iter()
        .find(|p| (p.position.xz() - origin.xz()).norm() > radius)
        .map(|p| p.id)
        .unwrap();
    env.plant_mut(center).unwrap().water_level = 20.0;
    let far_before = env.plant(far).unwrap().water_level;

    let affected = env.apply_effect(&origin, EffectKind::Water, 1.0);
    assert!(affected >= 1);
    assert!(env.plant(center).unwrap().water_level > 20.0);
    assert_eq!(env.plant(far).unwrap().water_level, far_before);
}

#[test]
fn test_zero_intensity_effect_is_noop() {
    let mut env = field();
    let before: Vec<f64> = env.plants().iter().map(|p| p.nutrient_level).collect();
    assert_eq!(env.apply_effect(&Vector3::zeros(), EffectKind::Fertilizer, 0.0), 0);
    let after: Vec<f64> = env.plants().iter().map(|p| p.nutrient_level).collect();
    assert_eq!(before, after);
}

#[test]
fn test_engine_effect_reaches_field() {
    let mut test = TestEngineBuilder::new()
        .with_config(create_static_field_config())
        .build();
    let target = central_plant(&test.state()).clone();

    let affected =
        test.engine
            .apply_environmental_effect(&target.position, EffectKind::Pesticide, 0.0);
    assert_eq!(affected, 0);

    let affected = test
        .engine
        .apply_environmental_effect(&target.position, EffectKind::Water, 0.5);
    assert!(affected >= 1);
    let after = test.state().plant(target.id).unwrap().water_level;
    assert!(after >= target.water_level);
    assert!(after <= 100.0);
}

#[test]
fn test_same_seed_same_field() {
    let run = || {
        let mut test = TestEngineBuilder::new().build();
        test.run_steps(30).pop().unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(a.plants, b.plants);
    assert_eq!(a.weather, b.weather);
    assert_eq!(a.drone.position, b.drone.position);
}

#[test]
fn test_different_seeds_differ() {
    let a = Environment::new(EnvironmentConfig::default(), &RngManager::new(1)).unwrap();
    let b = Environment::new(EnvironmentConfig::default(), &RngManager::new(2)).unwrap();
    assert_eq!(a.plants().len(), b.plants().len());
    assert_ne!(a.plants().as_slice(), b.plants().as_slice());
}

#[test]
fn test_observation_carries_visible_plants() {
    let mut test = TestEngineBuilder::new().build();
    let snapshot = test.run_steps(5).pop().unwrap();
    let observation = snapshot.to_observation(None);

    let observed: Vec<PlantId> = observation.plants.iter().map(|p| p.id).collect();
    assert_eq!(observed, snapshot.visible_plants);
    for id in &snapshot.visible_plants {
        let plant = snapshot.plant(*id).unwrap();
        assert!(plant.position.y < snapshot.drone.position.y);
    }
    assert!(observation.image.is_none());
}

#[test]
fn test_weather_stays_in_range() {
    let mut env = field();
    let check = |w: &WeatherConditions| {
        assert!((0.0..=100.0).contains(&w.humidity), "humidity {}", w.humidity);
        assert!((0.0..=100.0).contains(&w.sunlight), "sunlight {}", w.sunlight);
        assert!((0.0..=WeatherConditions::MAX_WIND).contains(&w.wind_speed));
        assert!((0.0..360.0).contains(&w.wind_direction));
        assert!((0.0..24.0).contains(&w.time_of_day));
        assert!(w.precipitation >= 0.0);
        assert!(w.temperature.is_finite());
    };

    for _ in 0..500 {
        env.update(0.5).unwrap();
        check(env.weather());
    }
    for _ in 0..50 {
        env.update(250.0).unwrap();
        check(env.weather());
    }
}
