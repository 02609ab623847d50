use agriflyer::config::{CameraConfig, SimulationConfig};
use agriflyer::rendering::FrameFormat;

pub const TEST_SEED: u64 = 42;
pub const DT: f64 = 1.0 / 60.0;

/// Default config with a fixed seed
pub fn create_test_config() -> SimulationConfig {
    SimulationConfig::default().with_seed(TEST_SEED)
}

/// Small camera frames keep rendering cheap in long-running tests
pub fn create_fast_config() -> SimulationConfig {
    let mut config = create_test_config();
    config.camera = CameraConfig {
        width: 32,
        height: 32,
        format: FrameFormat::Png,
        ..CameraConfig::default()
    };
    config
}

pub fn create_static_field_config() -> SimulationConfig {
    let mut config = create_fast_config();
    config.environment.enable_weather = false;
    config.environment.enable_disease = false;
    config.environment.enable_growth = false;
    config
}
