#![allow(dead_code)]

mod assertions;
mod fixtures;
mod helpers;
mod test_engine;

// Re-export
pub use assertions::{
    assert_drone_state_valid, assert_motors_in_unit_interval, assert_plants_in_range,
    assert_position_eq,
};

pub use helpers::*;

pub use fixtures::*;
pub use test_engine::{TestEngine, TestEngineBuilder};
