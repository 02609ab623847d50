pub mod components;
pub mod engine;
pub mod error;
pub mod shapes;
pub mod traits;
pub mod world;

pub use engine::NalgebraEngine;
pub use error::PhysicsError;
pub use shapes::{Material, Shape};
pub use traits::{BodyDesc, BodyId, BodyKind, ContactEvent, Pose, RigidBodyEngine, Velocity};
pub use world::{CollisionCallback, CollisionHandlerId, PhysicsWorld};
