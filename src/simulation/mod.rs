pub mod engine;
pub mod events;
pub mod metrics;
pub mod reward;
pub mod runner;
pub mod snapshot;

pub use engine::{EngineStatus, SimulationEngine, TickOutcome};
pub use events::{EventBus, SimulationEvent, SubscriptionId};
pub use metrics::{PerformanceMetrics, PerformanceTracker, Phase};
pub use reward::{RewardParams, RewardSignal, RewardTracker};
pub use runner::{EngineCommand, EngineHandle, SimulationRunner};
pub use snapshot::SimulationSnapshot;
