use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::rendering::CameraFrame;
use crate::simulation::engine::EngineStatus;
use crate::simulation::snapshot::SimulationSnapshot;

/// Everything the engine pushes to its observers
#[derive(Debug, Clone)]
pub enum SimulationEvent {
    /// Fresh snapshot, once per tick
    Update(Arc<SimulationSnapshot>),
    CameraFeed(Arc<CameraFrame>),
    StatusChanged(EngineStatus),
    /// Automatic reset after too many consecutive tick failures
    Recovered { errors: u32 },
    /// Opaque payload received from the backend
    BackendMessage(Value),
}

impl SimulationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SimulationEvent::Update(_) => "update",
            SimulationEvent::CameraFeed(_) => "camera_feed",
            SimulationEvent::StatusChanged(_) => "status_changed",
            SimulationEvent::Recovered { .. } => "recovered",
            SimulationEvent::BackendMessage(_) => "backend_message",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&SimulationEvent) + Send>;

enum Subscriber {
    Callback(Callback),
    Channel(Sender<SimulationEvent>),
}

/// Synchronous fan-out of simulation events, in emission order
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&SimulationEvent) + Send + 'static,
    {
        self.register(Subscriber::Callback(Box::new(callback)))
    }

    /// Bounded channel subscription. Events are dropped while the channel is
    /// full; the subscription ends when the receiver is dropped.
    pub fn subscribe_channel(&mut self, capacity: usize) -> (SubscriptionId, Receiver<SimulationEvent>) {
        let (tx, rx) = bounded(capacity.max(1));
        (self.register(Subscriber::Channel(tx)), rx)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        before != self.subscribers.len()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub fn emit(&mut self, event: SimulationEvent) {
        trace!(event = event.name(), "emit");
        self.subscribers.retain_mut(|(id, subscriber)| match subscriber {
            Subscriber::Callback(callback) => {
                callback(&event);
                true
            }
            Subscriber::Channel(tx) => match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    debug!(subscription = id.0, event = event.name(), "subscriber lagging, event dropped");
                    true
                }
                Err(TrySendError::Disconnected(_)) => {
                    debug!(subscription = id.0, "subscriber disconnected");
                    false
                }
            },
        });
    }
}
