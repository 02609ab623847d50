pub mod bridge;
pub mod obs;
pub mod structures;

pub use bridge::{
    BackendBridge, BackendTransport, BridgeError, BridgeStats, ChannelPeer, ChannelTransport,
    TcpTransport,
};
pub use obs::{Observation, PlantObservation, ToObservation};
pub use structures::{encode_frame, BridgeMessage, MessageType, MAX_FRAME_BYTES};
