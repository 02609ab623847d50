use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::io::Read;
use std::net::TcpListener;
use std::time::{Duration, Instant};

use agriflyer::config::BridgeConfig;
use agriflyer::server::{BridgeMessage, ChannelPeer, ChannelTransport, MessageType};
use agriflyer::{BackendBridge, SimulationEvent};

use crate::common::{create_fast_config, wait_for, TestEngine, TestEngineBuilder, TEST_SEED};

const PNG_MAGIC: [u8; 4] = [0x89, b'P', b'N', b'G'];

fn with_channel_bridge(test: &mut TestEngine) -> ChannelPeer {
    let (transport, peer) = ChannelTransport::pair();
    let bridge = BackendBridge::new(Box::new(transport), &BridgeConfig::default()).unwrap();
    test.engine.attach_bridge(bridge);
    peer
}

fn next_of_kind(peer: &ChannelPeer, kind: MessageType) -> Option<BridgeMessage> {
    wait_for(Duration::from_secs(5), || {
        peer.messages.try_iter().find(|m| m.kind == kind)
    })
}

#[test]
fn test_observation_carries_encoded_frame() {
    let mut test = TestEngineBuilder::new().build();
    let peer = with_channel_bridge(&mut test);
    test.run_steps(1);

    let message = next_of_kind(&peer, MessageType::Observation).expect("observation forwarded");
    assert_eq!(message.session, test.engine.bridge().unwrap().session());
    let data = &message.data;
    assert_eq!(data["step"], 1);
    assert_eq!(data["image_format"], "image/png");
    assert!(data["plants"].is_array());
    assert_eq!(data["position"].as_array().unwrap().len(), 3);

    let image = BASE64_STANDARD
        .decode(data["image"].as_str().unwrap())
        .unwrap();
    assert_eq!(image[..4], PNG_MAGIC);
}

#[test]
fn test_reset_is_announced_to_backend() {
    let mut test = TestEngineBuilder::new().build();
    let peer = with_channel_bridge(&mut test);
    test.run_steps(2);
    test.engine.reset().unwrap();

    let message = next_of_kind(&peer, MessageType::Reset).expect("reset forwarded");
    assert_eq!(message.data["seed"], TEST_SEED);
}

#[test]
fn test_backend_replies_become_events() {
    let mut test = TestEngineBuilder::new().build();
    let (_, events) = test.engine.events_mut().subscribe_channel(1024);
    let peer = with_channel_bridge(&mut test);

    // The transport connects on the first outbound message
    test.run_steps(1);
    next_of_kind(&peer, MessageType::Observation).expect("bridge connected");
    peer.replies.send(json!({ "detections": 3 })).unwrap();

    let reply = wait_for(Duration::from_secs(5), || {
        test.run_steps(1);
        events.try_iter().find_map(|e| match e {
            SimulationEvent::BackendMessage(value) => Some(value),
            _ => None,
        })
    })
    .expect("reply delivered");
    assert_eq!(reply["detections"], 3);
}

#[test]
fn test_observation_interval() {
    let mut config = create_fast_config();
    config.engine.observation_interval = 3;
    let mut test = TestEngineBuilder::new().with_config(config).build();
    let peer = with_channel_bridge(&mut test);

    test.run_steps(10);
    // Closing the bridge flushes the queue
    test.engine.destroy();

    let steps: Vec<Value> = peer
        .messages
        .try_iter()
        .filter(|m| m.kind == MessageType::Observation)
        .map(|m| m.data["step"].clone())
        .collect();
    assert_eq!(steps, vec![json!(3), json!(6), json!(9)]);
}

#[test]
fn test_tcp_backend_receives_framed_observations() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = create_fast_config();
    config.bridge.address = Some(listener.local_addr().unwrap().to_string());

    let mut test = TestEngineBuilder::new().with_config(config).build();
    assert!(test.engine.bridge().is_some());
    test.run_steps(1);

    let (mut socket, _) = listener.accept().unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut len = [0u8; 4];
    socket.read_exact(&mut len).unwrap();
    let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
    socket.read_exact(&mut body).unwrap();

    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["type"], "observation");
    assert_eq!(value["data"]["step"], 1);
    assert!(value["session"].is_string());
    assert!(value["timestamp"].is_string());
}

#[test]
fn test_unreachable_backend_does_not_stall_ticks() {
    let mut config = create_fast_config();
    config.bridge.address = Some("127.0.0.1:1".into());
    config.bridge.reconnect_interval_ms = 0;
    config.bridge.max_reconnect_attempts = 3;

    let mut test = TestEngineBuilder::new().with_config(config).build();
    let started = Instant::now();
    let snapshots = test.run_steps(60);
    assert_eq!(snapshots.last().unwrap().step, 60);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(test.engine.bridge().unwrap().stats().sent, 0);
}

#[test]
fn test_destroy_returns_when_backend_stops_reading() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = create_fast_config();
    config.bridge.address = Some(listener.local_addr().unwrap().to_string());
    config.bridge.connect_timeout_ms = 200;
    config.bridge.close_timeout_ms = 200;

    let mut test = TestEngineBuilder::new().with_config(config).build();
    test.run_steps(1);
    // Connected, but the backend never reads
    let (_socket, _) = listener.accept().unwrap();
    test.run_steps(200);

    let started = Instant::now();
    test.engine.destroy();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(test.engine.bridge().is_none());
}
