use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use serde_json::Value;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::server::structures::{encode_frame, BridgeMessage, MessageType, MAX_FRAME_BYTES};

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("outbound queue full, message dropped")]
    Full,

    #[error("bridge closed")]
    Closed,

    #[error("not connected")]
    NotConnected,

    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

/// Wire-level connection to the backend, driven by the bridge worker thread
pub trait BackendTransport: Send {
    /// Open the connection; inbound messages are pushed into `inbound`.
    fn connect(&mut self, inbound: Sender<Value>) -> Result<(), BridgeError>;
    fn send(&mut self, message: &BridgeMessage) -> Result<(), BridgeError>;
    fn is_connected(&self) -> bool;
    fn close(&mut self);
}

/// Length-prefixed JSON over TCP
pub struct TcpTransport {
    address: String,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
            stream: None,
        }
    }

    fn read_frames(mut stream: TcpStream, inbound: Sender<Value>) {
        let mut len_bytes = [0u8; 4];
        loop {
            if stream.read_exact(&mut len_bytes).is_err() {
                break;
            }
            let len = u32::from_be_bytes(len_bytes) as usize;
            if len > MAX_FRAME_BYTES {
                warn!(len, "inbound frame too large, closing reader");
                break;
            }
            let mut body = vec![0u8; len];
            if stream.read_exact(&mut body).is_err() {
                break;
            }
            match serde_json::from_slice::<Value>(&body) {
                Ok(value) => {
                    if inbound.send(value).is_err() {
                        break;
                    }
                }
                Err(e) => debug!(error = %e, "ignoring malformed inbound frame"),
            }
        }
        debug!("backend reader finished");
    }
}

impl BackendTransport for TcpTransport {
    fn connect(&mut self, inbound: Sender<Value>) -> Result<(), BridgeError> {
        let connect_err = |source| BridgeError::Connect {
            address: self.address.clone(),
            source,
        };
        let addr = self
            .address
            .to_socket_addrs()
            .map_err(connect_err)?
            .next()
            .ok_or_else(|| {
                connect_err(io::Error::new(io::ErrorKind::NotFound, "address did not resolve"))
            })?;
        let stream = TcpStream::connect_timeout(&addr, self.timeout).map_err(connect_err)?;
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(self.timeout))?;

        let reader = stream.try_clone()?;
        thread::Builder::new()
            .name("agriflyer-bridge-reader".into())
            .spawn(move || Self::read_frames(reader, inbound))?;

        info!(address = %self.address, "connected to backend");
        self.stream = Some(stream);
        Ok(())
    }

    fn send(&mut self, message: &BridgeMessage) -> Result<(), BridgeError> {
        let stream = self.stream.as_mut().ok_or(BridgeError::NotConnected)?;
        let frame = encode_frame(&message.to_bytes()?);
        let result = stream.write_all(&frame).and_then(|_| stream.flush());
        if let Err(e) = result {
            self.close();
            return Err(e.into());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// In-process transport; the peer end sees every message the bridge sends
pub struct ChannelTransport {
    outbound: Sender<BridgeMessage>,
    replies: Option<Receiver<Value>>,
    connected: bool,
}

/// Test/host side of a [`ChannelTransport`]
pub struct ChannelPeer {
    pub messages: Receiver<BridgeMessage>,
    pub replies: Sender<Value>,
}

impl ChannelTransport {
    pub fn pair() -> (Self, ChannelPeer) {
        let (out_tx, out_rx) = unbounded();
        let (reply_tx, reply_rx) = unbounded();
        (
            Self {
                outbound: out_tx,
                replies: Some(reply_rx),
                connected: false,
            },
            ChannelPeer {
                messages: out_rx,
                replies: reply_tx,
            },
        )
    }
}

impl BackendTransport for ChannelTransport {
    fn connect(&mut self, inbound: Sender<Value>) -> Result<(), BridgeError> {
        if let Some(replies) = self.replies.take() {
            thread::Builder::new()
                .name("agriflyer-bridge-channel".into())
                .spawn(move || {
                    for value in replies.iter() {
                        if inbound.send(value).is_err() {
                            break;
                        }
                    }
                })?;
        }
        self.connected = true;
        Ok(())
    }

    fn send(&mut self, message: &BridgeMessage) -> Result<(), BridgeError> {
        if !self.connected {
            return Err(BridgeError::NotConnected);
        }
        self.outbound.send(message.clone()).map_err(|_| {
            self.connected = false;
            BridgeError::Closed
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn close(&mut self) {
        self.connected = false;
    }
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    /// Set when close gave up waiting; the worker discards the rest
    abandoned: AtomicBool,
}

/// Point-in-time bridge counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BridgeStats {
    pub sent: u64,
    /// Rejected because the outbound queue was full
    pub dropped: u64,
    /// Lost to transport errors or while disconnected
    pub failed: u64,
}

/// Reconnect policy applied by the worker
#[derive(Debug, Clone, Copy)]
struct Reconnect {
    interval: Duration,
    max_attempts: u32,
}

/// Best-effort, non-blocking forwarder to the external backend.
///
/// Messages go through a bounded queue to a worker thread; when the queue
/// is full the newest message is dropped so the caller never waits.
pub struct BackendBridge {
    session: Uuid,
    sender: Option<Sender<BridgeMessage>>,
    inbound: Receiver<Value>,
    counters: Arc<Counters>,
    worker: Option<JoinHandle<()>>,
    close_timeout: Duration,
}

impl BackendBridge {
    pub fn new(transport: Box<dyn BackendTransport>, config: &BridgeConfig) -> Result<Self, BridgeError> {
        let (tx, rx) = bounded(config.queue_capacity.max(1));
        let (inbound_tx, inbound_rx) = unbounded();
        let counters = Arc::new(Counters::default());
        let policy = Reconnect {
            interval: Duration::from_millis(config.reconnect_interval_ms),
            max_attempts: config.max_reconnect_attempts,
        };

        let worker_counters = Arc::clone(&counters);
        let worker = thread::Builder::new()
            .name("agriflyer-bridge".into())
            .spawn(move || Self::run_worker(transport, rx, inbound_tx, worker_counters, policy))?;

        Ok(Self {
            session: Uuid::new_v4(),
            sender: Some(tx),
            inbound: inbound_rx,
            counters,
            worker: Some(worker),
            close_timeout: Duration::from_millis(config.close_timeout_ms),
        })
    }

    /// Bridge over TCP to `config.address`.
    pub fn connect_tcp(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let address = config.address.clone().ok_or(BridgeError::NotConnected)?;
        let transport = TcpTransport::new(address, Duration::from_millis(config.connect_timeout_ms));
        Self::new(Box::new(transport), config)
    }

    fn run_worker(
        mut transport: Box<dyn BackendTransport>,
        queue: Receiver<BridgeMessage>,
        inbound: Sender<Value>,
        counters: Arc<Counters>,
        policy: Reconnect,
    ) {
        let mut attempts = 0u32;
        let mut last_attempt: Option<Instant> = None;
        let mut gave_up = false;

        for message in queue.iter() {
            if counters.abandoned.load(Ordering::Relaxed) {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            if !transport.is_connected() {
                let due = last_attempt.map_or(true, |t| t.elapsed() >= policy.interval);
                if due && attempts < policy.max_attempts.max(1) {
                    attempts += 1;
                    last_attempt = Some(Instant::now());
                    match transport.connect(inbound.clone()) {
                        Ok(()) => attempts = 0,
                        Err(e) => warn!(error = %e, attempt = attempts, "backend connect failed"),
                    }
                } else if !gave_up && attempts >= policy.max_attempts.max(1) {
                    warn!(attempts, "backend unreachable, giving up on reconnects");
                    gave_up = true;
                }
            }

            if !transport.is_connected() {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            match transport.send(&message) {
                Ok(()) => {
                    counters.sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, kind = ?message.kind, "backend send failed");
                }
            }
        }
        transport.close();
        debug!("bridge worker stopped");
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    /// Queue a message without blocking.
    pub fn forward(&self, kind: MessageType, data: Value) -> Result<(), BridgeError> {
        let sender = self.sender.as_ref().ok_or(BridgeError::Closed)?;
        match sender.try_send(BridgeMessage::new(kind, data, self.session)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(?kind, "bridge queue full, dropping message");
                Err(BridgeError::Full)
            }
            Err(TrySendError::Disconnected(_)) => Err(BridgeError::Closed),
        }
    }

    /// Drain inbound backend messages received since the last call.
    pub fn poll_inbound(&self) -> Vec<Value> {
        self.inbound.try_iter().collect()
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Flush what is queued and stop the worker.
    ///
    /// Waits at most `close_timeout`; after that the remaining messages are
    /// discarded and the worker is left to finish its in-flight write.
    pub fn close(&mut self) {
        self.sender.take();
        let Some(worker) = self.worker.take() else {
            return;
        };
        let deadline = Instant::now() + self.close_timeout;
        while !worker.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        if !worker.is_finished() {
            self.counters.abandoned.store(true, Ordering::Relaxed);
            warn!(timeout = ?self.close_timeout, "bridge did not drain in time, detaching worker");
            return;
        }
        if worker.join().is_err() {
            warn!("bridge worker panicked");
        }
    }
}

impl Drop for BackendBridge {
    fn drop(&mut self) {
        self.close();
    }
}
