//! The canlink node: retrying sender, polling receiver, configuration.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use canlink_protocol::{
    fragment_message, BusMessage, Frame, SequenceKind, ACK_TYPE_TAG, MAX_FRAME_PAYLOAD,
};
use serde::{Deserialize, Serialize};

use crate::ack::{AckKey, AckTable};
use crate::bus::{Bus, BusError};
use crate::error::{RegistryError, SendError};
use crate::reassembly::Reassembler;
use crate::registry::HandlerRegistry;

/// How long a data frame may wait for bus arbitration.
pub const FRAME_TX_TIMEOUT: Duration = Duration::from_millis(100);
/// How long one attempt waits for its end-to-end acknowledgment.
pub const ACK_WAIT_TIMEOUT: Duration = Duration::from_millis(100);
/// How long an acknowledgment frame may wait for bus arbitration.
pub const ACK_TX_TIMEOUT: Duration = Duration::from_millis(20);
/// How long [`CanNode::poll_once`] waits for an inbound frame.
pub const POLL_RX_TIMEOUT: Duration = Duration::from_millis(10);

/// Construction-time node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Acknowledgment retries per send. 0 disables acknowledgments
    /// entirely: every send completes as soon as its frames are out.
    pub retry_limit: u8,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig { retry_limit: 3 }
    }
}

type ErrorCallback = Arc<dyn Fn(u8, u8) + Send + Sync>;

/// A protocol node bound to one bus endpoint.
///
/// All shared state is mutex-guarded, so an `Arc<CanNode<B>>` can be polled
/// from one thread while others send concurrently. [`CanNode::send`] blocks
/// its caller; the acknowledgment it waits for only arrives if some other
/// context keeps calling [`CanNode::poll_once`] in the meantime. There is
/// no cancellation: a send runs to success, transport failure, or retry
/// exhaustion.
pub struct CanNode<B: Bus> {
    bus: B,
    retry_limit: AtomicU8,
    error_callback: Mutex<Option<ErrorCallback>>,
    registry: Mutex<HandlerRegistry>,
    reassembler: Mutex<Reassembler>,
    acks: AckTable,
}

impl<B: Bus> CanNode<B> {
    /// Create a node with the default configuration.
    pub fn new(bus: B) -> Self {
        Self::with_config(bus, NodeConfig::default())
    }

    /// Create a node with an explicit configuration.
    pub fn with_config(bus: B, config: NodeConfig) -> Self {
        CanNode {
            bus,
            retry_limit: AtomicU8::new(config.retry_limit),
            error_callback: Mutex::new(None),
            registry: Mutex::new(HandlerRegistry::new()),
            reassembler: Mutex::new(Reassembler::new()),
            acks: AckTable::new(),
        }
    }

    /// Set the number of acknowledgment retries per send (0 = no
    /// acknowledgment expected).
    pub fn set_retry_limit(&self, limit: u8) {
        self.retry_limit.store(limit, Ordering::Relaxed);
    }

    /// Install the callback invoked with (type tag, address) on transmit
    /// failure or retry exhaustion.
    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(u8, u8) + Send + Sync + 'static,
    {
        *self.error_callback.lock().unwrap() = Some(Arc::new(callback));
    }

    /// Bind a handler for message type `M`.
    ///
    /// Re-registration silently replaces the previous handler for the tag.
    pub fn on_receive<M, F>(&self, handler: F) -> Result<(), RegistryError>
    where
        M: BusMessage,
        F: Fn(M) + Send + Sync + 'static,
    {
        self.registry.lock().unwrap().register::<M, F>(handler)
    }

    /// Send `message` to `address` with the given priority.
    ///
    /// Messages longer than [`MAX_FRAME_PAYLOAD`] bytes are fragmented and
    /// acknowledged end-to-end: the call blocks until the acknowledgment
    /// arrives or the retry budget is spent, retransmitting the whole
    /// fragment sequence on each attempt (the protocol has no per-fragment
    /// acknowledgment). Single-frame messages, and any send with a retry
    /// limit of 0, complete as soon as the frames are on the bus.
    pub fn send<M: BusMessage>(
        &self,
        priority: u8,
        address: u8,
        message: &M,
    ) -> Result<(), SendError> {
        let payload = message.encode();
        let frames = fragment_message(priority, address, M::TYPE_TAG, &payload)?;
        let id = frames[0].id();
        let retry_limit = self.retry_limit.load(Ordering::Relaxed);
        let await_ack = payload.len() > MAX_FRAME_PAYLOAD && retry_limit > 0;

        let key: AckKey = (id.address, id.type_tag);
        if await_ack {
            // Armed before the first frame goes out so an acknowledgment
            // racing ahead of the wait below is not lost.
            self.acks.arm(key);
        }

        let mut attempts: u8 = 0;
        loop {
            for frame in &frames {
                if let Err(err) = self.bus.transmit(frame, FRAME_TX_TIMEOUT) {
                    if await_ack {
                        self.acks.disarm(key);
                    }
                    self.notify_error(id.type_tag, id.address);
                    return Err(SendError::Transport(err));
                }
            }
            if !await_ack {
                return Ok(());
            }
            if self.acks.wait(key, ACK_WAIT_TIMEOUT) {
                self.acks.disarm(key);
                return Ok(());
            }
            attempts += 1;
            if attempts > retry_limit {
                break;
            }
            log::debug!(
                "no acknowledgment for tag {} from address {}, retry {}/{}",
                id.type_tag,
                id.address,
                attempts,
                retry_limit
            );
        }

        self.acks.disarm(key);
        self.notify_error(id.type_tag, id.address);
        Err(SendError::AckTimeout {
            type_tag: id.type_tag,
            address: id.address,
        })
    }

    /// Service at most one inbound frame.
    ///
    /// Non-blocking apart from a short internal wait ([`POLL_RX_TIMEOUT`])
    /// for a frame to arrive. Returns `Ok(true)` when a frame was handled,
    /// `Ok(false)` when nothing arrived. Must be invoked repeatedly by the
    /// host.
    pub fn poll_once(&self) -> Result<bool, BusError> {
        let frame = match self.bus.receive(POLL_RX_TIMEOUT)? {
            Some(frame) => frame,
            None => return Ok(false),
        };
        let id = frame.id();

        if id.type_tag == ACK_TYPE_TAG {
            let acked = frame.data().first().copied().unwrap_or(0);
            if !self.acks.complete((id.address, acked)) {
                log::trace!("acknowledgment for tag {} with no waiting send", acked);
            }
            return Ok(true);
        }

        match id.sequence {
            SequenceKind::Single => self.dispatch(id.type_tag, frame.data()),
            _ => {
                let now = Instant::now();
                let completed = {
                    let mut reassembler = self.reassembler.lock().unwrap();
                    let completed = reassembler.handle_frame(id, frame.data(), now);
                    reassembler.purge_expired(now);
                    completed
                };
                if let Some(payload) = completed {
                    self.dispatch(id.type_tag, &payload);
                    self.send_ack(id.address, id.type_tag);
                }
            }
        }
        Ok(true)
    }

    fn dispatch(&self, tag: u8, payload: &[u8]) {
        let handler = self.registry.lock().unwrap().handler(tag);
        match handler {
            Some(handler) => handler(payload),
            None => log::trace!("no handler registered for tag {}", tag),
        }
    }

    fn send_ack(&self, address: u8, type_tag: u8) {
        let frame = Frame::ack(address, type_tag);
        if let Err(err) = self.bus.transmit(&frame, ACK_TX_TIMEOUT) {
            log::warn!("failed to transmit acknowledgment for tag {}: {}", type_tag, err);
        }
    }

    fn notify_error(&self, type_tag: u8, address: u8) {
        let callback = self.error_callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(type_tag, address);
        }
    }
}
