//! Reliable, typed messaging node for the canlink bus protocol.
//!
//! This crate turns the wire format of `canlink-protocol` into a working
//! node: a retrying sender, a fragment reassembler with timed session
//! expiry, an acknowledgment table, and type-keyed dispatch to registered
//! handlers. The bus itself is abstracted behind the [`Bus`] trait; an
//! in-memory broadcast implementation ([`MemoryBus`]) is included for tests
//! and simulation.
//!
//! # Node Model
//!
//! A [`CanNode`] owns one bus endpoint. The host must call
//! [`CanNode::poll_once`] repeatedly (a loop or periodic task) to service
//! inbound frames. [`CanNode::send`] blocks its caller: for fragmented
//! messages it waits for the end-to-end acknowledgment, retransmitting the
//! whole frame sequence up to the configured retry limit. The
//! acknowledgment can only arrive if some other execution context keeps
//! polling while the sender waits, so multi-threaded hosts wrap the node in
//! an `Arc` and dedicate a thread to polling.
//!
//! Single-frame messages are fire-and-forget: they are dispatched
//! immediately on the receiving side and never acknowledged.
//!
//! # Example
//!
//! ```no_run
//! use canlink_node::{CanNode, MemoryBus};
//! use canlink_protocol::{ensure_payload_len, BusMessage, ProtocolError};
//!
//! struct Heartbeat {
//!     uptime_secs: u32,
//! }
//!
//! impl BusMessage for Heartbeat {
//!     const TYPE_TAG: u8 = 0;
//!     const ENCODED_LEN: usize = 4;
//!
//!     fn encode(&self) -> Vec<u8> {
//!         self.uptime_secs.to_le_bytes().to_vec()
//!     }
//!
//!     fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
//!         ensure_payload_len(data, Self::ENCODED_LEN)?;
//!         Ok(Heartbeat {
//!             uptime_secs: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
//!         })
//!     }
//! }
//!
//! let bus = MemoryBus::new();
//! let node = CanNode::new(bus.endpoint());
//! node.on_receive::<Heartbeat, _>(|hb| println!("peer uptime: {}s", hb.uptime_secs))?;
//! node.send(1, 3, &Heartbeat { uptime_secs: 42 })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod ack;
mod bus;
mod error;
mod node;
mod reassembly;
mod registry;

pub use bus::*;
pub use error::*;
pub use node::*;
pub use reassembly::*;
