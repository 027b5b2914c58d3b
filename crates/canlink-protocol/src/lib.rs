//! Wire format for the canlink bus messaging protocol.
//!
//! canlink carries arbitrarily-sized, typed messages between numbered nodes
//! over a broadcast bus that only delivers frames of at most 8 payload bytes,
//! identified by an 11-bit value. This crate is the pure wire layer: the
//! identifier bit layout, the checksum guarding multi-frame payloads, the
//! fragmentation rules, and the typed message codec trait. The runtime side
//! (reassembly, acknowledgment, retry, dispatch) lives in `canlink-node`.
//!
//! # Identifier Scheme (11 bits)
//!
//! | Bits  | Field    | Description                              |
//! |-------|----------|------------------------------------------|
//! | 10..9 | priority | 0 (lowest) .. 3 (highest)                |
//! | 8..5  | address  | 0-14: node id, 15: broadcast             |
//! | 4..3  | sequence | start / middle / end / single            |
//! | 2..0  | type tag | payload kind; 7 reserved for acks        |
//!
//! # Framing Rules
//!
//! Messages of 1-8 bytes travel as one SINGLE frame, payload verbatim.
//! Longer messages (up to 255 bytes) get a trailing CRC-8 byte and are split
//! into chunks of at most 8 bytes, tagged START, MIDDLE..., END. All chunks
//! of one message share the same base identifier; only the sequence bits
//! differ.
//!
//! # Example
//!
//! ```
//! use canlink_protocol::{fragment_message, SequenceKind};
//!
//! let frames = fragment_message(1, 3, 2, &[0u8; 20])?;
//! assert_eq!(frames.len(), 3);
//! assert_eq!(frames[0].id().sequence, SequenceKind::Start);
//! assert_eq!(frames[2].id().sequence, SequenceKind::End);
//! # Ok::<(), canlink_protocol::ProtocolError>(())
//! ```

mod checksum;
mod constants;
mod error;
mod fragment;
mod frame;
mod identifier;
mod message;

pub use checksum::*;
pub use constants::*;
pub use error::*;
pub use fragment::*;
pub use frame::*;
pub use identifier::*;
pub use message::*;
