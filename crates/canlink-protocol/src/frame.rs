//! Bus frames: an 11-bit identifier plus at most eight payload bytes.

use crate::constants::{ACK_PRIORITY, ACK_TYPE_TAG, MAX_FRAME_PAYLOAD, TYPE_TAG_MASK};
use crate::error::ProtocolError;
use crate::identifier::{FrameId, SequenceKind};

/// A single bus frame (standard, non-extended addressing).
///
/// Owned transiently by whichever component is currently transmitting it or
/// has just received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    id: FrameId,
    data: Vec<u8>,
}

impl Frame {
    /// Create a frame, rejecting payloads longer than
    /// [`MAX_FRAME_PAYLOAD`].
    pub fn new(id: FrameId, data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() > MAX_FRAME_PAYLOAD {
            return Err(ProtocolError::FrameTooLong {
                max: MAX_FRAME_PAYLOAD,
                actual: data.len(),
            });
        }
        Ok(Frame {
            id,
            data: data.to_vec(),
        })
    }

    /// Reconstruct a frame from raw wire values.
    ///
    /// For bus drivers: `id_bits` is the 11-bit identifier as received,
    /// `data` the frame payload.
    pub fn from_wire(id_bits: u16, data: &[u8]) -> Result<Self, ProtocolError> {
        Frame::new(FrameId::decode(id_bits), data)
    }

    /// Build the acknowledgment frame for a completed message.
    ///
    /// Highest priority, SINGLE sequence, the reserved type tag, and one
    /// payload byte naming the acknowledged tag. The address field echoes
    /// the address the acknowledged message was sent to, which is the key
    /// the sender is waiting on.
    pub fn ack(address: u8, acked_tag: u8) -> Frame {
        Frame {
            id: FrameId::new(ACK_PRIORITY, address, SequenceKind::Single, ACK_TYPE_TAG),
            data: vec![acked_tag & TYPE_TAG_MASK],
        }
    }

    /// The decoded identifier.
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// The packed 11-bit identifier for the wire.
    pub fn id_bits(&self) -> u16 {
        self.id.encode()
    }

    /// The payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
