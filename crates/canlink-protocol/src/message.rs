//! Typed message encoding.
//!
//! Each application message type binds a payload type tag and a fixed field
//! layout. Encoding is explicit: fields are written in declaration order
//! with little-endian integer encoding, so the wire format is exactly what
//! the implementation writes — in-memory struct layout, padding, and
//! platform endianness never leak onto the bus.

use crate::error::ProtocolError;

/// A fixed-layout message that can travel over the bus.
///
/// `ENCODED_LEN` is the exact number of bytes [`BusMessage::encode`]
/// produces. [`BusMessage::decode`] must accept any buffer of at least that
/// length and ignore trailing bytes; shorter buffers fail with
/// [`ProtocolError::PayloadTooShort`].
///
/// Messages of 1-8 encoded bytes are transmitted as one frame; longer ones
/// (up to 255 bytes) are fragmented and acknowledged end-to-end.
pub trait BusMessage: Sized {
    /// Payload type tag, 0-6. Tag 7 is reserved for acknowledgment frames
    /// and cannot carry application messages.
    const TYPE_TAG: u8;

    /// Exact encoded length in bytes.
    const ENCODED_LEN: usize;

    /// Serialize to the wire layout.
    fn encode(&self) -> Vec<u8>;

    /// Deserialize from the wire layout.
    fn decode(data: &[u8]) -> Result<Self, ProtocolError>;
}

/// Length guard for [`BusMessage::decode`] implementations.
pub fn ensure_payload_len(data: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if data.len() < expected {
        return Err(ProtocolError::PayloadTooShort {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}
