//! Message fragmentation.
//!
//! Messages of at most eight bytes travel as one SINGLE frame, payload
//! verbatim and unchecksummed. Longer messages get [`checksum8`] of the
//! payload appended as a trailing byte, then the result is split into chunks
//! of at most eight bytes: the first tagged START, the last END, everything
//! between MIDDLE. Every chunk of one message shares the same base
//! identifier; only the sequence field varies.

use crate::checksum::checksum8;
use crate::constants::{MAX_FRAME_PAYLOAD, MAX_MESSAGE_LEN};
use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::identifier::{FrameId, SequenceKind};

/// Split an encoded message into transmit-ready frames.
///
/// `payload` must be 1-255 bytes. Fragmentation is deterministic: the same
/// inputs always produce the same frame sequence, and the reassembler
/// reverses it exactly when no frame is lost or corrupted.
pub fn fragment_message(
    priority: u8,
    address: u8,
    type_tag: u8,
    payload: &[u8],
) -> Result<Vec<Frame>, ProtocolError> {
    if payload.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if payload.len() > MAX_MESSAGE_LEN {
        return Err(ProtocolError::MessageTooLong {
            max: MAX_MESSAGE_LEN,
            actual: payload.len(),
        });
    }

    if payload.len() <= MAX_FRAME_PAYLOAD {
        let id = FrameId::new(priority, address, SequenceKind::Single, type_tag);
        return Ok(vec![Frame::new(id, payload)?]);
    }

    let mut buf = Vec::with_capacity(payload.len() + 1);
    buf.extend_from_slice(payload);
    buf.push(checksum8(payload));

    let total = buf.len();
    let mut frames = Vec::with_capacity(total.div_ceil(MAX_FRAME_PAYLOAD));
    let mut offset = 0;
    while offset < total {
        let chunk = MAX_FRAME_PAYLOAD.min(total - offset);
        let sequence = if offset == 0 {
            SequenceKind::Start
        } else if offset + chunk >= total {
            SequenceKind::End
        } else {
            SequenceKind::Middle
        };
        let id = FrameId::new(priority, address, sequence, type_tag);
        frames.push(Frame::new(id, &buf[offset..offset + chunk])?);
        offset += chunk;
    }
    Ok(frames)
}
