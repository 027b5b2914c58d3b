//! Protocol constants
//!
//! Field widths and positions within the 11-bit frame identifier, plus the
//! size limits the framing format imposes.

/// Maximum payload bytes a single frame can carry.
pub const MAX_FRAME_PAYLOAD: usize = 8;

/// Maximum encoded message length before fragmentation.
///
/// Bounded by the 8-bit checksum coverage and the session buffer sizing.
pub const MAX_MESSAGE_LEN: usize = 255;

/// Type tag reserved for acknowledgment frames.
pub const ACK_TYPE_TAG: u8 = 0x7;

/// Priority carried by acknowledgment frames (the highest).
pub const ACK_PRIORITY: u8 = 0x3;

/// Address addressing every node on the bus.
pub const BROADCAST_ADDRESS: u8 = 0xF;

// ============================================================================
// Identifier bit layout (MSB -> LSB over 11 bits)
// ============================================================================

/// Bit position of the priority field.
pub const PRIORITY_SHIFT: u32 = 9;
/// Width mask of the priority field (2 bits).
pub const PRIORITY_MASK: u8 = 0x3;

/// Bit position of the address field.
pub const ADDRESS_SHIFT: u32 = 5;
/// Width mask of the address field (4 bits).
pub const ADDRESS_MASK: u8 = 0xF;

/// Bit position of the sequence field.
pub const SEQUENCE_SHIFT: u32 = 3;
/// Width mask of the sequence field (2 bits).
pub const SEQUENCE_MASK: u8 = 0x3;

/// Width mask of the type tag field (3 bits, no shift).
pub const TYPE_TAG_MASK: u8 = 0x7;
