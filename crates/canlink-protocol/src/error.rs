//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when building or decoding wire data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame payload exceeds the transport's eight-byte limit.
    #[error("frame payload too long: maximum {max} bytes, got {actual}")]
    FrameTooLong {
        /// Maximum allowed payload length.
        max: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// Message encodes to zero bytes; nothing to transmit.
    #[error("message encodes to an empty payload")]
    EmptyMessage,

    /// Message is too long for the framing format.
    #[error("message too long: maximum {max} bytes, got {actual}")]
    MessageTooLong {
        /// Maximum allowed message length.
        max: usize,
        /// Actual message length.
        actual: usize,
    },

    /// Typed payload is shorter than the message layout requires.
    #[error("payload too short: expected at least {expected} bytes, got {actual}")]
    PayloadTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },
}
