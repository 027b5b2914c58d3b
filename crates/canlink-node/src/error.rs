//! Node error types.

use canlink_protocol::ProtocolError;
use thiserror::Error;

use crate::bus::BusError;

/// Errors surfaced by [`crate::CanNode::send`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The message could not be encoded into frames.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The bus driver rejected a frame. Not retried at this layer.
    #[error("transport error: {0}")]
    Transport(#[from] BusError),

    /// Every transmission attempt went unacknowledged.
    #[error("no acknowledgment for tag {type_tag} from address {address}")]
    AckTimeout {
        /// Type tag of the unacknowledged message.
        type_tag: u8,
        /// Address the message was sent to.
        address: u8,
    },
}

/// Errors from handler registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The tag is reserved for acknowledgment frames and cannot carry
    /// application handlers.
    #[error("type tag {0} is reserved for acknowledgment frames")]
    ReservedTypeTag(u8),
}
