//! Fragment session reassembly.
//!
//! Sessions are keyed by the base identifier (the frame identifier with the
//! sequence bits cleared), so concurrent transfers from distinct
//! (priority, address, type) combinations never share state. Two
//! multi-frame transfers that do share all three fields collide on one
//! session: a fresh START always resets it, last writer wins. This is a
//! known protocol limitation, not a defect to repair here.
//!
//! Expiry is measured from the START frame. A MIDDLE or END frame arriving
//! after the timeout discards the session silently; the sender sees the
//! loss as a missing acknowledgment and retries.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use canlink_protocol::{checksum8, FrameId, SequenceKind, MAX_MESSAGE_LEN};

/// Sessions older than this (measured from their START frame) are discarded
/// when the next fragment for their key arrives.
pub const REASSEMBLY_TIMEOUT: Duration = Duration::from_millis(500);

/// An in-progress multi-frame transfer.
#[derive(Debug)]
struct FragmentSession {
    /// Accumulated payload bytes, including the trailing checksum.
    buffer: BytesMut,
    /// When the START frame arrived.
    started: Instant,
}

impl FragmentSession {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.started) > REASSEMBLY_TIMEOUT
    }
}

/// Reassembles fragmented messages, one session per base identifier.
///
/// Time is passed in explicitly so expiry behavior is deterministic under
/// test; the node supplies `Instant::now()` on each inbound frame.
#[derive(Debug, Default)]
pub struct Reassembler {
    sessions: HashMap<u16, FragmentSession>,
}

impl Reassembler {
    /// Create an empty session store.
    pub fn new() -> Self {
        Reassembler::default()
    }

    /// Feed one START, MIDDLE, or END frame into the session store.
    ///
    /// Returns the reassembled, checksum-validated message payload when
    /// `payload` completes a transfer. Stale or out-of-order fragments are
    /// dropped silently; a checksum mismatch discards the whole session
    /// without surfacing an error. SINGLE frames bypass reassembly and are
    /// ignored here.
    pub fn handle_frame(&mut self, id: FrameId, payload: &[u8], now: Instant) -> Option<Vec<u8>> {
        let key = id.base();
        match id.sequence {
            SequenceKind::Start => {
                let mut buffer = BytesMut::with_capacity(MAX_MESSAGE_LEN + 1);
                buffer.extend_from_slice(payload);
                // A new START always resets the session for this key.
                self.sessions.insert(
                    key,
                    FragmentSession {
                        buffer,
                        started: now,
                    },
                );
                None
            }
            SequenceKind::Middle => {
                match self.sessions.get_mut(&key) {
                    Some(session) if session.expired(now) => {
                        log::debug!("discarding expired fragment session 0x{:03X}", key);
                        self.sessions.remove(&key);
                    }
                    Some(session) => session.buffer.extend_from_slice(payload),
                    None => {
                        log::trace!("middle fragment without open session 0x{:03X}", key);
                    }
                }
                None
            }
            SequenceKind::End => {
                let mut session = self.sessions.remove(&key)?;
                if session.expired(now) {
                    log::debug!("discarding expired fragment session 0x{:03X}", key);
                    return None;
                }
                session.buffer.extend_from_slice(payload);
                if session.buffer.is_empty() {
                    return None;
                }
                let received = session.buffer[session.buffer.len() - 1];
                let message = &session.buffer[..session.buffer.len() - 1];
                if checksum8(message) != received {
                    log::debug!(
                        "checksum mismatch on session 0x{:03X} ({} bytes)",
                        key,
                        message.len()
                    );
                    return None;
                }
                Some(message.to_vec())
            }
            SequenceKind::Single => None,
        }
    }

    /// Drop every session whose START is older than the timeout.
    ///
    /// An expired session can never complete (MIDDLE/END frames for it are
    /// discarded on arrival), so this only bounds memory held for senders
    /// that stopped mid-sequence.
    pub fn purge_expired(&mut self, now: Instant) {
        self.sessions.retain(|_, session| !session.expired(now));
    }

    /// Number of open sessions.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }
}
