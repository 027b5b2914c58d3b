//! Pending-acknowledgment table.
//!
//! One slot per outstanding send, keyed by (destination address, type tag)
//! — exactly the two values an acknowledgment frame carries. The receive
//! path completes slots; senders block on a condition variable with a
//! deadline. An acknowledgment nobody is waiting for is dropped.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Key of one outstanding acknowledgment: (destination address, type tag).
pub(crate) type AckKey = (u8, u8);

/// Completion slots for in-flight sends.
///
/// A slot is armed before the first frame of its send goes out, so an
/// acknowledgment that races ahead of the sender's wait is not lost. The
/// slot stays armed across retransmissions and is removed only when the
/// send finishes, successfully or not.
#[derive(Debug, Default)]
pub(crate) struct AckTable {
    slots: Mutex<HashMap<AckKey, bool>>,
    completed: Condvar,
}

impl AckTable {
    pub fn new() -> Self {
        AckTable::default()
    }

    /// Open a pending slot, clearing any stale completion for the key.
    pub fn arm(&self, key: AckKey) {
        self.slots.lock().unwrap().insert(key, false);
    }

    /// Mark a slot completed and wake waiters.
    ///
    /// Returns `false` when no send is waiting on `key`.
    pub fn complete(&self, key: AckKey) -> bool {
        let mut slots = self.slots.lock().unwrap();
        match slots.get_mut(&key) {
            Some(done) => {
                *done = true;
                self.completed.notify_all();
                true
            }
            None => false,
        }
    }

    /// Block until the slot for `key` completes or `timeout` elapses.
    pub fn wait(&self, key: AckKey, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slots = self.slots.lock().unwrap();
        loop {
            match slots.get(&key) {
                Some(true) => return true,
                Some(false) => {}
                None => return false,
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _timed_out) = self
                .completed
                .wait_timeout(slots, deadline - now)
                .unwrap();
            slots = guard;
        }
    }

    /// Close the slot once its send finishes.
    pub fn disarm(&self, key: AckKey) {
        self.slots.lock().unwrap().remove(&key);
    }
}
