//! Bus transport abstraction and the in-memory test bus.
//!
//! The protocol core is driver-agnostic: anything that can transmit and
//! receive frames implements [`Bus`]. Hardware drivers live outside this
//! crate; [`MemoryBus`] provides a shared broadcast medium for tests and
//! simulation.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use canlink_protocol::Frame;
use thiserror::Error;

/// Errors surfaced by a bus transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The frame could not be queued for transmission in time.
    #[error("transmit timed out after {0:?}")]
    TransmitTimeout(Duration),

    /// The bus is no longer reachable.
    #[error("bus disconnected")]
    Disconnected,
}

/// A frame-level transport.
///
/// `transmit` queues one frame for arbitration, blocking at most `timeout`.
/// `receive` returns the next inbound frame, or `None` when nothing arrives
/// within `timeout`. Implementations must be callable from multiple threads.
pub trait Bus: Send + Sync {
    /// Transmit a frame onto the bus.
    fn transmit(&self, frame: &Frame, timeout: Duration) -> Result<(), BusError>;

    /// Receive the next inbound frame, waiting at most `timeout`.
    fn receive(&self, timeout: Duration) -> Result<Option<Frame>, BusError>;
}

#[derive(Debug, Default)]
struct Port {
    queue: Mutex<VecDeque<Frame>>,
    available: Condvar,
}

/// A shared in-memory broadcast bus.
///
/// Every frame transmitted through one endpoint is delivered to every other
/// endpoint, mirroring a physical bus medium where the transmitter does not
/// receive its own frames. Endpoints detach when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    ports: Arc<Mutex<Vec<Arc<Port>>>>,
}

impl MemoryBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        MemoryBus::default()
    }

    /// Attach a new endpoint.
    pub fn endpoint(&self) -> MemoryEndpoint {
        let port = Arc::new(Port::default());
        self.ports.lock().unwrap().push(Arc::clone(&port));
        MemoryEndpoint {
            ports: Arc::clone(&self.ports),
            port,
        }
    }
}

/// One attachment point on a [`MemoryBus`].
#[derive(Debug)]
pub struct MemoryEndpoint {
    ports: Arc<Mutex<Vec<Arc<Port>>>>,
    port: Arc<Port>,
}

impl Bus for MemoryEndpoint {
    fn transmit(&self, frame: &Frame, _timeout: Duration) -> Result<(), BusError> {
        let ports = self.ports.lock().unwrap();
        for port in ports.iter() {
            if Arc::ptr_eq(port, &self.port) {
                continue;
            }
            port.queue.lock().unwrap().push_back(frame.clone());
            port.available.notify_one();
        }
        Ok(())
    }

    fn receive(&self, timeout: Duration) -> Result<Option<Frame>, BusError> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.port.queue.lock().unwrap();
        loop {
            if let Some(frame) = queue.pop_front() {
                return Ok(Some(frame));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let (guard, _timed_out) = self
                .port
                .available
                .wait_timeout(queue, deadline - now)
                .unwrap();
            queue = guard;
        }
    }
}

impl Drop for MemoryEndpoint {
    fn drop(&mut self) {
        let mut ports = self.ports.lock().unwrap();
        ports.retain(|port| !Arc::ptr_eq(port, &self.port));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canlink_protocol::{FrameId, SequenceKind};

    fn test_frame(tag: u8) -> Frame {
        let id = FrameId::new(1, 2, SequenceKind::Single, tag);
        Frame::new(id, &[tag]).unwrap()
    }

    #[test]
    fn test_broadcast_skips_transmitter() {
        let bus = MemoryBus::new();
        let a = bus.endpoint();
        let b = bus.endpoint();
        let c = bus.endpoint();

        a.transmit(&test_frame(1), Duration::from_millis(10)).unwrap();

        assert_eq!(
            b.receive(Duration::from_millis(10)).unwrap(),
            Some(test_frame(1))
        );
        assert_eq!(
            c.receive(Duration::from_millis(10)).unwrap(),
            Some(test_frame(1))
        );
        assert_eq!(a.receive(Duration::from_millis(10)).unwrap(), None);
    }

    #[test]
    fn test_receive_preserves_order() {
        let bus = MemoryBus::new();
        let a = bus.endpoint();
        let b = bus.endpoint();

        for tag in 0..4 {
            a.transmit(&test_frame(tag), Duration::from_millis(10)).unwrap();
        }
        for tag in 0..4 {
            assert_eq!(
                b.receive(Duration::from_millis(10)).unwrap(),
                Some(test_frame(tag))
            );
        }
    }

    #[test]
    fn test_receive_times_out_when_idle() {
        let bus = MemoryBus::new();
        let a = bus.endpoint();
        let started = Instant::now();
        assert_eq!(a.receive(Duration::from_millis(20)).unwrap(), None);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_receive_wakes_on_transmit_from_other_thread() {
        let bus = MemoryBus::new();
        let a = bus.endpoint();
        let b = bus.endpoint();

        let sender = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            a.transmit(&test_frame(3), Duration::from_millis(10)).unwrap();
        });

        let received = b.receive(Duration::from_millis(500)).unwrap();
        assert_eq!(received, Some(test_frame(3)));
        sender.join().unwrap();
    }

    #[test]
    fn test_dropped_endpoint_detaches() {
        let bus = MemoryBus::new();
        let a = bus.endpoint();
        let b = bus.endpoint();
        drop(b);
        // Nothing to deliver to; must not panic or leak into a's queue.
        a.transmit(&test_frame(0), Duration::from_millis(10)).unwrap();
        assert_eq!(a.receive(Duration::from_millis(5)).unwrap(), None);
    }
}
