//! Failure-path tests: loss, corruption, staleness, and retry exhaustion.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use canlink_node::{Bus, BusError, CanNode, MemoryBus, MemoryEndpoint, NodeConfig, SendError};
use canlink_protocol::{
    ensure_payload_len, fragment_message, BusMessage, Frame, ProtocolError, SequenceKind,
    ACK_TYPE_TAG,
};

// ============================================================================
// Test Message
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FirmwareChunk {
    offset: u32,
    data: [u8; 16],
}

impl BusMessage for FirmwareChunk {
    const TYPE_TAG: u8 = 3;
    const ENCODED_LEN: usize = 20;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::ENCODED_LEN);
        buf.extend_from_slice(&self.offset.to_le_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        ensure_payload_len(data, Self::ENCODED_LEN)?;
        let mut chunk = [0u8; 16];
        chunk.copy_from_slice(&data[4..20]);
        Ok(FirmwareChunk {
            offset: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            data: chunk,
        })
    }
}

// ============================================================================
// Test Harness
// ============================================================================

struct Poller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    fn start<B: Bus + 'static>(node: &Arc<CanNode<B>>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let node = Arc::clone(node);
        let handle = thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                let _ = node.poll_once();
            }
        });
        Poller {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn drain(monitor: &MemoryEndpoint, quiet: Duration) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(Some(frame)) = monitor.receive(quiet) {
        frames.push(frame);
    }
    frames
}

/// A bus endpoint that silently loses selected outbound frames.
struct LossyEndpoint {
    inner: MemoryEndpoint,
    drop_indices: Vec<usize>,
    transmitted: AtomicUsize,
}

impl LossyEndpoint {
    fn new(inner: MemoryEndpoint, drop_indices: Vec<usize>) -> Self {
        LossyEndpoint {
            inner,
            drop_indices,
            transmitted: AtomicUsize::new(0),
        }
    }
}

impl Bus for LossyEndpoint {
    fn transmit(&self, frame: &Frame, timeout: Duration) -> Result<(), BusError> {
        let index = self.transmitted.fetch_add(1, Ordering::SeqCst);
        if self.drop_indices.contains(&index) {
            // The frame vanishes on the wire; the driver reports success.
            return Ok(());
        }
        self.inner.transmit(frame, timeout)
    }

    fn receive(&self, timeout: Duration) -> Result<Option<Frame>, BusError> {
        self.inner.receive(timeout)
    }
}

/// A bus whose driver refuses every transmission.
struct DeadBus;

impl Bus for DeadBus {
    fn transmit(&self, _frame: &Frame, _timeout: Duration) -> Result<(), BusError> {
        Err(BusError::Disconnected)
    }

    fn receive(&self, _timeout: Duration) -> Result<Option<Frame>, BusError> {
        Ok(None)
    }
}

// ============================================================================
// Corruption and Staleness
// ============================================================================

#[test]
fn test_corrupted_fragment_is_discarded_without_dispatch_or_ack() {
    let bus = MemoryBus::new();
    let injector = bus.endpoint();
    let receiver = Arc::new(CanNode::new(bus.endpoint()));

    let dispatched = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&dispatched);
    receiver
        .on_receive::<FirmwareChunk, _>(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let _poller = Poller::start(&receiver);

    let chunk = FirmwareChunk {
        offset: 0x1000,
        data: [0x5A; 16],
    };
    let frames = fragment_message(1, 4, FirmwareChunk::TYPE_TAG, &chunk.encode()).unwrap();

    // Corrupt one byte of the MIDDLE frame before it hits the bus.
    let mut corrupted = frames[1].data().to_vec();
    corrupted[0] ^= 0x80;
    let middle = Frame::new(frames[1].id(), &corrupted).unwrap();

    injector
        .transmit(&frames[0], Duration::from_millis(10))
        .unwrap();
    injector.transmit(&middle, Duration::from_millis(10)).unwrap();
    injector
        .transmit(&frames[2], Duration::from_millis(10))
        .unwrap();

    // Give the receiver time to chew through all three frames, then check
    // that nothing was dispatched and no acknowledgment came back.
    thread::sleep(Duration::from_millis(100));
    assert_eq!(dispatched.load(Ordering::SeqCst), 0);
    assert_eq!(injector.receive(Duration::from_millis(50)).unwrap(), None);
}

#[test]
fn test_stale_session_is_discarded_even_with_valid_checksum() {
    let bus = MemoryBus::new();
    let injector = bus.endpoint();
    let receiver = Arc::new(CanNode::new(bus.endpoint()));

    let dispatched = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&dispatched);
    receiver
        .on_receive::<FirmwareChunk, _>(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let _poller = Poller::start(&receiver);

    let chunk = FirmwareChunk {
        offset: 0,
        data: [1; 16],
    };
    let frames = fragment_message(0, 2, FirmwareChunk::TYPE_TAG, &chunk.encode()).unwrap();

    injector
        .transmit(&frames[0], Duration::from_millis(10))
        .unwrap();
    // Let the session age past the reassembly timeout.
    thread::sleep(Duration::from_millis(550));
    injector
        .transmit(&frames[1], Duration::from_millis(10))
        .unwrap();
    injector
        .transmit(&frames[2], Duration::from_millis(10))
        .unwrap();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(dispatched.load(Ordering::SeqCst), 0);
    assert_eq!(injector.receive(Duration::from_millis(50)).unwrap(), None);
}

// ============================================================================
// Retry Behavior
// ============================================================================

#[test]
fn test_retry_exhaustion_makes_limit_plus_one_attempts() {
    let bus = MemoryBus::new();
    let sender = CanNode::with_config(bus.endpoint(), NodeConfig { retry_limit: 2 });
    let monitor = bus.endpoint();

    let errors: Arc<Mutex<Vec<(u8, u8)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    sender.on_error(move |tag, address| sink.lock().unwrap().push((tag, address)));

    // Nobody on the bus acknowledges.
    let chunk = FirmwareChunk {
        offset: 4,
        data: [7; 16],
    };
    let result = sender.send(1, 9, &chunk);
    assert_eq!(
        result,
        Err(SendError::AckTimeout {
            type_tag: FirmwareChunk::TYPE_TAG,
            address: 9
        })
    );

    // Retry limit 2 means exactly 3 full transmissions of all 3 fragments.
    let frames = drain(&monitor, Duration::from_millis(100));
    assert_eq!(frames.len(), 9);
    let starts = frames
        .iter()
        .filter(|f| f.id().sequence == SequenceKind::Start)
        .count();
    assert_eq!(starts, 3);
    assert!(!frames.iter().any(|f| f.id().type_tag == ACK_TYPE_TAG));

    assert_eq!(&*errors.lock().unwrap(), &[(FirmwareChunk::TYPE_TAG, 9)]);
}

#[test]
fn test_lost_fragment_is_recovered_by_retransmission() {
    let bus = MemoryBus::new();
    // The END frame of the first attempt never reaches the bus.
    let sender = Arc::new(CanNode::new(LossyEndpoint::new(bus.endpoint(), vec![2])));
    let receiver = Arc::new(CanNode::new(bus.endpoint()));

    let dispatched = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&dispatched);
    receiver
        .on_receive::<FirmwareChunk, _>(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let _receiver_poller = Poller::start(&receiver);
    let _sender_poller = Poller::start(&sender);

    let chunk = FirmwareChunk {
        offset: 8,
        data: [3; 16],
    };
    assert_eq!(sender.send(2, 5, &chunk), Ok(()));

    // The first attempt stalled mid-transfer; the second attempt's START
    // reset the session and completed, so the message arrives exactly once.
    assert_eq!(dispatched.load(Ordering::SeqCst), 1);
}

#[test]
fn test_transmit_failure_fails_fast_and_reports() {
    let sender = CanNode::new(DeadBus);

    let errors: Arc<Mutex<Vec<(u8, u8)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    sender.on_error(move |tag, address| sink.lock().unwrap().push((tag, address)));

    let chunk = FirmwareChunk {
        offset: 12,
        data: [9; 16],
    };
    let started = Instant::now();
    let result = sender.send(0, 6, &chunk);
    assert_eq!(result, Err(SendError::Transport(BusError::Disconnected)));

    // No ack wait, no retries: the failure surfaces immediately.
    assert!(started.elapsed() < Duration::from_millis(50));
    assert_eq!(&*errors.lock().unwrap(), &[(FirmwareChunk::TYPE_TAG, 6)]);
}
