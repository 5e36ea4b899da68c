//! Lock-free frame ring buffer between the engine thread and the cpal
//! audio callback.
//!
//! - Producer (engine thread): pushes decoded frames, waits when full
//! - Consumer (audio callback): pops without locks, plays silence on underrun

use super::sample::Frame;
use ringbuf::{traits::*, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

/// Default capacity: ~186ms @ 44.1kHz
pub const DEFAULT_RING_FRAMES: usize = 8192;

/// Lock-free SPSC ring of stereo frames
pub struct FrameRingBuffer {
    buffer: HeapRb<Frame>,
    underruns: Arc<AtomicU64>,
    overruns: Arc<AtomicU64>,
    /// Set once the producer has queued at least one full ring
    primed: Arc<AtomicBool>,
}

impl FrameRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: HeapRb::new(capacity.max(1)),
            underruns: Arc::new(AtomicU64::new(0)),
            overruns: Arc::new(AtomicU64::new(0)),
            primed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Split into producer (engine thread) and consumer (audio callback)
    pub fn split(self) -> (FrameProducer, FrameConsumer) {
        let (prod, cons) = self.buffer.split();

        let producer = FrameProducer {
            producer: prod,
            overruns: Arc::clone(&self.overruns),
            primed: Arc::clone(&self.primed),
        };

        let consumer = FrameConsumer {
            consumer: cons,
            underruns: Arc::clone(&self.underruns),
            primed: Arc::clone(&self.primed),
        };

        (producer, consumer)
    }
}

/// Producer half (engine thread)
pub struct FrameProducer {
    producer: ringbuf::HeapProd<Frame>,
    overruns: Arc<AtomicU64>,
    primed: Arc<AtomicBool>,
}

impl FrameProducer {
    /// Push one frame; false if the ring is full.
    pub fn push(&mut self, frame: Frame) -> bool {
        match self.producer.try_push(frame) {
            Ok(()) => true,
            Err(_) => {
                if !self.primed.swap(true, Ordering::Relaxed) {
                    trace!("Frame ring primed");
                }
                let count = self.overruns.fetch_add(1, Ordering::Relaxed) + 1;
                if count % 10_000 == 0 {
                    trace!("Frame ring full (total waits: {})", count);
                }
                false
            }
        }
    }

    pub fn occupied_len(&self) -> usize {
        self.producer.occupied_len()
    }

    pub fn capacity(&self) -> usize {
        self.producer.capacity().into()
    }

    pub fn stats(&self) -> RingBufferStats {
        RingBufferStats {
            overruns: self.overruns.load(Ordering::Relaxed),
            capacity: self.capacity(),
            occupied: self.occupied_len(),
        }
    }
}

/// Consumer half (audio callback)
pub struct FrameConsumer {
    consumer: ringbuf::HeapCons<Frame>,
    underruns: Arc<AtomicU64>,
    primed: Arc<AtomicBool>,
}

impl FrameConsumer {
    /// Pop one frame; None on underrun (caller outputs silence).
    ///
    /// Underruns before the ring is first primed are expected at startup
    /// and logged at TRACE; later ones at WARN.
    pub fn pop(&mut self) -> Option<Frame> {
        match self.consumer.try_pop() {
            Some(frame) => Some(frame),
            None => {
                let count = self.underruns.fetch_add(1, Ordering::Relaxed) + 1;
                if count % 10_000 == 0 {
                    if self.primed.load(Ordering::Relaxed) {
                        warn!("Playback underrun (total: {}) - input not keeping up", count);
                    } else {
                        trace!("Playback underrun during startup (total: {})", count);
                    }
                }
                None
            }
        }
    }

    pub fn occupied_len(&self) -> usize {
        self.consumer.occupied_len()
    }
}

/// Ring buffer statistics
#[derive(Debug, Clone, Copy)]
pub struct RingBufferStats {
    /// Pushes rejected because the ring was full
    pub overruns: u64,
    pub capacity: usize,
    pub occupied: usize,
}

impl RingBufferStats {
    /// Fill level 0.0 to 1.0
    pub fn fill_percent(&self) -> f32 {
        self.occupied as f32 / self.capacity as f32
    }
}
