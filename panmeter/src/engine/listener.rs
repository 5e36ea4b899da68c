//! Level listener contract and adapters
//!
//! The engine calls its listener synchronously on the worker thread, once
//! per chunk, in chunk order. Delivery is therefore serialized and
//! lossless. Listeners must only copy or forward the vector; rendering
//! happens elsewhere.

use crate::analysis::LevelVector;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use tracing::trace;

/// Consumer of published level vectors.
pub trait LevelListener: Send {
    fn on_levels(&mut self, levels: LevelVector);
}

/// Latest-value slot for presentation loops.
///
/// The engine swaps in a fresh `Arc` per publication, so readers on any
/// thread see either the previous or the next vector, never a mix.
pub struct LatestLevels {
    current: ArcSwap<LevelVector>,
    sequence: AtomicU64,
}

impl LatestLevels {
    /// Slot holding `initial` with sequence 0
    pub fn new(initial: LevelVector) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            sequence: AtomicU64::new(0),
        }
    }

    /// Most recently published vector
    pub fn latest(&self) -> LevelVector {
        **self.current.load()
    }

    /// Number of publications so far
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    pub fn publish(&self, levels: LevelVector) {
        self.current.store(Arc::new(levels));
        self.sequence.fetch_add(1, Ordering::Release);
    }
}

impl LevelListener for Arc<LatestLevels> {
    fn on_levels(&mut self, levels: LevelVector) {
        self.publish(levels);
    }
}

/// Closure adapter, see [`from_fn`]
pub struct FnListener<F>(F);

/// Wrap a closure as a listener.
pub fn from_fn<F>(f: F) -> FnListener<F>
where
    F: FnMut(LevelVector) + Send,
{
    FnListener(f)
}

impl<F> LevelListener for FnListener<F>
where
    F: FnMut(LevelVector) + Send,
{
    fn on_levels(&mut self, levels: LevelVector) {
        (self.0)(levels)
    }
}

/// Unbounded std channel; a dropped receiver is ignored.
impl LevelListener for mpsc::Sender<LevelVector> {
    fn on_levels(&mut self, levels: LevelVector) {
        if self.send(levels).is_err() {
            trace!("Level receiver dropped");
        }
    }
}

/// Unbounded tokio channel; `send` never blocks.
impl LevelListener for tokio::sync::mpsc::UnboundedSender<LevelVector> {
    fn on_levels(&mut self, levels: LevelVector) {
        if self.send(levels).is_err() {
            trace!("Level receiver dropped");
        }
    }
}

/// Delivers every vector to each listener in registration order.
#[derive(Default)]
pub struct FanOut {
    listeners: Vec<Box<dyn LevelListener>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: impl LevelListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl LevelListener for FanOut {
    fn on_levels(&mut self, levels: LevelVector) {
        for listener in &mut self.listeners {
            listener.on_levels(levels);
        }
    }
}
