//! Per-window energy accumulation

use super::mixer::{mix, VIRTUAL_CHANNELS};
use crate::audio::sample::{frames, Frame};

/// Running sum of squares per virtual channel plus frame count.
///
/// Owned exclusively by the analysis loop; consumed by
/// [`super::level::convert`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowAccumulator {
    pub sum_of_squares: [f64; VIRTUAL_CHANNELS],
    pub frame_count: u64,
}

impl WindowAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one frame's contribution.
    #[inline]
    pub fn add(&mut self, frame: Frame) {
        for (sum, value) in self.sum_of_squares.iter_mut().zip(mix(frame)) {
            *sum += value;
        }
        self.frame_count += 1;
    }

    /// Add every whole frame in `bytes`; a trailing partial frame is ignored.
    ///
    /// Returns the number of frames added.
    pub fn add_chunk(&mut self, bytes: &[u8], big_endian: bool) -> u64 {
        let before = self.frame_count;
        for frame in frames(bytes, big_endian) {
            self.add(frame);
        }
        self.frame_count - before
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &WindowAccumulator) {
        for (sum, value) in self.sum_of_squares.iter_mut().zip(other.sum_of_squares) {
            *sum += value;
        }
        self.frame_count += other.frame_count;
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }
}
