//! RMS and dB conversion

use super::accumulator::WindowAccumulator;
use super::mixer::{VirtualChannel, VIRTUAL_CHANNELS};
use serde::Serialize;
use std::ops::Index;

/// Full-scale reference for 16-bit samples
pub const FULL_SCALE: f64 = 32767.0;

/// Floor used by the live meter
pub const LIVE_FLOOR_DB: f64 = -60.0;

/// Floor used by whole-file summaries
pub const OFFLINE_FLOOR_DB: f64 = -90.0;

/// Five dB readings in virtual-channel order.
///
/// A plain `Copy` value: every listener receives its own copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LevelVector([f64; VIRTUAL_CHANNELS]);

impl LevelVector {
    pub fn new(levels: [f64; VIRTUAL_CHANNELS]) -> Self {
        Self(levels)
    }

    /// All channels at `floor_db`
    pub fn floor(floor_db: f64) -> Self {
        Self([floor_db; VIRTUAL_CHANNELS])
    }

    pub fn get(&self, channel: VirtualChannel) -> f64 {
        self.0[channel.index()]
    }

    pub fn as_array(&self) -> &[f64; VIRTUAL_CHANNELS] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    /// Pairs of (channel, dB) in display order
    pub fn channels(&self) -> impl Iterator<Item = (VirtualChannel, f64)> + '_ {
        VirtualChannel::ALL.into_iter().zip(self.iter())
    }

    /// True when every channel reads exactly `floor_db`
    pub fn is_floor(&self, floor_db: f64) -> bool {
        self.0.iter().all(|&db| db == floor_db)
    }
}

impl Index<usize> for LevelVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl Index<VirtualChannel> for LevelVector {
    type Output = f64;

    fn index(&self, channel: VirtualChannel) -> &f64 {
        &self.0[channel.index()]
    }
}

impl From<LevelVector> for [f64; VIRTUAL_CHANNELS] {
    fn from(levels: LevelVector) -> Self {
        levels.0
    }
}

/// Convert an RMS amplitude to dBFS, substituting `floor_db` for
/// non-finite results (silence gives -inf).
#[inline]
pub fn rms_to_db(rms: f64, floor_db: f64) -> f64 {
    let db = 20.0 * (rms / FULL_SCALE).log10();
    if db.is_finite() {
        db
    } else {
        floor_db
    }
}

/// Turn one accumulated window into five dB readings.
///
/// An empty window reads `floor_db` on every channel. No lower clamp is
/// applied beyond the floor substitution, so very quiet windows may read
/// below the floor.
pub fn convert(acc: &WindowAccumulator, floor_db: f64) -> LevelVector {
    if acc.frame_count == 0 {
        return LevelVector::floor(floor_db);
    }

    let frames = acc.frame_count as f64;
    let mut out = [floor_db; VIRTUAL_CHANNELS];
    for (slot, sum) in out.iter_mut().zip(acc.sum_of_squares) {
        let rms = (sum / frames).sqrt();
        *slot = rms_to_db(rms, floor_db);
    }
    LevelVector(out)
}
