//! Virtual-channel mixer
//!
//! Spreads the two physical channels over five virtual positions using a
//! fixed linear panning law. Every weight pair sums to 1.0, so an in-phase
//! full-scale signal reads the same level on all five channels.

use crate::audio::Frame;
use serde::Serialize;

/// Number of virtual channels
pub const VIRTUAL_CHANNELS: usize = 5;

/// (left_weight, right_weight) per virtual channel, in display order
pub const CHANNEL_WEIGHTS: [(f64, f64); VIRTUAL_CHANNELS] = [
    (1.0, 0.0),
    (0.75, 0.25),
    (0.5, 0.5),
    (0.25, 0.75),
    (0.0, 1.0),
];

/// Virtual channel positions, left to right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualChannel {
    Left,
    LeftCenter,
    Center,
    RightCenter,
    Right,
}

impl VirtualChannel {
    pub const ALL: [VirtualChannel; VIRTUAL_CHANNELS] = [
        VirtualChannel::Left,
        VirtualChannel::LeftCenter,
        VirtualChannel::Center,
        VirtualChannel::RightCenter,
        VirtualChannel::Right,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn weights(self) -> (f64, f64) {
        CHANNEL_WEIGHTS[self.index()]
    }

    pub fn label(self) -> &'static str {
        match self {
            VirtualChannel::Left => "Left",
            VirtualChannel::LeftCenter => "Left-Center",
            VirtualChannel::Center => "Center",
            VirtualChannel::RightCenter => "Right-Center",
            VirtualChannel::Right => "Right",
        }
    }
}

/// Squared-amplitude contribution of one frame to each virtual channel.
#[inline]
pub fn mix(frame: Frame) -> [f64; VIRTUAL_CHANNELS] {
    // i16 * i16 fits in i32 exactly
    let l2 = (frame.left as i32 * frame.left as i32) as f64;
    let r2 = (frame.right as i32 * frame.right as i32) as f64;

    let mut out = [0.0; VIRTUAL_CHANNELS];
    for (slot, (wl, wr)) in out.iter_mut().zip(CHANNEL_WEIGHTS) {
        *slot = wl * l2 + wr * r2;
    }
    out
}
