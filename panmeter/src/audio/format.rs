//! Input format metadata and validation

use crate::error::FormatError;
use serde::Serialize;

/// Bytes per stereo 16-bit frame
pub const FRAME_SIZE: usize = 4;

/// Required channel count
pub const CHANNELS: u16 = 2;

/// Required sample size
pub const BITS_PER_SAMPLE: u16 = 16;

/// Format metadata supplied by a source before streaming begins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AudioFormat {
    pub channel_count: u16,
    pub bits_per_sample: u16,
    /// Frames per second
    pub frame_rate: f64,
    pub is_big_endian: bool,
}

impl AudioFormat {
    /// Stereo 16-bit format at `frame_rate`
    pub fn stereo_16(frame_rate: f64, is_big_endian: bool) -> Self {
        Self {
            channel_count: CHANNELS,
            bits_per_sample: BITS_PER_SAMPLE,
            frame_rate,
            is_big_endian,
        }
    }

    /// Reject anything other than 16-bit stereo.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.channel_count != CHANNELS {
            return Err(FormatError::UnsupportedChannels(self.channel_count));
        }
        if self.bits_per_sample != BITS_PER_SAMPLE {
            return Err(FormatError::UnsupportedBitDepth(self.bits_per_sample));
        }
        Ok(())
    }

    /// Frame size in bytes as declared by the metadata
    pub fn frame_size(&self) -> usize {
        self.channel_count as usize * (self.bits_per_sample as usize / 8)
    }
}
