//! Sample decoding from raw interleaved 16-bit stereo PCM

use super::format::FRAME_SIZE;

/// One stereo frame of signed 16-bit samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    pub fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }

    /// Encode back to wire bytes (used by tests and fixture generation)
    pub fn to_bytes(self, big_endian: bool) -> [u8; FRAME_SIZE] {
        let (l, r) = if big_endian {
            (self.left.to_be_bytes(), self.right.to_be_bytes())
        } else {
            (self.left.to_le_bytes(), self.right.to_le_bytes())
        };
        [l[0], l[1], r[0], r[1]]
    }
}

/// Decode the frame starting at `offset`.
///
/// # Panics
/// If `offset + FRAME_SIZE > buf.len()`. Callers only pass offsets of
/// whole frames inside the bytes they read.
#[inline]
pub fn decode_frame(buf: &[u8], offset: usize, big_endian: bool) -> Frame {
    let b = &buf[offset..offset + FRAME_SIZE];
    if big_endian {
        Frame {
            left: i16::from_be_bytes([b[0], b[1]]),
            right: i16::from_be_bytes([b[2], b[3]]),
        }
    } else {
        Frame {
            left: i16::from_le_bytes([b[0], b[1]]),
            right: i16::from_le_bytes([b[2], b[3]]),
        }
    }
}

/// Number of whole frames in `len` bytes; a trailing partial frame is dropped.
#[inline]
pub fn whole_frames(len: usize) -> usize {
    len / FRAME_SIZE
}

/// Iterate every whole frame in `buf`.
pub fn frames(buf: &[u8], big_endian: bool) -> impl Iterator<Item = Frame> + '_ {
    buf.chunks_exact(FRAME_SIZE)
        .map(move |b| decode_frame(b, 0, big_endian))
}
