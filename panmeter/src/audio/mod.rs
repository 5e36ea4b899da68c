//! Audio I/O: format metadata, sample decoding, sources and playback sinks

pub mod format;
pub mod output;
pub mod ring_buffer;
pub mod sample;
pub mod sink;
pub mod source;

pub use format::{AudioFormat, FRAME_SIZE};
pub use output::CpalSink;
pub use sample::{decode_frame, Frame};
pub use sink::{NullSink, PacedSink, PlaybackSink};
pub use source::{PcmSource, RawPcmSource, ReadOutcome, WavFileSource};
