//! Error types for panmeter
//!
//! Three failure domains with different consequences:
//! - [`FormatError`]: raised once at open time, fatal to the session
//! - [`Error::SourceRead`]: input failure mid-stream, orderly shutdown
//! - [`SinkError`]: playback failure, logged and counted, never fatal

use thiserror::Error;

/// Unsupported input format, detected before any data is read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("unsupported channel count {0} (only stereo is supported)")]
    UnsupportedChannels(u16),

    #[error("unsupported sample size {0} bits (only 16-bit is supported)")]
    UnsupportedBitDepth(u16),

    #[error("unsupported sample encoding: {0}")]
    UnsupportedEncoding(String),
}

/// Playback sink failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// No usable output device or device configuration
    #[error("audio device error: {0}")]
    Device(String),

    /// Stream build/play failure or error reported by the audio callback
    #[error("audio stream error: {0}")]
    Stream(String),

    /// Operation on a sink that was never started or is already closed
    #[error("playback sink is not running")]
    NotRunning,

    /// Drain did not complete before the deadline
    #[error("playback drain timed out with {0} frames pending")]
    DrainTimeout(usize),
}

/// Main error type for panmeter
#[derive(Error, Debug)]
pub enum Error {
    /// Unsupported channel count, bit depth or encoding
    #[error("Audio format error: {0}")]
    Format(#[from] FormatError),

    /// I/O failure while reading the input stream
    #[error("Source read error: {0}")]
    SourceRead(#[source] std::io::Error),

    /// Input could not be opened or its header parsed
    #[error("Source open error: {0}")]
    SourceOpen(String),

    /// Playback sink failure surfaced to a caller
    #[error("Playback error: {0}")]
    Sink(#[from] SinkError),

    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<panmeter_common::Error> for Error {
    fn from(e: panmeter_common::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Convenience Result type using panmeter Error
pub type Result<T> = std::result::Result<T, Error>;
