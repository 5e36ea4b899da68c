//! Test helpers for panmeter integration tests
//!
//! - audio_generator: deterministic WAV and raw PCM fixtures
//! - error_injection: sources and sinks that fail on demand

#![allow(dead_code)]

pub mod audio_generator;
pub mod error_injection;

pub use audio_generator::{
    generate_constant_wav, generate_float_wav, generate_mono_wav, generate_silent_wav,
    generate_sine_wav, TEST_SAMPLE_RATE,
};
pub use error_injection::{FailingSource, RecordingSink, SinkCall, SinkFailure};
