//! WAV fixture generation
//!
//! Every fixture is 16-bit stereo at [`TEST_SAMPLE_RATE`] unless the
//! helper exists to produce an unsupported format.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::f64::consts::PI;
use std::path::Path;

pub const TEST_SAMPLE_RATE: u32 = 44100;

fn stereo_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn frame_count(sample_rate: u32, duration_ms: u64) -> u64 {
    sample_rate as u64 * duration_ms / 1000
}

/// Silent stereo WAV
pub fn generate_silent_wav<P: AsRef<Path>>(path: P, duration_ms: u64) -> Result<(), hound::Error> {
    generate_constant_wav(path, TEST_SAMPLE_RATE, duration_ms, 0, 0)
}

/// Stereo WAV holding the same (left, right) frame throughout
pub fn generate_constant_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    duration_ms: u64,
    left: i16,
    right: i16,
) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, stereo_spec(sample_rate))?;
    for _ in 0..frame_count(sample_rate, duration_ms) {
        writer.write_sample(left)?;
        writer.write_sample(right)?;
    }
    writer.finalize()
}

/// Stereo sine at `frequency` Hz with per-channel peak amplitudes
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    frequency: f64,
    duration_ms: u64,
    left_amplitude: f64,
    right_amplitude: f64,
) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, stereo_spec(TEST_SAMPLE_RATE))?;
    for n in 0..frame_count(TEST_SAMPLE_RATE, duration_ms) {
        let phase = 2.0 * PI * frequency * n as f64 / TEST_SAMPLE_RATE as f64;
        let value = phase.sin();
        writer.write_sample((value * left_amplitude * 32767.0).round() as i16)?;
        writer.write_sample((value * right_amplitude * 32767.0).round() as i16)?;
    }
    writer.finalize()
}

/// Mono 16-bit WAV (unsupported channel count)
pub fn generate_mono_wav<P: AsRef<Path>>(path: P, duration_ms: u64) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        ..stereo_spec(TEST_SAMPLE_RATE)
    };
    let mut writer = WavWriter::create(path, spec)?;
    for _ in 0..frame_count(TEST_SAMPLE_RATE, duration_ms) {
        writer.write_sample(1000i16)?;
    }
    writer.finalize()
}

/// Stereo 32-bit float WAV (unsupported encoding)
pub fn generate_float_wav<P: AsRef<Path>>(path: P, duration_ms: u64) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 2,
        sample_rate: TEST_SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for _ in 0..frame_count(TEST_SAMPLE_RATE, duration_ms) * 2 {
        writer.write_sample(0.25f32)?;
    }
    writer.finalize()
}
