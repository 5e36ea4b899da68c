//! Playback sink collaborator
//!
//! The engine hands every chunk's raw bytes to a sink after analysis.
//! Sink failures are isolated: the engine logs them and keeps publishing.

use super::format::{AudioFormat, FRAME_SIZE};
use crate::engine::StopHandle;
use crate::error::SinkError;
use std::time::{Duration, Instant};
use tracing::debug;

/// Playback sink lifecycle: `start` → `write`* → (`drain`) → `stop` → `close`.
pub trait PlaybackSink: Send {
    /// Prepare for playback. Blocking writes must return promptly once
    /// `stop` is requested.
    fn start(&mut self, stop: &StopHandle) -> Result<(), SinkError>;

    /// Queue one chunk of raw PCM bytes, in production order.
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError>;

    /// Wait until queued audio has been played.
    fn drain(&mut self) -> Result<(), SinkError>;

    /// Stop output immediately, discarding queued audio.
    fn stop(&mut self) -> Result<(), SinkError>;

    /// Release the device.
    fn close(&mut self) -> Result<(), SinkError>;
}

/// Sink that discards everything (offline analysis, tests).
#[derive(Debug, Default)]
pub struct NullSink {
    bytes_written: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl PlaybackSink for NullSink {
    fn start(&mut self, _stop: &StopHandle) -> Result<(), SinkError> {
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn drain(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Silent sink that consumes audio at wall-clock rate.
///
/// Stands in for a device when playback is disabled so the live meter
/// still advances in real time.
pub struct PacedSink {
    frame_rate: f64,
    started_at: Option<Instant>,
    frames_written: u64,
    stop: Option<StopHandle>,
}

/// Longest single sleep, so stop requests are noticed quickly
const PACE_SLICE: Duration = Duration::from_millis(10);

impl PacedSink {
    pub fn new(format: &AudioFormat) -> Self {
        Self {
            frame_rate: format.frame_rate,
            started_at: None,
            frames_written: 0,
            stop: None,
        }
    }

    /// Wall-clock offset of the end of the audio written so far
    fn written_duration(&self) -> Duration {
        if self.frame_rate > 0.0 && self.frame_rate.is_finite() {
            Duration::from_secs_f64(self.frames_written as f64 / self.frame_rate)
        } else {
            Duration::ZERO
        }
    }

    fn sleep_until(&self, deadline: Instant) {
        loop {
            if self.stop.as_ref().is_some_and(|s| s.is_stop_requested()) {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep((deadline - now).min(PACE_SLICE));
        }
    }
}

impl PlaybackSink for PacedSink {
    fn start(&mut self, stop: &StopHandle) -> Result<(), SinkError> {
        self.stop = Some(stop.clone());
        self.started_at = Some(Instant::now());
        self.frames_written = 0;
        debug!("Paced sink started at {} Hz", self.frame_rate);
        Ok(())
    }

    /// Blocks until the previous chunk has "played", then accepts this one.
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        let started_at = self.started_at.ok_or(SinkError::NotRunning)?;
        self.sleep_until(started_at + self.written_duration());
        self.frames_written += (bytes.len() / FRAME_SIZE) as u64;
        Ok(())
    }

    fn drain(&mut self) -> Result<(), SinkError> {
        if let Some(started_at) = self.started_at {
            self.sleep_until(started_at + self.written_duration());
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SinkError> {
        self.started_at = None;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.started_at = None;
        self.stop = None;
        Ok(())
    }
}
