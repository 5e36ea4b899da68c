//! Streaming analysis engine
//!
//! One producer loop per session:
//!
//! ```text
//! Idle → Reading → Processing → Publishing ─┐
//!          ▲                                │
//!          └────────────────────────────────┘
//!   end of input / stop / read error → Draining → Closed
//! ```
//!
//! The only blocking call in the loop is the chunk read (plus the playback
//! write when a device applies back-pressure). Stop requests are observed
//! between iterations, never mid-chunk.

pub mod listener;

use crate::analysis::{convert, LevelVector, WindowAccumulator, LIVE_FLOOR_DB, OFFLINE_FLOOR_DB};
use crate::audio::sample::whole_frames;
use crate::audio::{AudioFormat, PcmSource, PlaybackSink, ReadOutcome, FRAME_SIZE};
use crate::error::{Error, FormatError, Result};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

pub use listener::{from_fn, FanOut, LatestLevels, LevelListener};

/// Fallback chunk size when the window rounds to less than one frame
pub const MIN_CHUNK_FRAMES: usize = 10;

/// Live meter window
pub const LIVE_WINDOW_SECONDS: f64 = 0.05;

/// Whole-file summary window
pub const OFFLINE_WINDOW_SECONDS: f64 = 0.1;

/// How accumulated energy maps to publications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulationScope {
    /// One vector per chunk, then a floor vector at end of stream
    PerChunk,
    /// One vector for the whole stream, published at end of stream
    WholeStream,
}

/// Engine parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub window_seconds: f64,
    pub floor_db: f64,
    pub scope: AccumulationScope,
}

impl EngineConfig {
    /// 50 ms windows, -60 dB floor, per-chunk publication
    pub fn live() -> Self {
        Self {
            window_seconds: LIVE_WINDOW_SECONDS,
            floor_db: LIVE_FLOOR_DB,
            scope: AccumulationScope::PerChunk,
        }
    }

    /// 100 ms reads, -90 dB floor, single whole-stream publication
    pub fn whole_file() -> Self {
        Self {
            window_seconds: OFFLINE_WINDOW_SECONDS,
            floor_db: OFFLINE_FLOOR_DB,
            scope: AccumulationScope::WholeStream,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::live()
    }
}

/// Longest window accepted from configuration
pub const MAX_WINDOW_SECONDS: f64 = 10.0;

/// Upper bound on the chunk buffer, whatever the rate and window (64 MiB)
pub const MAX_CHUNK_BYTES: usize = 64 * 1024 * 1024;

/// Chunk size in bytes for one window.
///
/// `frame_rate × window_seconds × frame_size`, truncated and rounded down
/// to whole frames, capped at [`MAX_CHUNK_BYTES`]. Falls back to
/// [`MIN_CHUNK_FRAMES`] when that is zero.
pub fn chunk_bytes(format: &AudioFormat, window_seconds: f64) -> usize {
    let raw = format.frame_rate * window_seconds * FRAME_SIZE as f64;
    let bytes = if raw.is_nan() {
        0
    } else {
        // Negatives saturate to 0
        raw.min(MAX_CHUNK_BYTES as f64) as usize
    };
    let bytes = bytes - bytes % FRAME_SIZE;
    if bytes == 0 {
        MIN_CHUNK_FRAMES * FRAME_SIZE
    } else {
        bytes
    }
}

/// Engine lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Idle = 0,
    Reading = 1,
    Processing = 2,
    Publishing = 3,
    Draining = 4,
    Closed = 5,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => EngineState::Idle,
            1 => EngineState::Reading,
            2 => EngineState::Processing,
            3 => EngineState::Publishing,
            4 => EngineState::Draining,
            _ => EngineState::Closed,
        }
    }
}

/// Engine state shared with handles on other threads
#[derive(Debug, Clone)]
struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(EngineState::Idle as u8)))
    }

    fn get(&self) -> EngineState {
        EngineState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: EngineState) {
        let previous = self.0.swap(state as u8, Ordering::AcqRel);
        trace!("Engine state: {:?} -> {:?}", EngineState::from_u8(previous), state);
    }
}

/// Cooperative stop request, shared by the engine, its sink and callers.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop; takes effect at the next loop iteration boundary.
    pub fn stop(&self) {
        if !self.0.swap(true, Ordering::AcqRel) {
            debug!("Stop requested");
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    EndOfStream,
    Stopped,
}

/// Counters and results of one completed run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// Chunks read and analysed
    pub chunks: u64,
    /// Whole frames analysed
    pub frames: u64,
    /// Listener invocations, including the end-of-stream publication
    pub publications: u64,
    /// Failed playback operations
    pub sink_errors: u64,
    /// Whole-stream aggregate (`WholeStream` scope only)
    pub final_levels: Option<LevelVector>,
}

enum LoopExit {
    EndOfStream,
    Stopped,
    ReadError(io::Error),
}

/// The streaming analysis engine.
pub struct Engine {
    source: Box<dyn PcmSource>,
    sink: Option<Box<dyn PlaybackSink>>,
    listener: Option<Box<dyn LevelListener>>,
    config: EngineConfig,
    format: AudioFormat,
    chunk_bytes: usize,
    state: StateCell,
    stop: StopHandle,
}

impl Engine {
    /// Validate the source format and prepare a session.
    ///
    /// # Errors
    /// [`FormatError`] if the source is not 16-bit stereo. Nothing has been
    /// read at that point and the source is closed.
    pub fn open<S: PcmSource + 'static>(
        source: S,
        config: EngineConfig,
    ) -> std::result::Result<Self, FormatError> {
        Self::open_boxed(Box::new(source), config)
    }

    /// [`Engine::open`] for an already boxed source
    pub fn open_boxed(
        mut source: Box<dyn PcmSource>,
        config: EngineConfig,
    ) -> std::result::Result<Self, FormatError> {
        let format = source.format();
        if let Err(e) = format.validate() {
            warn!("Rejecting input: {}", e);
            if let Err(close_err) = source.close() {
                debug!("Failed to close rejected source: {}", close_err);
            }
            return Err(e);
        }

        let chunk_bytes = chunk_bytes(&format, config.window_seconds);
        debug!(
            "Engine opened: {} Hz, {}, window {}s -> {} bytes/chunk, floor {} dB, {:?}",
            format.frame_rate,
            if format.is_big_endian { "big-endian" } else { "little-endian" },
            config.window_seconds,
            chunk_bytes,
            config.floor_db,
            config.scope
        );

        Ok(Self {
            source,
            sink: None,
            listener: None,
            config,
            format,
            chunk_bytes,
            state: StateCell::new(),
            stop: StopHandle::new(),
        })
    }

    /// Forward raw chunk bytes to a playback sink
    pub fn with_sink(mut self, sink: impl PlaybackSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// [`Engine::with_sink`] for an already boxed sink
    pub fn with_boxed_sink(mut self, sink: Box<dyn PlaybackSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Publish level vectors to `listener`
    pub fn with_listener(mut self, listener: impl LevelListener + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Handle for cooperative cancellation from any thread
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Request a stop (same as `stop_handle().stop()`)
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }

    /// Run the read loop to completion. Blocks; run it on a dedicated
    /// worker thread (see [`spawn`]).
    ///
    /// # Errors
    /// [`Error::SourceRead`] if the input fails mid-stream. Playback has
    /// been drained and the source closed by then.
    pub fn run(mut self) -> Result<RunSummary> {
        info!(
            "Analysis started ({:?}, {} bytes/chunk)",
            self.config.scope, self.chunk_bytes
        );

        let mut summary = RunSummary {
            outcome: RunOutcome::EndOfStream,
            chunks: 0,
            frames: 0,
            publications: 0,
            sink_errors: 0,
            final_levels: None,
        };

        self.start_sink(&mut summary);

        let big_endian = self.format.is_big_endian;
        let floor_db = self.config.floor_db;
        let mut buf = vec![0u8; self.chunk_bytes];
        let mut stream_total = WindowAccumulator::new();

        let exit = loop {
            if self.stop.is_stop_requested() {
                break LoopExit::Stopped;
            }

            self.state.set(EngineState::Reading);
            let bytes_read = match self.source.read(&mut buf) {
                Ok(ReadOutcome::Data(n)) => n.min(buf.len()),
                Ok(ReadOutcome::EndOfStream) => break LoopExit::EndOfStream,
                Err(e) => break LoopExit::ReadError(e),
            };

            self.state.set(EngineState::Processing);
            let frame_count = whole_frames(bytes_read);
            let mut window = WindowAccumulator::new();
            window.add_chunk(&buf[..frame_count * FRAME_SIZE], big_endian);
            summary.chunks += 1;
            summary.frames += frame_count as u64;

            match self.config.scope {
                AccumulationScope::PerChunk => {
                    let levels = convert(&window, floor_db);
                    trace!("Chunk {}: {} frames -> {:?}", summary.chunks, frame_count, levels);
                    self.state.set(EngineState::Publishing);
                    self.publish(levels, &mut summary);
                }
                AccumulationScope::WholeStream => stream_total.merge(&window),
            }

            self.forward(&buf[..bytes_read], &mut summary);
        };

        let read_error = match exit {
            LoopExit::EndOfStream => {
                let last = match self.config.scope {
                    AccumulationScope::PerChunk => LevelVector::floor(floor_db),
                    AccumulationScope::WholeStream => {
                        let total = convert(&stream_total, floor_db);
                        summary.final_levels = Some(total);
                        total
                    }
                };
                info!("End of input after {} chunks ({} frames)", summary.chunks, summary.frames);
                self.state.set(EngineState::Publishing);
                self.publish(last, &mut summary);
                None
            }
            LoopExit::Stopped => {
                info!("Analysis stopped after {} chunks", summary.chunks);
                summary.outcome = RunOutcome::Stopped;
                if self.config.scope == AccumulationScope::WholeStream {
                    summary.final_levels = Some(convert(&stream_total, floor_db));
                }
                None
            }
            LoopExit::ReadError(e) => {
                error!("Error reading audio input: {}", e);
                Some(e)
            }
        };

        self.state.set(EngineState::Draining);
        let drain = summary.outcome == RunOutcome::EndOfStream;
        self.shut_down_sink(drain, &mut summary);
        if let Err(e) = self.source.close() {
            warn!("Error closing audio input: {}", e);
        }
        self.state.set(EngineState::Closed);

        match read_error {
            Some(e) => Err(Error::SourceRead(e)),
            None => {
                info!(
                    "Analysis finished: {} publications, {} playback errors",
                    summary.publications, summary.sink_errors
                );
                Ok(summary)
            }
        }
    }

    fn publish(&mut self, levels: LevelVector, summary: &mut RunSummary) {
        if let Some(listener) = self.listener.as_mut() {
            listener.on_levels(levels);
        }
        summary.publications += 1;
    }

    /// Start the sink; on failure playback is disabled for this run.
    fn start_sink(&mut self, summary: &mut RunSummary) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if let Err(e) = sink.start(&self.stop) {
            warn!("Playback unavailable, continuing without audio: {}", e);
            summary.sink_errors += 1;
            if let Err(e) = sink.close() {
                debug!("Failed to close playback sink: {}", e);
            }
            self.sink = None;
        }
    }

    /// Hand raw chunk bytes to the sink. Failures never reach the caller.
    fn forward(&mut self, bytes: &[u8], summary: &mut RunSummary) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if let Err(e) = sink.write(bytes) {
            summary.sink_errors += 1;
            if summary.sink_errors == 1 || summary.sink_errors % 100 == 0 {
                warn!("Playback write failed ({} errors so far): {}", summary.sink_errors, e);
            }
        }
    }

    fn shut_down_sink(&mut self, drain: bool, summary: &mut RunSummary) {
        let Some(mut sink) = self.sink.take() else {
            return;
        };
        if drain {
            if let Err(e) = sink.drain() {
                summary.sink_errors += 1;
                warn!("Playback drain failed: {}", e);
            }
        }
        if let Err(e) = sink.stop() {
            summary.sink_errors += 1;
            warn!("Playback stop failed: {}", e);
        }
        if let Err(e) = sink.close() {
            summary.sink_errors += 1;
            warn!("Playback close failed: {}", e);
        }
    }
}

/// Handle to an engine running on its own worker thread.
pub struct EngineHandle {
    stop: StopHandle,
    state: StateCell,
    thread: JoinHandle<Result<RunSummary>>,
}

impl EngineHandle {
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the run to end and return its result.
    pub fn join(self) -> Result<RunSummary> {
        self.thread.join().unwrap_or_else(|_| {
            Err(Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "engine thread panicked",
            )))
        })
    }
}

/// Run `engine` on a dedicated worker thread.
pub fn spawn(engine: Engine) -> Result<EngineHandle> {
    let stop = engine.stop_handle();
    let state = engine.state.clone();
    let thread = thread::Builder::new()
        .name("panmeter-engine".to_string())
        .spawn(move || engine.run())?;
    Ok(EngineHandle { stop, state, thread })
}
