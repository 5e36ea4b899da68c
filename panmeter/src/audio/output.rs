//! Audio device playback using cpal
//!
//! `cpal::Stream` is not `Send` on every platform, so the stream lives on
//! a dedicated audio thread for its whole life. The engine thread only
//! touches the producer half of a lock-free frame ring; the cpal callback
//! drains the consumer half and plays silence on underrun.
//!
//! Writes block while the ring is full. That back-pressure is what paces
//! the analysis loop to real time during live playback.

use super::format::{AudioFormat, FRAME_SIZE};
use super::ring_buffer::{FrameConsumer, FrameProducer, FrameRingBuffer, DEFAULT_RING_FRAMES};
use super::sample::{frames, whole_frames};
use super::sink::PlaybackSink;
use crate::engine::StopHandle;
use crate::error::SinkError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Sleep between retries while the ring is full
const WRITE_BACKOFF: Duration = Duration::from_millis(2);

/// Extra time allowed for drain beyond the queued audio duration
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Device latency assumed after the ring empties when the buffer size is unknown
const DEFAULT_DEVICE_LATENCY: Duration = Duration::from_millis(50);

/// Device selection and sizing, fixed at construction
#[derive(Debug, Clone)]
struct StreamSettings {
    device_name: Option<String>,
    frame_rate: u32,
    buffer_frames: Option<u32>,
}

/// Playback sink writing to an output device.
pub struct CpalSink {
    settings: StreamSettings,
    ring_frames: usize,
    big_endian: bool,
    producer: Option<FrameProducer>,
    /// Trailing partial frame carried into the next write
    carry: Vec<u8>,
    /// Set by the stream error callback
    error_flag: Arc<AtomicBool>,
    shutdown: Option<mpsc::Sender<()>>,
    audio_thread: Option<JoinHandle<()>>,
    stop: Option<StopHandle>,
    active_device: Option<String>,
}

impl CpalSink {
    /// Create a sink for `format`. Nothing is opened until `start`.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    /// - `buffer_frames`: Optional device buffer size (None = device default)
    /// - `ring_frames`: Optional ring capacity in frames
    pub fn new(
        format: &AudioFormat,
        device_name: Option<String>,
        buffer_frames: Option<u32>,
        ring_frames: Option<usize>,
    ) -> Self {
        Self {
            settings: StreamSettings {
                device_name,
                frame_rate: format.frame_rate.round().max(1.0) as u32,
                buffer_frames,
            },
            ring_frames: ring_frames.unwrap_or(DEFAULT_RING_FRAMES),
            big_endian: format.is_big_endian,
            producer: None,
            carry: Vec::with_capacity(FRAME_SIZE),
            error_flag: Arc::new(AtomicBool::new(false)),
            shutdown: None,
            audio_thread: None,
            stop: None,
            active_device: None,
        }
    }

    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>, SinkError> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| SinkError::Device(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Name of the device in use, once started
    pub fn device_name(&self) -> Option<&str> {
        self.active_device.as_deref()
    }

    fn is_stop_requested(&self) -> bool {
        self.stop.as_ref().is_some_and(|s| s.is_stop_requested())
    }

    fn queued_duration(&self, frames: usize) -> Duration {
        Duration::from_secs_f64(frames as f64 / self.settings.frame_rate as f64)
    }

    fn device_latency(&self) -> Duration {
        match self.settings.buffer_frames {
            Some(n) => self.queued_duration(n as usize),
            None => DEFAULT_DEVICE_LATENCY,
        }
    }

    /// Tell the audio thread to drop its stream, then wait for it.
    fn shut_down_thread(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.audio_thread.take() {
            if handle.join().is_err() {
                error!("Audio thread panicked");
            }
        }
    }
}

impl PlaybackSink for CpalSink {
    fn start(&mut self, stop: &StopHandle) -> Result<(), SinkError> {
        if self.producer.is_some() {
            return Ok(());
        }

        let (producer, consumer) = FrameRingBuffer::new(self.ring_frames).split();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<String, SinkError>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let settings = self.settings.clone();
        let error_flag = Arc::clone(&self.error_flag);
        error_flag.store(false, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("panmeter-audio".to_string())
            .spawn(move || {
                let stream = match open_stream(&settings, consumer, error_flag) {
                    Ok((stream, name)) => {
                        let _ = ready_tx.send(Ok(name));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Park until stop/close; sender drop also wakes us
                let _ = shutdown_rx.recv();
                if let Err(e) = stream.pause() {
                    debug!("Failed to pause stream on shutdown: {}", e);
                }
                drop(stream);
                debug!("Audio thread exiting");
            })
            .map_err(|e| SinkError::Stream(format!("Failed to spawn audio thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(name)) => {
                info!("Playback started on '{}' at {} Hz", name, self.settings.frame_rate);
                self.active_device = Some(name);
                self.producer = Some(producer);
                self.shutdown = Some(shutdown_tx);
                self.audio_thread = Some(handle);
                self.stop = Some(stop.clone());
                self.carry.clear();
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(SinkError::Stream("audio thread exited during startup".to_string()))
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        let producer = self.producer.as_mut().ok_or(SinkError::NotRunning)?;
        if self.error_flag.load(Ordering::SeqCst) {
            return Err(SinkError::Stream("output stream reported an error".to_string()));
        }

        self.carry.extend_from_slice(bytes);
        let whole = whole_frames(self.carry.len()) * FRAME_SIZE;

        let mut outcome = Ok(());
        let mut interrupted = false;
        'frames: for frame in frames(&self.carry[..whole], self.big_endian) {
            while !producer.push(frame) {
                if self.stop.as_ref().is_some_and(|s| s.is_stop_requested()) {
                    interrupted = true;
                    break 'frames;
                }
                if self.error_flag.load(Ordering::SeqCst) {
                    outcome = Err(SinkError::Stream(
                        "output stream reported an error".to_string(),
                    ));
                    interrupted = true;
                    break 'frames;
                }
                thread::sleep(WRITE_BACKOFF);
            }
        }

        // Frames already queued must not be replayed by the next write
        if interrupted {
            self.carry.clear();
        } else {
            self.carry.drain(..whole);
        }
        outcome
    }

    fn drain(&mut self) -> Result<(), SinkError> {
        let Some(producer) = self.producer.as_ref() else {
            return Ok(());
        };

        let deadline = Instant::now() + self.queued_duration(producer.occupied_len()) + DRAIN_GRACE;
        loop {
            let pending = producer.occupied_len();
            if pending == 0 {
                break;
            }
            if self.is_stop_requested() {
                return Ok(());
            }
            if self.error_flag.load(Ordering::SeqCst) {
                return Err(SinkError::Stream("output stream reported an error".to_string()));
            }
            if Instant::now() >= deadline {
                return Err(SinkError::DrainTimeout(pending));
            }
            thread::sleep(Duration::from_millis(5));
        }

        // Ring is empty; let the device play out its own buffer
        thread::sleep(self.device_latency());
        debug!("Playback drained");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SinkError> {
        if self.producer.is_none() {
            return Ok(());
        }
        info!("Stopping playback");
        // Dropping the stream discards whatever is still queued
        self.shut_down_thread();
        self.producer = None;
        self.carry.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.stop()?;
        self.stop = None;
        self.active_device = None;
        Ok(())
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        // Ensure the audio thread is gone
        let _ = self.close();
    }
}

/// Pick the device, falling back to the default device when the requested
/// one is missing.
fn select_device(name: Option<&str>) -> Result<Device, SinkError> {
    let host = cpal::default_host();

    if let Some(name) = name {
        let mut devices = host
            .output_devices()
            .map_err(|e| SinkError::Device(format!("Failed to enumerate devices: {}", e)))?;

        if let Some(dev) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            info!("Found requested audio device: {}", name);
            return Ok(dev);
        }
        warn!("Requested device '{}' not found, falling back to default device", name);
    }

    host.default_output_device()
        .ok_or_else(|| SinkError::Device("No default output device found".to_string()))
}

/// Find a stereo configuration at exactly `frame_rate` (no resampling).
///
/// Prefers i16 (no conversion), then f32, then u16.
fn select_config(
    device: &Device,
    frame_rate: u32,
) -> Result<(StreamConfig, SampleFormat), SinkError> {
    let supported: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| SinkError::Device(format!("Failed to get device configs: {}", e)))?
        .filter(|c| {
            c.channels() == 2
                && c.min_sample_rate().0 <= frame_rate
                && c.max_sample_rate().0 >= frame_rate
        })
        .collect();

    for wanted in [SampleFormat::I16, SampleFormat::F32, SampleFormat::U16] {
        if let Some(c) = supported.iter().find(|c| c.sample_format() == wanted) {
            let config = c.clone().with_sample_rate(cpal::SampleRate(frame_rate)).config();
            return Ok((config, wanted));
        }
    }

    Err(SinkError::Device(format!(
        "Device has no stereo output configuration at {} Hz",
        frame_rate
    )))
}

fn open_stream(
    settings: &StreamSettings,
    consumer: FrameConsumer,
    error_flag: Arc<AtomicBool>,
) -> Result<(Stream, String), SinkError> {
    let device = select_device(settings.device_name.as_deref())?;
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let (mut config, sample_format) = select_config(&device, settings.frame_rate)?;
    if let Some(size) = settings.buffer_frames {
        config.buffer_size = cpal::BufferSize::Fixed(size);
    }

    debug!(
        "Audio config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
        config.sample_rate.0, config.channels, sample_format, config.buffer_size
    );

    let stream = match sample_format {
        SampleFormat::I16 => {
            build_stream(&device, &config, consumer, error_flag, |s| s)?
        }
        SampleFormat::F32 => {
            build_stream(&device, &config, consumer, error_flag, |s| s as f32 / 32768.0)?
        }
        SampleFormat::U16 => {
            build_stream(&device, &config, consumer, error_flag, |s| (s as i32 + 32768) as u16)?
        }
        other => {
            return Err(SinkError::Device(format!("Unsupported sample format: {:?}", other)));
        }
    };

    stream
        .play()
        .map_err(|e| SinkError::Stream(format!("Failed to start stream: {}", e)))?;

    Ok((stream, name))
}

fn build_stream<T, F>(
    device: &Device,
    config: &StreamConfig,
    mut consumer: FrameConsumer,
    error_flag: Arc<AtomicBool>,
    convert: F,
) -> Result<Stream, SinkError>
where
    T: SizedSample,
    F: Fn(i16) -> T + Send + 'static,
{
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for out in data.chunks_mut(channels) {
                    let frame = consumer.pop().unwrap_or_default();
                    out[0] = convert(frame.left);
                    if channels > 1 {
                        out[1] = convert(frame.right);
                    }
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                error_flag.store(true, Ordering::SeqCst);
            },
            None, // No timeout
        )
        .map_err(|e| SinkError::Stream(format!("Failed to build stream: {}", e)))
}
