//! Sources and sinks that fail on demand

use panmeter::audio::{AudioFormat, PcmSource, PlaybackSink, ReadOutcome};
use panmeter::{SinkError, StopHandle};
use std::io;
use std::sync::{Arc, Mutex};

/// Source yielding `good_chunks` chunks of a constant frame, then an I/O error
pub struct FailingSource {
    format: AudioFormat,
    frame: [u8; 4],
    good_chunks: usize,
    closed: Arc<Mutex<bool>>,
}

impl FailingSource {
    pub fn new(format: AudioFormat, left: i16, right: i16, good_chunks: usize) -> Self {
        let l = left.to_le_bytes();
        let r = right.to_le_bytes();
        Self {
            format,
            frame: [l[0], l[1], r[0], r[1]],
            good_chunks,
            closed: Arc::new(Mutex::new(false)),
        }
    }

    /// Flag set once the engine has closed the source
    pub fn closed_flag(&self) -> Arc<Mutex<bool>> {
        Arc::clone(&self.closed)
    }
}

impl PcmSource for FailingSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        if self.good_chunks == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream truncated"));
        }
        self.good_chunks -= 1;
        for frame in buf.chunks_exact_mut(4) {
            frame.copy_from_slice(&self.frame);
        }
        Ok(ReadOutcome::Data(buf.len()))
    }

    fn close(&mut self) -> io::Result<()> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

/// One recorded sink operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Start,
    Write(usize),
    Drain,
    Stop,
    Close,
}

/// Which operation the sink rejects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFailure {
    None,
    Start,
    Write,
}

/// Sink that logs every call and optionally fails one kind of operation
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<SinkCall>>>,
    failure: SinkFailure,
}

impl RecordingSink {
    pub fn new(failure: SinkFailure) -> (Self, Arc<Mutex<Vec<SinkCall>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                calls: Arc::clone(&calls),
                failure,
            },
            calls,
        )
    }

    fn record(&self, call: SinkCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PlaybackSink for RecordingSink {
    fn start(&mut self, _stop: &StopHandle) -> Result<(), SinkError> {
        self.record(SinkCall::Start);
        if self.failure == SinkFailure::Start {
            return Err(SinkError::Device("no output device".to_string()));
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.record(SinkCall::Write(bytes.len()));
        if self.failure == SinkFailure::Write {
            return Err(SinkError::Stream("device disconnected".to_string()));
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<(), SinkError> {
        self.record(SinkCall::Drain);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SinkError> {
        self.record(SinkCall::Stop);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.record(SinkCall::Close);
        Ok(())
    }
}
