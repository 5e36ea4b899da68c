//! PCM input sources
//!
//! A source supplies its format once, then raw interleaved PCM bytes chunk
//! by chunk. Two implementations:
//! - [`WavFileSource`]: RIFF/WAVE files; `hound` parses the header, the
//!   data chunk is then streamed as raw little-endian bytes
//! - [`RawPcmSource`]: headerless PCM from any reader, format declared by
//!   the caller (the only way to feed big-endian data)

use super::format::AudioFormat;
use crate::error::{Error, FormatError, Result};
use hound::{SampleFormat, WavReader};
use std::fs::File;
use std::io::{self, BufReader, Read, Take};
use std::path::Path;
use tracing::{debug, info};

/// Result of one chunk read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were written to the front of the buffer (`n > 0`)
    Data(usize),
    /// No more data
    EndOfStream,
}

/// Input stream collaborator.
pub trait PcmSource: Send {
    /// Format metadata, available before any read
    fn format(&self) -> AudioFormat;

    /// Fill `buf` as far as possible.
    ///
    /// Implementations return fewer than `buf.len()` bytes only when the
    /// stream ends inside this chunk.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome>;

    /// Release the underlying stream
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read until `buf` is full or the reader is exhausted.
pub fn fill_chunk<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<ReadOutcome> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    if filled == 0 && !buf.is_empty() {
        Ok(ReadOutcome::EndOfStream)
    } else {
        Ok(ReadOutcome::Data(filled))
    }
}

/// WAV file source.
pub struct WavFileSource {
    reader: Option<Take<BufReader<File>>>,
    format: AudioFormat,
    data_bytes: u64,
}

impl WavFileSource {
    /// Open a WAV file and position at the start of its sample data.
    ///
    /// # Errors
    /// - File cannot be opened, or the RIFF header is invalid
    /// - Samples are floating point (integer PCM only)
    ///
    /// Channel count and bit depth are not checked here; the engine
    /// validates them at open time.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::SourceOpen(format!("{}: {}", path.display(), e))
        })?;

        let wav = WavReader::new(BufReader::new(file)).map_err(|e| {
            Error::SourceOpen(format!("{}: {}", path.display(), e))
        })?;

        let spec = wav.spec();
        if spec.sample_format != SampleFormat::Int {
            return Err(Error::Format(FormatError::UnsupportedEncoding(
                "floating-point samples".to_string(),
            )));
        }

        // len() counts samples across all channels
        let data_bytes = wav.len() as u64 * (spec.bits_per_sample as u64 / 8);
        let format = AudioFormat {
            channel_count: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            frame_rate: spec.sample_rate as f64,
            is_big_endian: false,
        };

        info!(
            "Opened {}: {} Hz, {} ch, {}-bit, {} data bytes",
            path.display(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            data_bytes
        );

        // WavReader stops at the start of the data chunk
        let reader = wav.into_inner().take(data_bytes);

        Ok(Self {
            reader: Some(reader),
            format,
            data_bytes,
        })
    }

    /// Size of the sample data in bytes
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }
}

impl PcmSource for WavFileSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        match self.reader.as_mut() {
            Some(reader) => fill_chunk(reader, buf),
            None => Ok(ReadOutcome::EndOfStream),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        if self.reader.take().is_some() {
            debug!("WAV source closed");
        }
        Ok(())
    }
}

/// Headerless PCM source with caller-declared format.
pub struct RawPcmSource<R> {
    reader: Option<R>,
    format: AudioFormat,
}

impl<R: Read + Send> RawPcmSource<R> {
    pub fn new(reader: R, format: AudioFormat) -> Self {
        Self {
            reader: Some(reader),
            format,
        }
    }
}

impl RawPcmSource<BufReader<File>> {
    /// Open a raw PCM file
    pub fn open<P: AsRef<Path>>(path: P, format: AudioFormat) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::SourceOpen(format!("{}: {}", path.display(), e))
        })?;
        info!(
            "Opened raw PCM {}: {} Hz, {}",
            path.display(),
            format.frame_rate,
            if format.is_big_endian { "big-endian" } else { "little-endian" }
        );
        Ok(Self::new(BufReader::new(file), format))
    }
}

impl<R: Read + Send> PcmSource for RawPcmSource<R> {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        match self.reader.as_mut() {
            Some(reader) => fill_chunk(reader, buf),
            None => Ok(ReadOutcome::EndOfStream),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        self.reader = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out at most `step` bytes per call
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_fill_chunk_collects_short_reads() {
        let mut reader = Trickle {
            data: (0..10).collect(),
            pos: 0,
            step: 3,
        };
        let mut buf = [0u8; 8];
        assert_eq!(fill_chunk(&mut reader, &mut buf).unwrap(), ReadOutcome::Data(8));
        assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(fill_chunk(&mut reader, &mut buf).unwrap(), ReadOutcome::Data(2));
        assert_eq!(fill_chunk(&mut reader, &mut buf).unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn test_raw_source_reports_declared_format() {
        let format = AudioFormat::stereo_16(8000.0, true);
        let mut source = RawPcmSource::new(Cursor::new(vec![1u8; 4]), format);
        assert_eq!(source.format(), format);

        let mut buf = [0u8; 16];
        assert_eq!(source.read(&mut buf).unwrap(), ReadOutcome::Data(4));
        assert_eq!(source.read(&mut buf).unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn test_closed_raw_source_is_at_end() {
        let format = AudioFormat::stereo_16(8000.0, false);
        let mut source = RawPcmSource::new(Cursor::new(vec![0u8; 64]), format);
        source.close().unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(source.read(&mut buf).unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn test_missing_wav_is_open_error() {
        let result = WavFileSource::open("/nonexistent/panmeter/input.wav");
        assert!(matches!(result, Err(Error::SourceOpen(_))));
    }
}
