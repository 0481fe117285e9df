//! Audio output sinks fed by the chunk relay.
//!
//! A sink is opened once with a fixed PCM format, receives raw 16-bit
//! little-endian chunks, and is closed after every worker writing to it has
//! been joined.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AudioOutputError {
    #[error("Audio output is not open")]
    NotOpen,

    #[error("Audio output already closed")]
    Closed,

    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),

    #[error("Failed to write audio: {0}")]
    Write(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

pub type AudioOutputResult<T> = Result<T, AudioOutputError>;

/// Fixed PCM format a sink is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const BITS_PER_SAMPLE: u16 = 16;

    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    fn validate(&self) -> AudioOutputResult<()> {
        if self.sample_rate == 0 {
            return Err(AudioOutputError::InvalidFormat(
                "sample rate must be positive".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(AudioOutputError::InvalidFormat(
                "channel count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(24_000, 1)
    }
}

/// Push-chunk audio output.
pub trait AudioSink: Send {
    fn open(&mut self, format: AudioFormat) -> AudioOutputResult<()>;

    fn write(&mut self, chunk: &[u8]) -> AudioOutputResult<()>;

    /// Pushes buffered audio to the device. Called at the end of each turn.
    fn flush(&mut self) -> AudioOutputResult<()>;

    fn close(&mut self) -> AudioOutputResult<()>;
}

pub type BoxedSink = Box<dyn AudioSink>;

/// Writes 16-bit PCM into a WAV file.
pub struct WavFileSink {
    path: PathBuf,
    writer: Option<WavWriter<BufWriter<File>>>,
    carry: Option<u8>,
    closed: bool,
}

impl WavFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            carry: None,
            closed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSink for WavFileSink {
    fn open(&mut self, format: AudioFormat) -> AudioOutputResult<()> {
        if self.closed {
            return Err(AudioOutputError::Closed);
        }
        format.validate()?;
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: AudioFormat::BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };
        self.writer = Some(WavWriter::create(&self.path, spec)?);
        info!(path = %self.path.display(), "Opened WAV output");
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> AudioOutputResult<()> {
        let writer = self.writer.as_mut().ok_or(AudioOutputError::NotOpen)?;

        let mut bytes = chunk.iter().copied();
        if let Some(low) = self.carry.take() {
            match bytes.next() {
                Some(high) => writer.write_sample(i16::from_le_bytes([low, high]))?,
                None => {
                    self.carry = Some(low);
                    return Ok(());
                }
            }
        }
        loop {
            match (bytes.next(), bytes.next()) {
                (Some(low), Some(high)) => writer.write_sample(i16::from_le_bytes([low, high]))?,
                (Some(low), None) => {
                    self.carry = Some(low);
                    break;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> AudioOutputResult<()> {
        match self.writer.as_mut() {
            Some(writer) => Ok(writer.flush()?),
            None => Err(AudioOutputError::NotOpen),
        }
    }

    fn close(&mut self) -> AudioOutputResult<()> {
        self.closed = true;
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            debug!(path = %self.path.display(), "Finalized WAV output");
        }
        Ok(())
    }
}

/// Discards all audio.
#[derive(Debug, Default)]
pub struct NullSink {
    bytes_written: usize,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }
}

impl AudioSink for NullSink {
    fn open(&mut self, format: AudioFormat) -> AudioOutputResult<()> {
        format.validate()
    }

    fn write(&mut self, chunk: &[u8]) -> AudioOutputResult<()> {
        self.bytes_written += chunk.len();
        Ok(())
    }

    fn flush(&mut self) -> AudioOutputResult<()> {
        Ok(())
    }

    fn close(&mut self) -> AudioOutputResult<()> {
        Ok(())
    }
}

/// Collects audio in memory. A cloned handle observes the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<BytesMut>>,
    format: Arc<Mutex<Option<AudioFormat>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Bytes {
        self.buffer.lock().clone().freeze()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn format(&self) -> Option<AudioFormat> {
        *self.format.lock()
    }
}

impl AudioSink for MemorySink {
    fn open(&mut self, format: AudioFormat) -> AudioOutputResult<()> {
        format.validate()?;
        *self.format.lock() = Some(format);
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> AudioOutputResult<()> {
        if self.format.lock().is_none() {
            return Err(AudioOutputError::NotOpen);
        }
        self.buffer.lock().extend_from_slice(chunk);
        Ok(())
    }

    fn flush(&mut self) -> AudioOutputResult<()> {
        Ok(())
    }

    fn close(&mut self) -> AudioOutputResult<()> {
        Ok(())
    }
}

/// Builds the sink selected by configuration: a WAV file when a path is
/// given, otherwise a null sink.
pub fn create_audio_sink(output_path: Option<&Path>) -> BoxedSink {
    match output_path {
        Some(path) => Box::new(WavFileSink::new(path)),
        None => Box::new(NullSink::new()),
    }
}
