use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

/// Errors raised by a synthesis engine.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Synthesis engine error: {0}")]
    Engine(String),

    #[error("Invalid voice reference: {0}")]
    InvalidReference(String),

    #[error("Engine is not running")]
    NotRunning,

    #[error("Engine has been shut down")]
    Shutdown,
}

pub type SynthesisResult<T> = Result<T, SynthesisError>;

/// A chunk of synthesized 16-bit little-endian PCM.
#[derive(Debug, Clone)]
pub struct AudioData {
    pub data: Bytes,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: Option<u32>,
}

impl AudioData {
    /// Builds a chunk and derives its duration from the PCM length.
    pub fn pcm16(data: impl Into<Bytes>, sample_rate: u32, channels: u16) -> Self {
        let data = data.into();
        let frame_bytes = 2 * channels.max(1) as usize;
        let duration_ms = (sample_rate > 0)
            .then(|| ((data.len() / frame_bytes) as u64 * 1000 / sample_rate as u64) as u32);
        Self {
            data,
            sample_rate,
            channels,
            duration_ms,
        }
    }
}

/// Receives engine output. Invoked from the engine's playback task, so
/// implementations must return quickly.
pub trait AudioCallback: Send + Sync {
    fn on_audio(&self, audio_data: AudioData) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    fn on_error(&self, error: SynthesisError) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    fn on_complete(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Text handed to the engine for one playback.
pub enum TextFeed {
    /// Complete text, available up front.
    Text(String),
    /// A lazily produced sequence that ends when its producer stops it.
    Stream(BoxStream<'static, String>),
}

impl fmt::Debug for TextFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextFeed::Text(text) => f.debug_tuple("Text").field(text).finish(),
            TextFeed::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<String> for TextFeed {
    fn from(text: String) -> Self {
        TextFeed::Text(text)
    }
}

impl From<&str> for TextFeed {
    fn from(text: &str) -> Self {
        TextFeed::Text(text.to_string())
    }
}

/// Shared read-only view of an engine's "is playing" state.
///
/// The engine itself is owned by the sentence worker; the probe lets the
/// turn orchestrator observe playback without touching the engine.
#[derive(Debug, Clone, Default)]
pub struct PlaybackProbe {
    playing: Arc<AtomicBool>,
}

impl PlaybackProbe {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Engine side: flips the state.
    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }
}

/// Contract of a streaming text-to-speech engine.
///
/// Text is queued with [`feed`](SynthesisEngine::feed) and synthesized by a
/// playback started with [`play_async`](SynthesisEngine::play_async). A
/// playback keeps consuming feeds until none is left, then stops playing on
/// its own. The engine carries a single active voice reference that applies
/// to everything synthesized after it is set.
#[async_trait]
pub trait SynthesisEngine: Send {
    /// Engine identifier used in logs.
    fn name(&self) -> &str;

    /// Switches the active voice reference.
    fn set_reference(&mut self, path: &Path) -> SynthesisResult<()>;

    /// Currently active voice reference, if one was set.
    fn reference(&self) -> Option<&Path>;

    /// Queues text for synthesis.
    fn feed(&mut self, feed: TextFeed) -> SynthesisResult<()>;

    /// Drops queued feeds that no playback has picked up yet and returns
    /// how many were dropped.
    fn discard_pending(&mut self) -> usize;

    /// Starts playback in the background; audio chunks go to `callback`.
    /// A no-op while already playing.
    async fn play_async(&mut self, callback: Arc<dyn AudioCallback>) -> SynthesisResult<()>;

    /// Plays all queued text to completion and discards the audio.
    async fn play_muted(&mut self) -> SynthesisResult<()>;

    fn is_playing(&self) -> bool;

    /// Handle observing [`is_playing`](SynthesisEngine::is_playing) from
    /// other tasks.
    fn probe(&self) -> PlaybackProbe;

    /// Stops any playback and releases engine resources.
    async fn shutdown(&mut self) -> SynthesisResult<()>;
}

pub type BoxedEngine = Box<dyn SynthesisEngine>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm16_duration() {
        let chunk = AudioData::pcm16(vec![0u8; 48_000], 24_000, 1);
        assert_eq!(chunk.duration_ms, Some(1000));

        let stereo = AudioData::pcm16(vec![0u8; 48_000], 24_000, 2);
        assert_eq!(stereo.duration_ms, Some(500));
    }

    #[test]
    fn test_probe_shares_state() {
        let probe = PlaybackProbe::new();
        let observer = probe.clone();
        assert!(!observer.is_playing());
        probe.set_playing(true);
        assert!(observer.is_playing());
    }

    #[test]
    fn test_text_feed_debug() {
        let feed = TextFeed::from("hi");
        assert_eq!(format!("{feed:?}"), "Text(\"hi\")");
    }
}
