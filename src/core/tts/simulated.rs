//! Deterministic in-process synthesis engine.
//!
//! Produces 16-bit PCM silence whose length is proportional to the text it
//! consumes. It honors the full [`SynthesisEngine`] contract, so the session
//! runs end to end without an external engine, and it records every
//! synthesized utterance together with the reference that was active.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::base::{
    AudioCallback, AudioData, PlaybackProbe, SynthesisEngine, SynthesisError, SynthesisResult,
    TextFeed,
};

/// Pacing and format of the simulated engine.
#[derive(Debug, Clone)]
pub struct SimulatedEngineConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames of audio generated per input character.
    pub frames_per_char: usize,
    /// Frames per emitted chunk.
    pub chunk_frames: usize,
    /// Delay after each emitted chunk.
    pub chunk_delay: Duration,
}

impl Default for SimulatedEngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            channels: 1,
            frames_per_char: 240,
            chunk_frames: 2_400,
            chunk_delay: Duration::from_millis(1),
        }
    }
}

/// One synthesized utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub reference: Option<PathBuf>,
    pub text: String,
}

/// Shared log of everything the engine synthesized.
#[derive(Debug, Clone, Default)]
pub struct SynthesisHistory {
    entries: Arc<Mutex<Vec<Utterance>>>,
}

impl SynthesisHistory {
    pub fn utterances(&self) -> Vec<Utterance> {
        self.entries.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.entries.lock().iter().map(|u| u.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn push(&self, utterance: Utterance) {
        self.entries.lock().push(utterance);
    }
}

struct QueuedFeed {
    feed: TextFeed,
    reference: Option<PathBuf>,
}

type FeedQueue = Arc<Mutex<VecDeque<QueuedFeed>>>;

pub struct SimulatedEngine {
    config: SimulatedEngineConfig,
    reference: Option<PathBuf>,
    feeds: FeedQueue,
    probe: PlaybackProbe,
    history: SynthesisHistory,
    playback: Option<JoinHandle<()>>,
    shut_down: bool,
}

impl SimulatedEngine {
    pub fn new(config: SimulatedEngineConfig) -> Self {
        Self {
            config,
            reference: None,
            feeds: Arc::new(Mutex::new(VecDeque::new())),
            probe: PlaybackProbe::new(),
            history: SynthesisHistory::default(),
            playback: None,
            shut_down: false,
        }
    }

    /// Handle to the utterance log.
    pub fn history(&self) -> SynthesisHistory {
        self.history.clone()
    }

    fn ensure_running(&self) -> SynthesisResult<()> {
        if self.shut_down {
            Err(SynthesisError::Shutdown)
        } else {
            Ok(())
        }
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new(SimulatedEngineConfig::default())
    }
}

/// Pops the next feed, or clears the playing flag when none is left.
///
/// Both happen under the feed lock, so a concurrent `feed` either lands in
/// this playback or observes it stopped.
fn next_feed(feeds: &FeedQueue, probe: &PlaybackProbe) -> Option<QueuedFeed> {
    let mut queue = feeds.lock();
    let next = queue.pop_front();
    if next.is_none() {
        probe.set_playing(false);
    }
    next
}

async fn synthesize(
    text: &str,
    config: &SimulatedEngineConfig,
    callback: Option<&Arc<dyn AudioCallback>>,
) {
    let frame_bytes = 2 * config.channels.max(1) as usize;
    let mut remaining = text.chars().count() * config.frames_per_char;
    while remaining > 0 {
        let frames = remaining.min(config.chunk_frames.max(1));
        remaining -= frames;
        if let Some(callback) = callback {
            let chunk = AudioData::pcm16(
                vec![0u8; frames * frame_bytes],
                config.sample_rate,
                config.channels,
            );
            callback.on_audio(chunk).await;
        }
        if config.chunk_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(config.chunk_delay).await;
        }
    }
}

async fn run_playback(
    feeds: FeedQueue,
    probe: PlaybackProbe,
    history: SynthesisHistory,
    config: SimulatedEngineConfig,
    callback: Option<Arc<dyn AudioCallback>>,
) {
    while let Some(QueuedFeed { feed, reference }) = next_feed(&feeds, &probe) {
        let text = match feed {
            TextFeed::Text(text) => {
                synthesize(&text, &config, callback.as_ref()).await;
                text
            }
            TextFeed::Stream(mut stream) => {
                let mut text = String::new();
                while let Some(piece) = stream.next().await {
                    synthesize(&piece, &config, callback.as_ref()).await;
                    text.push_str(&piece);
                }
                text
            }
        };
        debug!(chars = text.len(), "Simulated engine finished utterance");
        history.push(Utterance { reference, text });
    }
    if let Some(callback) = callback {
        callback.on_complete().await;
    }
}

#[async_trait]
impl SynthesisEngine for SimulatedEngine {
    fn name(&self) -> &str {
        "simulated"
    }

    fn set_reference(&mut self, path: &Path) -> SynthesisResult<()> {
        self.ensure_running()?;
        if !path.is_file() {
            return Err(SynthesisError::InvalidReference(path.display().to_string()));
        }
        self.reference = Some(path.to_path_buf());
        Ok(())
    }

    fn reference(&self) -> Option<&Path> {
        self.reference.as_deref()
    }

    fn feed(&mut self, feed: TextFeed) -> SynthesisResult<()> {
        self.ensure_running()?;
        self.feeds.lock().push_back(QueuedFeed {
            feed,
            reference: self.reference.clone(),
        });
        Ok(())
    }

    fn discard_pending(&mut self) -> usize {
        let mut feeds = self.feeds.lock();
        let dropped = feeds.len();
        feeds.clear();
        dropped
    }

    async fn play_async(&mut self, callback: Arc<dyn AudioCallback>) -> SynthesisResult<()> {
        self.ensure_running()?;
        {
            let _feeds = self.feeds.lock();
            if self.probe.is_playing() {
                return Ok(());
            }
            self.probe.set_playing(true);
        }
        self.playback = Some(tokio::spawn(run_playback(
            self.feeds.clone(),
            self.probe.clone(),
            self.history.clone(),
            self.config.clone(),
            Some(callback),
        )));
        Ok(())
    }

    async fn play_muted(&mut self) -> SynthesisResult<()> {
        self.ensure_running()?;
        if let Some(handle) = self.playback.take() {
            handle
                .await
                .map_err(|e| SynthesisError::Engine(format!("playback task failed: {e}")))?;
        }
        self.probe.set_playing(true);
        run_playback(
            self.feeds.clone(),
            self.probe.clone(),
            self.history.clone(),
            self.config.clone(),
            None,
        )
        .await;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.probe.is_playing()
    }

    fn probe(&self) -> PlaybackProbe {
        self.probe.clone()
    }

    async fn shutdown(&mut self) -> SynthesisResult<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        if let Some(handle) = self.playback.take() {
            handle.abort();
        }
        self.feeds.lock().clear();
        self.probe.set_playing(false);
        info!("Simulated engine shut down");
        Ok(())
    }
}
