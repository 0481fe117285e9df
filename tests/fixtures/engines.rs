//! Synthesis engines used to exercise failure handling.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use waav_voice_chat::core::tts::{
    AudioCallback, PlaybackProbe, SimulatedEngine, SynthesisEngine, SynthesisError,
    SynthesisResult, TextFeed,
};

/// Delegates to a [`SimulatedEngine`] but rejects whole-text feeds that
/// contain a trigger word, and can refuse to start the first playbacks.
pub struct FlakyEngine {
    inner: SimulatedEngine,
    trigger: String,
    rejected: Arc<Mutex<Vec<String>>>,
    failed_starts: usize,
}

impl FlakyEngine {
    pub fn new(inner: SimulatedEngine, trigger: &str) -> Self {
        Self {
            inner,
            trigger: trigger.to_string(),
            rejected: Arc::new(Mutex::new(Vec::new())),
            failed_starts: 0,
        }
    }

    /// Makes the next `count` calls to `play_async` fail.
    pub fn with_failed_starts(mut self, count: usize) -> Self {
        self.failed_starts = count;
        self
    }

    /// Handle to the texts that were refused.
    pub fn rejected(&self) -> Arc<Mutex<Vec<String>>> {
        self.rejected.clone()
    }
}

#[async_trait]
impl SynthesisEngine for FlakyEngine {
    fn name(&self) -> &str {
        "flaky"
    }

    fn set_reference(&mut self, path: &Path) -> SynthesisResult<()> {
        self.inner.set_reference(path)
    }

    fn reference(&self) -> Option<&Path> {
        self.inner.reference()
    }

    fn feed(&mut self, feed: TextFeed) -> SynthesisResult<()> {
        if let TextFeed::Text(text) = &feed {
            if text.contains(&self.trigger) {
                self.rejected.lock().push(text.clone());
                return Err(SynthesisError::Engine(format!("refused '{text}'")));
            }
        }
        self.inner.feed(feed)
    }

    fn discard_pending(&mut self) -> usize {
        self.inner.discard_pending()
    }

    async fn play_async(&mut self, callback: Arc<dyn AudioCallback>) -> SynthesisResult<()> {
        if self.failed_starts > 0 {
            self.failed_starts -= 1;
            return Err(SynthesisError::Engine("playback refused to start".to_string()));
        }
        self.inner.play_async(callback).await
    }

    async fn play_muted(&mut self) -> SynthesisResult<()> {
        self.inner.play_muted().await
    }

    fn is_playing(&self) -> bool {
        self.inner.is_playing()
    }

    fn probe(&self) -> PlaybackProbe {
        self.inner.probe()
    }

    async fn shutdown(&mut self) -> SynthesisResult<()> {
        self.inner.shutdown().await
    }
}
