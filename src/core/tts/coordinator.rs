//! Per-turn playback workers.
//!
//! A [`PlaybackCoordinator`] runs two tasks for one assistant turn:
//!
//! - the **sentence worker** pops sentences from the [`SentenceQueue`],
//!   points the engine at the sentence's emotion reference, and plays it
//!   either as whole text (the sentence was already finished) or through an
//!   [`IncrementalTextBridge`] while the producer is still writing it;
//! - the **chunk relay** moves synthesized audio into the output sink.
//!
//! The engine and the sink are moved into the workers when the turn starts
//! and handed back by [`PlaybackCoordinator::stop`], so the sentence worker is
//! the only code that can change the engine's active reference.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::base::{
    AudioCallback, BoxedEngine, PlaybackProbe, SynthesisEngine, SynthesisResult, TextFeed,
};
use super::bridge::IncrementalTextBridge;
use super::output::BoxedSink;
use super::relay::ChunkRelay;
use crate::core::emotion::EmotionReferences;
use crate::core::sentence::{Sentence, SentenceQueue};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Sentence worker failed: {0}")]
    SentenceWorker(#[source] JoinError),

    #[error("Chunk relay failed: {0}")]
    ChunkRelay(#[source] JoinError),
}

pub type PlaybackResult<T> = Result<T, PlaybackError>;

/// Timing of the sentence worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSettings {
    /// Interval between growth checks of an open sentence, and between
    /// "still playing" checks while a sentence drains.
    pub poll_interval: Duration,
    /// Pause between two pops of the sentence queue.
    pub idle_interval: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            idle_interval: Duration::from_millis(10),
        }
    }
}

/// How a sentence is handed to the engine, chosen once at pop time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStrategy {
    /// The sentence was finished when popped; its text is fed in one piece.
    WholeText,
    /// The sentence was still open; new text is streamed as it arrives.
    Incremental,
}

impl fmt::Display for PlaybackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackStrategy::WholeText => f.write_str("whole-text"),
            PlaybackStrategy::Incremental => f.write_str("incremental"),
        }
    }
}

/// Everything the sentence worker needs besides the engine.
struct SentenceWorker {
    queue: Arc<SentenceQueue>,
    references: Arc<EmotionReferences>,
    chunks: Arc<dyn AudioCallback>,
    settings: PlaybackSettings,
    stop: CancellationToken,
}

impl SentenceWorker {
    async fn run(self, mut engine: BoxedEngine) -> BoxedEngine {
        debug!("Sentence worker started");
        while !self.stop.is_cancelled() {
            if let Some(sentence) = self.queue.pop_next() {
                self.play(engine.as_mut(), &sentence).await;
            }
            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = tokio::time::sleep(self.settings.idle_interval) => {}
            }
        }
        debug!("Sentence worker stopped");
        engine
    }

    /// Plays one sentence to completion. Failures are logged and skip the
    /// sentence.
    async fn play(&self, engine: &mut dyn SynthesisEngine, sentence: &Sentence) {
        self.apply_reference(engine, sentence);

        let strategy = if sentence.is_finished() {
            PlaybackStrategy::WholeText
        } else {
            PlaybackStrategy::Incremental
        };
        debug!(
            sentence_id = %sentence.id(),
            emotion = sentence.emotion().unwrap_or("None"),
            finished = sentence.is_finished(),
            retrieved = sentence.is_retrieved(),
            popped = sentence.is_popped(),
            %strategy,
            "Playing sentence"
        );

        let result = match strategy {
            PlaybackStrategy::WholeText => self.play_whole(engine, sentence).await,
            PlaybackStrategy::Incremental => self.play_incremental(engine, sentence).await,
        };

        if let Err(e) = result {
            error!(sentence_id = %sentence.id(), "Synthesis failed, skipping sentence: {}", e);
            // Text fed before the failure must not leak into the next playback.
            let dropped = engine.discard_pending();
            if dropped > 0 {
                debug!(sentence_id = %sentence.id(), dropped, "Discarded queued feeds");
            }
            // The sentence may still be open; it must not be picked up again.
            self.wait_until_finished(sentence).await;
        }
        self.wait_for_drain(engine).await;
    }

    /// Points the engine at the sentence's emotion reference. A reference
    /// that cannot be applied leaves the current voice in place.
    fn apply_reference(&self, engine: &mut dyn SynthesisEngine, sentence: &Sentence) {
        let resolved = self.references.resolve(sentence.emotion());
        match resolved.path() {
            Some(path) => {
                debug!(
                    sentence_id = %sentence.id(),
                    emotion = %resolved.effective_emotion(),
                    reference = %path.display(),
                    "Setting voice reference"
                );
                if let Err(e) = engine.set_reference(path) {
                    warn!(reference = %path.display(), "Failed to set voice reference: {}", e);
                }
            }
            None => warn!(
                sentence_id = %sentence.id(),
                "No emotion reference available, using current voice"
            ),
        }
    }

    async fn play_whole(
        &self,
        engine: &mut dyn SynthesisEngine,
        sentence: &Sentence,
    ) -> SynthesisResult<()> {
        let text = sentence.text();
        if text.trim().is_empty() {
            debug!(sentence_id = %sentence.id(), "Skipping blank sentence");
            return Ok(());
        }
        engine.feed(TextFeed::Text(text))?;
        if !engine.is_playing() {
            engine.play_async(self.chunks.clone()).await?;
        }
        Ok(())
    }

    async fn play_incremental(
        &self,
        engine: &mut dyn SynthesisEngine,
        sentence: &Sentence,
    ) -> SynthesisResult<()> {
        let bridge = IncrementalTextBridge::new();
        let result = self.follow(engine, sentence, &bridge).await;
        bridge.stop();
        result
    }

    /// Streams the growth of `sentence` into `bridge` until it finishes.
    async fn follow(
        &self,
        engine: &mut dyn SynthesisEngine,
        sentence: &Sentence,
        bridge: &IncrementalTextBridge,
    ) -> SynthesisResult<()> {
        let mut delivered = 0;
        let mut started = false;
        loop {
            let snapshot = sentence.snapshot();
            if snapshot.text.len() > delivered {
                bridge.push_increment(&snapshot.text[delivered..]);
                delivered = snapshot.text.len();
                if !started {
                    engine.feed(TextFeed::Stream(bridge.produce()))?;
                    started = true;
                }
                if !engine.is_playing() {
                    engine.play_async(self.chunks.clone()).await?;
                }
            }
            if snapshot.finished {
                debug!(
                    sentence_id = %sentence.id(),
                    chars = delivered,
                    unread = bridge.pending(),
                    "Feed finished"
                );
                return Ok(());
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn wait_until_finished(&self, sentence: &Sentence) {
        while !sentence.is_finished() {
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn wait_for_drain(&self, engine: &mut dyn SynthesisEngine) {
        while engine.is_playing() {
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

/// Running playback workers for one assistant turn.
pub struct PlaybackCoordinator {
    queue: Arc<SentenceQueue>,
    probe: PlaybackProbe,
    pending_chunks: Arc<AtomicUsize>,
    stop: CancellationToken,
    relay_stop: CancellationToken,
    sentence_worker: JoinHandle<BoxedEngine>,
    chunk_relay: JoinHandle<BoxedSink>,
}

impl PlaybackCoordinator {
    /// Spawns both workers. The engine and sink are owned by the workers
    /// until [`stop`](Self::stop) returns them.
    pub fn start(
        engine: BoxedEngine,
        sink: BoxedSink,
        queue: Arc<SentenceQueue>,
        references: Arc<EmotionReferences>,
        settings: PlaybackSettings,
    ) -> Self {
        let probe = engine.probe();
        let (chunks, relay) = ChunkRelay::new(sink);
        let pending_chunks = chunks.pending_counter();

        let stop = CancellationToken::new();
        let relay_stop = CancellationToken::new();

        let worker = SentenceWorker {
            queue: queue.clone(),
            references,
            chunks: Arc::new(chunks),
            settings,
            stop: stop.clone(),
        };
        let sentence_worker = tokio::spawn(worker.run(engine));
        let chunk_relay = relay.spawn(relay_stop.clone());

        info!("Playback workers started");
        Self {
            queue,
            probe,
            pending_chunks,
            stop,
            relay_stop,
            sentence_worker,
            chunk_relay,
        }
    }

    pub fn queue(&self) -> &Arc<SentenceQueue> {
        &self.queue
    }

    pub fn is_playing(&self) -> bool {
        self.probe.is_playing()
    }

    /// Audio chunks synthesized but not yet written to the sink.
    pub fn pending_chunks(&self) -> usize {
        self.pending_chunks.load(Ordering::Acquire)
    }

    /// No backlog, no active playback and no chunk in flight.
    ///
    /// An open sentence that no worker has picked up yet is not visible
    /// here; callers close the turn's sentence before waiting on this.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && !self.is_playing() && self.pending_chunks() == 0
    }

    /// Stops both workers and returns the engine and sink.
    ///
    /// The open sentence is closed first so the sentence worker can finish
    /// the sentence it is playing. The relay stops only after the sentence
    /// worker has been joined, so every chunk of that sentence reaches the
    /// sink.
    pub async fn stop(self) -> PlaybackResult<(BoxedEngine, BoxedSink)> {
        self.queue.finish_current();
        self.stop.cancel();
        let engine = self
            .sentence_worker
            .await
            .map_err(PlaybackError::SentenceWorker)?;

        self.relay_stop.cancel();
        let sink = self.chunk_relay.await.map_err(PlaybackError::ChunkRelay)?;

        info!("Playback workers stopped");
        Ok((engine, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::output::{AudioFormat, AudioSink, MemorySink};
    use crate::core::tts::simulated::{SimulatedEngine, SimulatedEngineConfig};
    use tempfile::TempDir;

    fn references() -> (TempDir, Arc<EmotionReferences>) {
        let dir = TempDir::new().unwrap();
        for name in ["neutral.wav", "happy.wav", "sad.wav"] {
            std::fs::write(dir.path().join(name), b"RIFF").unwrap();
        }
        let refs = Arc::new(EmotionReferences::load(dir.path()).unwrap());
        (dir, refs)
    }

    fn fast_settings() -> PlaybackSettings {
        PlaybackSettings {
            poll_interval: Duration::from_millis(2),
            idle_interval: Duration::from_millis(2),
        }
    }

    fn engine() -> SimulatedEngine {
        SimulatedEngine::new(SimulatedEngineConfig {
            frames_per_char: 4,
            chunk_frames: 64,
            chunk_delay: Duration::ZERO,
            ..Default::default()
        })
    }

    async fn wait_idle(coordinator: &PlaybackCoordinator) {
        let mut idle_for = 0;
        while idle_for < 20 {
            if coordinator.is_idle() {
                idle_for += 1;
            } else {
                idle_for = 0;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    #[tokio::test]
    async fn test_plays_finished_sentences_in_order() {
        let (dir, refs) = references();
        let engine = engine();
        let history = engine.history();
        let memory = MemorySink::new();
        let mut sink = memory.clone();
        sink.open(AudioFormat::default()).unwrap();

        let queue = Arc::new(SentenceQueue::new());
        queue.set_emotion("happy");
        queue.append_text("First one.");
        queue.set_emotion("sad");
        queue.append_text("Second one.");
        queue.finish_current();

        let coordinator = PlaybackCoordinator::start(
            Box::new(engine),
            Box::new(sink),
            queue,
            refs,
            fast_settings(),
        );
        wait_idle(&coordinator).await;
        coordinator.stop().await.unwrap();

        let utterances = history.utterances();
        assert_eq!(utterances.len(), 2);
        assert_eq!(utterances[0].text, "First one.");
        assert_eq!(
            utterances[0].reference.as_deref(),
            Some(dir.path().join("happy.wav").as_path())
        );
        assert_eq!(utterances[1].text, "Second one.");
        assert_eq!(
            utterances[1].reference.as_deref(),
            Some(dir.path().join("sad.wav").as_path())
        );
        // 21 chars * 4 frames * 2 bytes
        assert_eq!(memory.len(), 168);
    }

    #[tokio::test]
    async fn test_follows_open_sentence() {
        let (_dir, refs) = references();
        let engine = engine();
        let history = engine.history();

        let queue = Arc::new(SentenceQueue::new());
        let coordinator = PlaybackCoordinator::start(
            Box::new(engine),
            Box::new(MemorySink::new()),
            queue.clone(),
            refs,
            fast_settings(),
        );

        queue.set_emotion("happy");
        for word in ["Streaming ", "while ", "still ", "being ", "written."] {
            queue.append_text(word);
            tokio::time::sleep(Duration::from_millis(8)).await;
        }
        queue.finish_current();

        wait_idle(&coordinator).await;
        coordinator.stop().await.unwrap();

        assert_eq!(
            history.texts(),
            vec!["Streaming while still being written."]
        );
    }

    #[tokio::test]
    async fn test_unknown_emotion_uses_neutral() {
        let (dir, refs) = references();
        let engine = engine();
        let history = engine.history();

        let queue = Arc::new(SentenceQueue::new());
        queue.set_emotion("jealous");
        queue.append_text("Hmm.");
        queue.finish_current();

        let coordinator = PlaybackCoordinator::start(
            Box::new(engine),
            Box::new(MemorySink::new()),
            queue,
            refs,
            fast_settings(),
        );
        wait_idle(&coordinator).await;
        coordinator.stop().await.unwrap();

        let utterances = history.utterances();
        assert_eq!(
            utterances[0].reference.as_deref(),
            Some(dir.path().join("neutral.wav").as_path())
        );
    }

    #[tokio::test]
    async fn test_stop_closes_open_sentence() {
        let (_dir, refs) = references();
        let engine = engine();
        let history = engine.history();

        let queue = Arc::new(SentenceQueue::new());
        let coordinator = PlaybackCoordinator::start(
            Box::new(engine),
            Box::new(MemorySink::new()),
            queue.clone(),
            refs,
            fast_settings(),
        );

        queue.append_text("Never explicitly finished");
        tokio::time::sleep(Duration::from_millis(20)).await;

        let (engine, _sink) = coordinator.stop().await.unwrap();
        assert!(!engine.is_playing());
        assert_eq!(history.texts(), vec!["Never explicitly finished"]);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(PlaybackStrategy::WholeText.to_string(), "whole-text");
        assert_eq!(PlaybackStrategy::Incremental.to_string(), "incremental");
    }
}
